//! Store handles that read their connection strings only when they connect.
//!
//! `persist` never needs the relational store, and a `filter` served entirely
//! from snapshots needs neither, so nothing is resolved up front.

use async_trait::async_trait;

use addrsync_shared::{
    AppConfig, GeneratedAddress, Result, UnassignedAddress, resolve_mongo, resolve_postgres,
};
use addrsync_stores::{
    AssignedSource, GeneratedSource, MongoSettings, MongoStore, PostgresSettings, PostgresStore,
    UnassignedSink,
};

/// Variable lookup used to resolve connection strings.
pub(crate) type Lookup = fn(&str) -> Option<String>;

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Production stores built from config, resolving secrets per operation.
pub(crate) struct EnvStores<'a> {
    config: &'a AppConfig,
    lookup: Lookup,
}

impl<'a> EnvStores<'a> {
    /// Stores reading the process environment (after `.env` has been loaded).
    pub(crate) fn new(config: &'a AppConfig) -> Self {
        Self::with_lookup(config, process_env)
    }

    pub(crate) fn with_lookup(config: &'a AppConfig, lookup: Lookup) -> Self {
        Self { config, lookup }
    }

    fn mongo(&self) -> Result<MongoStore> {
        let connection = resolve_mongo(&self.config.mongo, self.lookup)?;
        Ok(MongoStore::new(MongoSettings::new(
            &self.config.mongo,
            &connection,
        )))
    }

    fn postgres(&self) -> Result<PostgresStore> {
        let connection = resolve_postgres(&self.config.postgres, self.lookup)?;
        Ok(PostgresStore::new(PostgresSettings::new(
            &self.config.postgres,
            &connection,
        )))
    }
}

#[async_trait]
impl GeneratedSource for EnvStores<'_> {
    async fn fetch_generated(&self) -> Result<Vec<GeneratedAddress>> {
        self.mongo()?.fetch_generated().await
    }
}

#[async_trait]
impl AssignedSource for EnvStores<'_> {
    async fn fetch_assigned(&self) -> Result<Vec<String>> {
        self.postgres()?.fetch_assigned().await
    }
}

#[async_trait]
impl UnassignedSink for EnvStores<'_> {
    async fn insert_unassigned(&self, records: &[UnassignedAddress]) -> Result<u64> {
        self.mongo()?.insert_unassigned(records).await
    }
}
