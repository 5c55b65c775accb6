//! Store adapters for the address inventories.
//!
//! The pipeline talks to stores only through the traits defined here:
//! - [`GeneratedSource`]: generated addresses from the document store
//! - [`AssignedSource`]: assigned address values from the relational store
//! - [`UnassignedSink`]: bulk insert of the reconciled output
//!
//! [`MongoStore`] and [`PostgresStore`] are the production implementations.
//! Each call opens its own connection and releases it before returning.

mod documents;
mod mongo;
mod postgres;

use async_trait::async_trait;

use addrsync_shared::{GeneratedAddress, Result, UnassignedAddress};

pub use mongo::{MongoSettings, MongoStore};
pub use postgres::{ASSIGNED_QUERY, PostgresSettings, PostgresStore};

/// Source of generated address records.
#[async_trait]
pub trait GeneratedSource: Send + Sync {
    /// Fetch every matching record, fully materialized.
    async fn fetch_generated(&self) -> Result<Vec<GeneratedAddress>>;
}

/// Source of address values already in use.
#[async_trait]
pub trait AssignedSource: Send + Sync {
    /// Fetch every assigned value. Duplicates may occur.
    async fn fetch_assigned(&self) -> Result<Vec<String>>;
}

/// Destination for reconciled records.
#[async_trait]
pub trait UnassignedSink: Send + Sync {
    /// Insert all records in one batch. Returns the number inserted.
    async fn insert_unassigned(&self, records: &[UnassignedAddress]) -> Result<u64>;
}
