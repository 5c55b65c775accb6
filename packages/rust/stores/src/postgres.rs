//! PostgreSQL adapter: assigned-address source.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::Connection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use tracing::{info, instrument, warn};

use addrsync_shared::{AddrSyncError, PostgresConfig, PostgresConnection, Result, TlsMode};

use crate::AssignedSource;

/// Selects every active address value for one cryptocurrency.
pub const ASSIGNED_QUERY: &str =
    "SELECT value FROM addresses WHERE deprecated = false AND cryptocurrency = $1";

/// Everything needed to reach the relational store.
#[derive(Clone)]
pub struct PostgresSettings {
    pub uri: String,
    pub cryptocurrency: String,
    pub tls_mode: TlsMode,
}

impl PostgresSettings {
    pub fn new(config: &PostgresConfig, connection: &PostgresConnection) -> Self {
        Self {
            uri: connection.uri.clone(),
            cryptocurrency: config.cryptocurrency.clone(),
            tls_mode: config.tls_mode,
        }
    }

    /// Parse the URI and apply the configured TLS mode over any `sslmode` it carries.
    pub(crate) fn connect_options(&self) -> Result<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&self.uri)
            .map_err(|e| AddrSyncError::config(format!("invalid postgres connection string: {e}")))?;
        Ok(options.ssl_mode(ssl_mode(self.tls_mode)))
    }
}

fn ssl_mode(mode: TlsMode) -> PgSslMode {
    match mode {
        TlsMode::VerifyFull => PgSslMode::VerifyFull,
        TlsMode::Require => PgSslMode::Require,
        TlsMode::Disable => PgSslMode::Disable,
    }
}

/// Relational store handle. Connects per operation.
pub struct PostgresStore {
    settings: PostgresSettings,
}

impl PostgresStore {
    pub fn new(settings: PostgresSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl AssignedSource for PostgresStore {
    #[instrument(skip_all, fields(cryptocurrency = %self.settings.cryptocurrency))]
    async fn fetch_assigned(&self) -> Result<Vec<String>> {
        if self.settings.tls_mode == TlsMode::Require {
            warn!("postgres certificate verification is disabled (tls_mode = \"require\")");
        }

        let options = self.settings.connect_options()?;
        let mut conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| AddrSyncError::Connection(format!("postgres: {e}")))?;

        let result = sqlx::query_scalar::<_, String>(ASSIGNED_QUERY)
            .bind(&self.settings.cryptocurrency)
            .fetch_all(&mut conn)
            .await
            .map_err(query_error);

        if let Err(e) = conn.close().await {
            warn!(error = %e, "postgres connection did not close cleanly");
        }

        let values = result?;
        info!(count = values.len(), "fetched assigned addresses");
        Ok(values)
    }
}

fn query_error(e: sqlx::Error) -> AddrSyncError {
    match e {
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            AddrSyncError::decode(format!("postgres row: {e}"))
        }
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => {
            AddrSyncError::Connection(format!("postgres: {e}"))
        }
        other => AddrSyncError::Query(format!("postgres: {other}")),
    }
}
