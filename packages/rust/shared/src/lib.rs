//! Shared types, error model, and configuration for addrsync.
//!
//! This crate is the foundation depended on by all other addrsync crates.
//! It provides:
//! - [`AddrSyncError`] — the unified error type
//! - Domain types ([`GeneratedAddress`], [`UnassignedAddress`], [`DocumentId`])
//! - Configuration ([`AppConfig`], per-store connection resolution, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CacheConfig, MongoConfig, MongoConnection, PostgresConfig, PostgresConnection,
    TlsMode, config_dir, config_file_path, init_config, load_config, load_config_from,
    resolve_mongo, resolve_postgres,
};
pub use error::{AddrSyncError, Result};
pub use types::{
    ASSIGNED_SNAPSHOT, DocumentId, GENERATED_SNAPSHOT, GeneratedAddress, UNASSIGNED_SNAPSHOT,
    UnassignedAddress,
};
