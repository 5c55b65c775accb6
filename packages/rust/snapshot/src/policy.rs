//! Staleness policies deciding whether an existing snapshot may be reused.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Filesystem facts about a snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotMeta {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Utc>,
}

impl SnapshotMeta {
    /// Age of the snapshot relative to `now`. Clock skew counts as zero.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.modified).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Decides whether a snapshot that exists on disk is still usable.
pub trait StalenessPolicy: Send + Sync {
    /// Whether `meta` may be served instead of refetching.
    fn is_fresh(&self, meta: &SnapshotMeta, now: DateTime<Utc>) -> bool;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// A snapshot that exists is fresh forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExistsForever;

impl StalenessPolicy for ExistsForever {
    fn is_fresh(&self, _meta: &SnapshotMeta, _now: DateTime<Utc>) -> bool {
        true
    }

    fn describe(&self) -> String {
        "exists-forever".into()
    }
}

/// A snapshot is fresh while younger than the wrapped duration.
#[derive(Debug, Clone, Copy)]
pub struct MaxAge(pub Duration);

impl StalenessPolicy for MaxAge {
    fn is_fresh(&self, meta: &SnapshotMeta, now: DateTime<Utc>) -> bool {
        meta.age(now) < self.0
    }

    fn describe(&self) -> String {
        format!("max-age={}s", self.0.as_secs())
    }
}

/// Every snapshot is stale; each load refetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysStale;

impl StalenessPolicy for AlwaysStale {
    fn is_fresh(&self, _meta: &SnapshotMeta, _now: DateTime<Utc>) -> bool {
        false
    }

    fn describe(&self) -> String {
        "always-stale".into()
    }
}
