//! Local snapshot cache for fetched and computed datasets.
//!
//! A [`SnapshotCache`] maps a fixed file name to a JSON snapshot inside one
//! directory. [`SnapshotCache::load_or_fetch`] serves a snapshot when the
//! configured [`StalenessPolicy`] calls it fresh, and otherwise runs the fetch
//! closure and writes its result back.
//!
//! **Access rules:** single process, single run. Two runs sharing a cache
//! directory race on the existence check.

mod policy;

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use addrsync_shared::{AddrSyncError, Result};

pub use policy::{AlwaysStale, ExistsForever, MaxAge, SnapshotMeta, StalenessPolicy};

/// Result of writing a snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// File name within the cache directory.
    pub name: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// SHA-256 of the written bytes.
    pub sha256: String,
    /// Size of the written file.
    pub size_bytes: usize,
}

/// File-backed snapshot store with a pluggable staleness policy.
pub struct SnapshotCache {
    dir: PathBuf,
    policy: Box<dyn StalenessPolicy>,
}

impl SnapshotCache {
    /// Cache in `dir` treating any existing snapshot as fresh.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_policy(dir, ExistsForever)
    }

    /// Cache in `dir` with an explicit staleness policy.
    pub fn with_policy(dir: impl Into<PathBuf>, policy: impl StalenessPolicy + 'static) -> Self {
        Self {
            dir: dir.into(),
            policy: Box::new(policy),
        }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Label of the active staleness policy.
    pub fn policy(&self) -> String {
        self.policy.describe()
    }

    /// Full path of the snapshot called `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Filesystem metadata for `name`, or `None` when it does not exist.
    pub fn status(&self, name: &str) -> Result<Option<SnapshotMeta>> {
        let path = self.path_for(name);
        match std::fs::metadata(&path) {
            Ok(md) => {
                let modified = md
                    .modified()
                    .map_err(|e| AddrSyncError::io(&path, e))?;
                Ok(Some(SnapshotMeta {
                    path,
                    size_bytes: md.len(),
                    modified: DateTime::<Utc>::from(modified),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AddrSyncError::io(&path, e)),
        }
    }

    /// Whether `name` exists and the policy accepts it.
    pub fn is_fresh(&self, name: &str) -> Result<bool> {
        Ok(self
            .status(name)?
            .is_some_and(|meta| self.policy.is_fresh(&meta, Utc::now())))
    }

    /// Load `name` if fresh; otherwise run `fetch`, store its result, and return it.
    ///
    /// `fetch` is not called at all on a fresh hit. A snapshot that exists but
    /// fails to parse is an error; it is not refetched.
    pub async fn load_or_fetch<T, F, Fut>(&self, name: &str, fetch: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.is_fresh(name)? {
            info!(snapshot = name, policy = %self.policy(), "serving dataset from snapshot");
            return self.load(name);
        }

        debug!(snapshot = name, "snapshot missing or stale, fetching from source");
        let data = fetch().await?;
        let written = self.store(name, &data)?;
        info!(
            snapshot = name,
            size_bytes = written.size_bytes,
            "fetched dataset and wrote snapshot"
        );
        Ok(data)
    }

    /// Read and parse the snapshot called `name`.
    ///
    /// A JSON `null` document loads as `T::default()`; the earlier batch tool
    /// wrote empty datasets that way.
    pub fn load<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.path_for(name);
        let bytes = match std::fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AddrSyncError::validation(format!(
                    "snapshot {} does not exist",
                    path.display()
                )));
            }
            Err(e) => return Err(AddrSyncError::io(&path, e)),
        };

        let data: Option<T> = serde_json::from_slice(&bytes).map_err(|e| {
            AddrSyncError::decode(format!("invalid snapshot {}: {e}", path.display()))
        })?;

        Ok(data.unwrap_or_default())
    }

    /// Serialize `data` to the snapshot called `name`.
    ///
    /// Writes to a temp file first and renames it into place, creating the
    /// cache directory if needed.
    pub fn store<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> Result<SnapshotInfo> {
        std::fs::create_dir_all(&self.dir).map_err(|e| AddrSyncError::io(&self.dir, e))?;

        let bytes = serde_json::to_vec(data).map_err(|e| {
            AddrSyncError::decode(format!("failed to serialize snapshot {name}: {e}"))
        })?;

        let target = self.path_for(name);
        let temp = self.dir.join(format!(".{name}.tmp"));

        std::fs::write(&temp, &bytes).map_err(|e| AddrSyncError::io(&temp, e))?;
        std::fs::rename(&temp, &target).map_err(|e| AddrSyncError::io(&target, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let sha256 = format!("{:x}", hasher.finalize());

        debug!(path = %target.display(), size = bytes.len(), "wrote snapshot");

        Ok(SnapshotInfo {
            name: name.to_string(),
            path: target,
            sha256,
            size_bytes: bytes.len(),
        })
    }

    /// Delete the snapshot called `name`. Returns whether a file was removed.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "removed snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AddrSyncError::io(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("addrsync-snapshot-test-{}", uuid::Uuid::now_v7()))
    }

    fn values() -> Vec<String> {
        vec!["addr1".into(), "addr2".into()]
    }

    #[tokio::test]
    async fn miss_fetches_and_writes() {
        let cache = SnapshotCache::new(temp_dir());
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        let data: Vec<String> = cache
            .load_or_fetch("assigned.json", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(values())
            })
            .await
            .expect("fetch on miss");

        assert_eq!(data, values());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.path_for("assigned.json").exists());
        assert!(!cache.dir().join(".assigned.json.tmp").exists());
    }

    #[tokio::test]
    async fn hit_skips_fetch_and_returns_identical_content() {
        let cache = SnapshotCache::new(temp_dir());
        cache.store("assigned.json", &values()).unwrap();
        let before = std::fs::read(cache.path_for("assigned.json")).unwrap();

        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let counter = &calls;
            let data: Vec<String> = cache
                .load_or_fetch("assigned.json", move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(vec!["other".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(data, values());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let after = std::fs::read(cache.path_for("assigned.json")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_fatal_and_not_refetched() {
        let cache = SnapshotCache::new(temp_dir());
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.path_for("generated.json"), b"[{\"trunc").unwrap();

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let result: Result<Vec<String>> = cache
            .load_or_fetch("generated.json", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(values())
            })
            .await;

        assert!(matches!(result, Err(AddrSyncError::Decode { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_error_leaves_no_snapshot() {
        let cache = SnapshotCache::new(temp_dir());
        let result: Result<Vec<String>> = cache
            .load_or_fetch("assigned.json", || async {
                Err(AddrSyncError::Connection("refused".into()))
            })
            .await;

        assert!(matches!(result, Err(AddrSyncError::Connection(_))));
        assert!(cache.status("assigned.json").unwrap().is_none());
    }

    #[tokio::test]
    async fn always_stale_refetches_and_overwrites() {
        let cache = SnapshotCache::with_policy(temp_dir(), AlwaysStale);
        cache.store("assigned.json", &values()).unwrap();

        let data: Vec<String> = cache
            .load_or_fetch("assigned.json", || async { Ok(vec!["fresh".to_string()]) })
            .await
            .unwrap();
        assert_eq!(data, vec!["fresh".to_string()]);

        let reloaded: Vec<String> = cache.load("assigned.json").unwrap();
        assert_eq!(reloaded, data);
    }

    #[tokio::test]
    async fn max_age_serves_recent_snapshot() {
        let cache = SnapshotCache::with_policy(temp_dir(), MaxAge(Duration::from_secs(3600)));
        cache.store("assigned.json", &values()).unwrap();
        assert!(cache.is_fresh("assigned.json").unwrap());
        assert_eq!(cache.policy(), "max-age=3600s");
    }

    #[test]
    fn load_missing_snapshot_is_validation_error() {
        let cache = SnapshotCache::new(temp_dir());
        let err = cache.load::<Vec<String>>("unassigned.json").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn null_snapshot_is_an_empty_hit() {
        let cache = SnapshotCache::new(temp_dir());
        std::fs::create_dir_all(cache.dir()).unwrap();
        std::fs::write(cache.path_for("assigned.json"), b"null").unwrap();

        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let data: Vec<String> = cache
            .load_or_fetch("assigned.json", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(values())
            })
            .await
            .unwrap();

        assert!(data.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn store_reports_checksum_and_size() {
        let cache = SnapshotCache::new(temp_dir());
        let a = cache.store("a.json", &values()).unwrap();
        let b = cache.store("b.json", &values()).unwrap();
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(a.size_bytes, br#"["addr1","addr2"]"#.len());

        let meta = cache.status("a.json").unwrap().expect("exists");
        assert_eq!(meta.size_bytes as usize, a.size_bytes);
    }

    #[test]
    fn remove_is_idempotent() {
        let cache = SnapshotCache::new(temp_dir());
        cache.store("a.json", &values()).unwrap();
        assert!(cache.remove("a.json").unwrap());
        assert!(!cache.remove("a.json").unwrap());
    }
}
