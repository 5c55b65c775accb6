//! End-to-end stages: sources → snapshots → reconcile → snapshot → insert.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use addrsync_shared::{
    ASSIGNED_SNAPSHOT, GENERATED_SNAPSHOT, GeneratedAddress, Result, UNASSIGNED_SNAPSHOT,
    UnassignedAddress,
};
use addrsync_snapshot::{SnapshotCache, SnapshotInfo};
use addrsync_stores::{AssignedSource, GeneratedSource, UnassignedSink};

use crate::persist::persist;
use crate::reconcile::reconcile;

/// The two inputs of the filter stage.
#[derive(Clone, Copy)]
pub struct Sources<'a> {
    pub generated: &'a dyn GeneratedSource,
    pub assigned: &'a dyn AssignedSource,
}

/// Result of [`filter_unassigned`].
#[derive(Debug)]
pub struct FilterReport {
    /// Correlates log lines of one run.
    pub run_id: Uuid,
    pub generated: usize,
    pub assigned: usize,
    pub unassigned: usize,
    /// The written unassigned snapshot.
    pub snapshot: SnapshotInfo,
    pub elapsed: Duration,
}

/// Result of [`persist_unassigned`].
#[derive(Debug)]
pub struct PersistReport {
    pub run_id: Uuid,
    /// Records read from the unassigned snapshot.
    pub loaded: usize,
    /// Records the destination acknowledged.
    pub inserted: u64,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a stage completes.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn finish(&self) {}
}

/// Fetch both datasets through the cache, compute the unassigned set, and snapshot it.
///
/// 1. Generated addresses (cached as `generated_addresses.json`)
/// 2. Assigned values (cached as `assigned_addresses.json`)
/// 3. Reconcile
/// 4. Write `unassigned_addresses.json`
#[instrument(skip_all, fields(cache_dir = %cache.dir().display()))]
pub async fn filter_unassigned(
    sources: Sources<'_>,
    cache: &SnapshotCache,
    progress: &dyn ProgressReporter,
) -> Result<FilterReport> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    info!(%run_id, policy = %cache.policy(), "starting filter stage");

    progress.phase("Loading generated addresses");
    let generated: Vec<GeneratedAddress> = cache
        .load_or_fetch(GENERATED_SNAPSHOT, || sources.generated.fetch_generated())
        .await?;

    progress.phase("Loading assigned addresses");
    let assigned: Vec<String> = cache
        .load_or_fetch(ASSIGNED_SNAPSHOT, || sources.assigned.fetch_assigned())
        .await?;

    progress.phase("Reconciling");
    let unassigned = reconcile(&generated, &assigned, Utc::now())?;

    progress.phase("Writing unassigned snapshot");
    let snapshot = cache.store(UNASSIGNED_SNAPSHOT, &unassigned)?;

    let report = FilterReport {
        run_id,
        generated: generated.len(),
        assigned: assigned.len(),
        unassigned: unassigned.len(),
        snapshot,
        elapsed: start.elapsed(),
    };
    progress.finish();

    info!(
        %run_id,
        generated = report.generated,
        assigned = report.assigned,
        unassigned = report.unassigned,
        elapsed_ms = report.elapsed.as_millis(),
        "filter stage complete"
    );

    Ok(report)
}

/// Load the unassigned snapshot, stamp it, and insert it into the destination.
#[instrument(skip_all, fields(cache_dir = %cache.dir().display()))]
pub async fn persist_unassigned(
    cache: &SnapshotCache,
    sink: &dyn UnassignedSink,
    progress: &dyn ProgressReporter,
) -> Result<PersistReport> {
    let start = Instant::now();
    let run_id = Uuid::now_v7();
    info!(%run_id, "starting persist stage");

    progress.phase("Loading unassigned snapshot");
    let records: Vec<UnassignedAddress> = cache.load(UNASSIGNED_SNAPSHOT)?;
    let loaded = records.len();

    progress.phase("Inserting unassigned addresses");
    let inserted = persist(records, sink, Utc::now()).await?;

    let report = PersistReport {
        run_id,
        loaded,
        inserted,
        elapsed: start.elapsed(),
    };
    progress.finish();

    info!(
        %run_id,
        loaded,
        inserted,
        elapsed_ms = report.elapsed.as_millis(),
        "persist stage complete"
    );

    Ok(report)
}
