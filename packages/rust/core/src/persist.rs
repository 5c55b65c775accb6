//! Final stamping and bulk insert of unassigned addresses.
//!
//! This is the authoritative stamping point: every record's `created_at` and
//! `updated_at` are overwritten with one timestamp taken when persistence
//! starts, replacing whatever reconciliation wrote into the snapshot.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use addrsync_shared::{Result, UnassignedAddress};
use addrsync_stores::UnassignedSink;

/// Overwrite the bookkeeping timestamps of every record with `now`.
pub fn stamp_all(records: &mut [UnassignedAddress], now: DateTime<Utc>) {
    for record in records.iter_mut() {
        record.stamp(now);
    }
}

/// Stamp `records` with `now` and insert them as one batch.
///
/// An empty batch returns `0` without touching the sink.
#[instrument(skip_all, fields(count = records.len()))]
pub async fn persist(
    mut records: Vec<UnassignedAddress>,
    sink: &dyn UnassignedSink,
    now: DateTime<Utc>,
) -> Result<u64> {
    if records.is_empty() {
        info!("no unassigned addresses to persist, skipping insert");
        return Ok(0);
    }

    stamp_all(&mut records, now);
    let inserted = sink.insert_unassigned(&records).await?;

    info!(inserted, "persisted unassigned addresses");
    Ok(inserted)
}
