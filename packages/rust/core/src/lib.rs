//! Reconciliation pipeline for addrsync.
//!
//! Ties the snapshot cache and the store adapters together into two stages:
//! `filter_unassigned` (fetch, diff, snapshot) and `persist_unassigned`
//! (load, stamp, insert).

pub mod persist;
pub mod pipeline;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod testing;
