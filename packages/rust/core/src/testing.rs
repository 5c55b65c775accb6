//! In-memory fakes and fixtures shared by the core tests.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use addrsync_shared::{AddrSyncError, GeneratedAddress, Result, UnassignedAddress};
use addrsync_stores::{AssignedSource, GeneratedSource, UnassignedSink};

pub(crate) fn temp_dir() -> PathBuf {
    std::env::temp_dir().join(format!("addrsync-core-test-{}", uuid::Uuid::now_v7()))
}

/// A generated record whose id is `n` rendered as a 24-digit hex ObjectId.
pub(crate) fn generated(n: u64, value: &str) -> GeneratedAddress {
    generated_with_id(&format!("{n:024x}"), value)
}

pub(crate) fn generated_with_id(id: &str, value: &str) -> GeneratedAddress {
    GeneratedAddress {
        id: id.to_string(),
        value: value.to_string(),
        kind: "segwit".into(),
        currency_iso: "BTC".into(),
        client: "SENDCASH".into(),
        created_at: Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub(crate) struct FakeGenerated {
    pub records: Vec<GeneratedAddress>,
    pub calls: AtomicUsize,
}

impl FakeGenerated {
    pub fn new(records: Vec<GeneratedAddress>) -> Self {
        Self {
            records,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeneratedSource for FakeGenerated {
    async fn fetch_generated(&self) -> Result<Vec<GeneratedAddress>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub(crate) struct FakeAssigned {
    pub values: Vec<String>,
    pub calls: AtomicUsize,
}

impl FakeAssigned {
    pub fn new(values: &[&str]) -> Self {
        Self {
            values: values.iter().map(|v| (*v).to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssignedSource for FakeAssigned {
    async fn fetch_assigned(&self) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.clone())
    }
}

/// Records every batch it receives; optionally refuses writes.
#[derive(Default)]
pub(crate) struct FakeSink {
    pub batches: Mutex<Vec<Vec<UnassignedAddress>>>,
    pub fail: bool,
}

impl FakeSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn inserted(&self) -> Vec<UnassignedAddress> {
        self.batches.lock().unwrap().concat()
    }
}

#[async_trait]
impl UnassignedSink for FakeSink {
    async fn insert_unassigned(&self, records: &[UnassignedAddress]) -> Result<u64> {
        self.batches.lock().unwrap().push(records.to_vec());
        if self.fail {
            return Err(AddrSyncError::Insert("duplicate key".into()));
        }
        Ok(records.len() as u64)
    }
}
