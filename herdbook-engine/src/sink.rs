//! Persistence seam for accepted batches
//!
//! The engine never performs storage I/O itself; accepted records are handed
//! to a [`RecordSink`], which reports per-record success and failure counts.

use crate::types::AnimalRecord;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Per-batch persistence counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PersistSummary {
    pub succeeded: usize,
    pub failed: usize,
}

/// Receiver of validated record batches
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Persist a validated batch
    async fn persist(&self, records: &[AnimalRecord]) -> PersistSummary;
}

/// In-memory sink keyed by [`AnimalRecord::key`]
///
/// Insert-only: a record whose key is already stored counts as failed.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: RwLock<BTreeMap<String, AnimalRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<AnimalRecord> {
        self.records.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Snapshot of every stored record, ordered by key
    pub async fn snapshot(&self) -> Vec<AnimalRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn persist(&self, records: &[AnimalRecord]) -> PersistSummary {
        let mut stored = self.records.write().await;
        let mut summary = PersistSummary::default();

        for record in records {
            let key = record.key();
            if stored.contains_key(&key) {
                debug!(key = %key, "Record already stored");
                summary.failed += 1;
            } else {
                stored.insert(key, record.clone());
                summary.succeeded += 1;
            }
        }

        summary
    }
}
