//! Per-document edit sequence numbering.

use std::collections::HashMap;

use tokio::sync::Mutex;
use uuid::Uuid;

/// Issues monotonically increasing per-document sequence numbers.
///
/// A document's counter starts at 0 (meaning "no edits yet"); the first
/// sequenced edit gets 1. Numbers are never reused for the lifetime of the
/// session and can be re-seeded from persisted state with [`resume`].
/// Exhaustion of a `u64` counter is treated as unreachable.
///
/// [`resume`]: SequenceClock::resume
#[derive(Debug, Default)]
pub struct SequenceClock {
    counters: Mutex<HashMap<Uuid, u64>>,
}

impl SequenceClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number for a document.
    pub async fn next(&self, document_id: Uuid) -> u64 {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(document_id).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Current sequence number for a document (0 if never seen).
    pub async fn current(&self, document_id: Uuid) -> u64 {
        let counters = self.counters.lock().await;
        counters.get(&document_id).copied().unwrap_or(0)
    }

    /// Seed a document's counter, e.g. when resuming a session from a
    /// persisted snapshot. Never moves the counter backwards.
    pub async fn resume(&self, document_id: Uuid, sequence: u64) {
        let mut counters = self.counters.lock().await;
        let counter = counters.entry(document_id).or_insert(0);
        *counter = (*counter).max(sequence);
    }

    /// Drop a document's counter when its session closes.
    pub async fn forget(&self, document_id: Uuid) {
        let mut counters = self.counters.lock().await;
        counters.remove(&document_id);
    }
}
