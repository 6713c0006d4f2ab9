//! Server-side edit sequencing: one logical actor per open document.
//!
//! Every open document owns a mutex around its authoritative text and edit
//! log; that mutex is the single serialization point for the document.
//! Submissions against different documents proceed fully in parallel.
//!
//! A submission computed against a stale sequence number is transformed
//! forward over every edit applied since its base before it is validated,
//! applied, and assigned the next sequence number. Anchors are rebased and
//! the checkpoint policy evaluated inside the same critical section, so
//! observers always see log, anchors, and history move together. Store
//! I/O is not: checkpoint snapshots land on an append-only queue and are
//! persisted outside any document lock, so a slow or unreachable store
//! never stalls live editing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scribe_core::{
    defaults, DocumentStore, EditAck, EditOp, Error, EventBus, Result, SequencedEdit, SessionEvent,
};

use crate::anchors::AnchorTracker;
use crate::clock::SequenceClock;
use crate::history::VersionHistoryStore;
use crate::transform::{apply_kind, transform_kind, validate_kind};

/// When to cut a history version and persist a snapshot.
#[derive(Debug, Clone)]
pub struct CheckpointPolicy {
    /// Checkpoint after this many applied edits.
    pub max_edits: usize,
    /// Checkpoint if this much time has passed since the last one,
    /// evaluated on the next applied edit.
    pub max_interval: Duration,
}

impl Default for CheckpointPolicy {
    fn default() -> Self {
        Self {
            max_edits: defaults::CHECKPOINT_EDIT_COUNT,
            max_interval: Duration::from_secs(defaults::CHECKPOINT_INTERVAL_SECS),
        }
    }
}

impl CheckpointPolicy {
    /// Create policy from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `CHECKPOINT_EDIT_COUNT` | `25` | Edits between snapshots |
    /// | `CHECKPOINT_INTERVAL_SECS` | `300` | Max seconds between snapshots |
    pub fn from_env() -> Self {
        let max_edits = std::env::var("CHECKPOINT_EDIT_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::CHECKPOINT_EDIT_COUNT);
        let interval_secs = std::env::var("CHECKPOINT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::CHECKPOINT_INTERVAL_SECS);
        Self {
            max_edits,
            max_interval: Duration::from_secs(interval_secs),
        }
    }
}

/// Mutable per-document session state, guarded by one mutex.
struct DocumentState {
    text: String,
    /// Applied edits in sequence order, lowest first.
    log: Vec<SequencedEdit>,
    /// Acks by client op id, the idempotency ledger for resubmissions.
    acks: HashMap<Uuid, EditAck>,
    edits_since_checkpoint: usize,
    last_checkpoint: Instant,
    last_author: Uuid,
}

/// Authoritative edit pipeline for all open documents.
pub struct EditSequencer {
    docs: RwLock<HashMap<Uuid, Arc<Mutex<DocumentState>>>>,
    clock: SequenceClock,
    anchors: Arc<AnchorTracker>,
    history: Arc<VersionHistoryStore>,
    store: Arc<dyn DocumentStore>,
    events: Arc<EventBus>,
    policy: CheckpointPolicy,
    /// Append-only queue of checkpoint snapshots awaiting persistence,
    /// drained by [`flush_pending`]. Store I/O never runs under a
    /// document lock.
    ///
    /// [`flush_pending`]: EditSequencer::flush_pending
    pending_persists: Mutex<Vec<(Uuid, i32, String)>>,
}

impl EditSequencer {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<EventBus>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            clock: SequenceClock::new(),
            anchors: Arc::new(AnchorTracker::new()),
            history: Arc::new(VersionHistoryStore::default()),
            store,
            events,
            policy: CheckpointPolicy::default(),
            pending_persists: Mutex::new(Vec::new()),
        }
    }

    pub fn with_policy(mut self, policy: CheckpointPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn anchors(&self) -> Arc<AnchorTracker> {
        self.anchors.clone()
    }

    pub fn history(&self) -> Arc<VersionHistoryStore> {
        self.history.clone()
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Open a document session, cold-starting from the document store.
    ///
    /// Idempotent: reopening an already-open document is a no-op. The
    /// loaded content becomes history version 1 so a session can always
    /// be restored to its starting point.
    pub async fn open(&self, document_id: Uuid) -> Result<()> {
        {
            let docs = self.docs.read().await;
            if docs.contains_key(&document_id) {
                return Ok(());
            }
        }

        let stored = self.store.load(document_id).await?;
        self.clock
            .resume(document_id, stored.current_version.max(0) as u64)
            .await;

        let mut docs = self.docs.write().await;
        // Lost the race to another open; theirs wins
        if docs.contains_key(&document_id) {
            return Ok(());
        }

        if self.history.latest_number(document_id).await == 0 {
            self.history
                .append(document_id, stored.text.clone(), Uuid::nil())
                .await;
        }

        info!(
            document_id = %document_id,
            len = stored.text.chars().count(),
            "document session opened"
        );
        docs.insert(
            document_id,
            Arc::new(Mutex::new(DocumentState {
                text: stored.text,
                log: Vec::new(),
                acks: HashMap::new(),
                edits_since_checkpoint: 0,
                last_checkpoint: Instant::now(),
                last_author: Uuid::nil(),
            })),
        );
        Ok(())
    }

    /// Sequence and apply one client edit, returning its acknowledgment.
    ///
    /// Resubmitting the same `client_op_id` returns the original ack
    /// without reapplying. A `base_sequence` ahead of the server, or so
    /// far behind that the session log no longer covers it, is rejected
    /// as [`Error::StaleSubmission`]. An out-of-bounds transformed range
    /// is rejected as [`Error::InvalidRange`] without mutating anything.
    pub async fn submit(&self, op: EditOp) -> Result<EditAck> {
        let state = self.state(op.document_id).await?;
        let mut state = state.lock().await;

        if let Some(ack) = state.acks.get(&op.client_op_id) {
            debug!(
                document_id = %op.document_id,
                client_op_id = %op.client_op_id,
                "duplicate submission, replaying ack"
            );
            return Ok(*ack);
        }

        let current = self.clock.current(op.document_id).await;
        if op.base_sequence > current {
            return Err(Error::StaleSubmission {
                base: op.base_sequence,
                current,
            });
        }
        if let Some(first) = state.log.first() {
            // The session log only reaches back to its first entry
            if op.base_sequence + 1 < first.sequence {
                return Err(Error::StaleSubmission {
                    base: op.base_sequence,
                    current,
                });
            }
        }

        let mut kind = op.kind.clone();
        for applied in state.log.iter().filter(|e| e.sequence > op.base_sequence) {
            kind = transform_kind(&kind, &applied.kind);
        }

        if !validate_kind(&kind, state.text.chars().count()) {
            return Err(Error::InvalidRange(format!(
                "edit at {} (len {}) exceeds document length {}",
                kind.position(),
                kind.length(),
                state.text.chars().count()
            )));
        }

        let sequence = self.clock.next(op.document_id).await;
        state.text = apply_kind(&state.text, &kind);

        let entry = SequencedEdit {
            sequence,
            kind,
            author: op.author,
            applied_at: Utc::now(),
        };
        let ack = EditAck {
            applied_sequence: sequence,
            transformed_position: entry.kind.position(),
            transformed_length: entry.kind.length(),
        };
        state.acks.insert(op.client_op_id, ack);
        state.last_author = op.author;

        debug!(
            document_id = %op.document_id,
            sequence,
            author = %op.author,
            "edit applied"
        );
        self.events.emit(SessionEvent::EditApplied {
            document_id: op.document_id,
            sequence,
            author: op.author,
        });

        for update in self.anchors.rebase(op.document_id, &entry).await {
            self.events.emit(SessionEvent::AnchorUpdated { update });
        }
        state.log.push(entry);

        state.edits_since_checkpoint += 1;
        if state.edits_since_checkpoint >= self.policy.max_edits
            || state.last_checkpoint.elapsed() >= self.policy.max_interval
        {
            self.checkpoint_locked(op.document_id, &mut state).await;
        }

        Ok(ack)
    }

    /// Current authoritative text.
    pub async fn text(&self, document_id: Uuid) -> Result<String> {
        let state = self.state(document_id).await?;
        let state = state.lock().await;
        Ok(state.text.clone())
    }

    /// Highest applied sequence number.
    pub async fn sequence(&self, document_id: Uuid) -> Result<u64> {
        self.state(document_id).await?;
        Ok(self.clock.current(document_id).await)
    }

    /// Force a checkpoint regardless of policy thresholds.
    pub async fn checkpoint_now(&self, document_id: Uuid) -> Result<i32> {
        let state = self.state(document_id).await?;
        let mut state = state.lock().await;
        Ok(self.checkpoint_locked(document_id, &mut state).await)
    }

    /// Drain queued checkpoint snapshots to the document store.
    /// Returns how many are still pending afterwards. Embedders drive
    /// this from a background task; [`close`] calls it on teardown.
    ///
    /// [`close`]: EditSequencer::close
    pub async fn flush_pending(&self) -> usize {
        let queued = {
            let mut pending = self.pending_persists.lock().await;
            std::mem::take(&mut *pending)
        };

        let mut still_pending = Vec::new();
        for (document_id, version, text) in queued {
            match self.store.persist_snapshot(document_id, version, &text).await {
                Ok(()) => {
                    info!(document_id = %document_id, version, "deferred snapshot persisted");
                }
                Err(e) => {
                    warn!(document_id = %document_id, version, error = %e, "snapshot retry failed");
                    still_pending.push((document_id, version, text));
                }
            }
        }

        let mut pending = self.pending_persists.lock().await;
        // New failures may have queued while we were flushing
        still_pending.extend(pending.drain(..));
        *pending = still_pending;
        pending.len()
    }

    /// Close a document session: final checkpoint if edits are
    /// unsnapshotted, flush the persist queue, then drop the in-memory
    /// state. The flush happens after the document lock is released.
    pub async fn close(&self, document_id: Uuid) -> Result<()> {
        let state = self.state(document_id).await?;
        {
            let mut state = state.lock().await;
            if state.edits_since_checkpoint > 0 {
                self.checkpoint_locked(document_id, &mut state).await;
            }
        }

        let remaining = self.flush_pending().await;
        if remaining > 0 {
            warn!(
                document_id = %document_id,
                remaining,
                "snapshots still queued at close; store unreachable"
            );
        }

        let mut docs = self.docs.write().await;
        docs.remove(&document_id);
        self.clock.forget(document_id).await;
        info!(document_id = %document_id, "document session closed");
        Ok(())
    }

    async fn state(&self, document_id: Uuid) -> Result<Arc<Mutex<DocumentState>>> {
        let docs = self.docs.read().await;
        docs.get(&document_id)
            .cloned()
            .ok_or(Error::UnknownDocument(document_id))
    }

    /// Cut a history version and queue its snapshot for persistence.
    ///
    /// The document store is never awaited here: this runs inside the
    /// document's serialization point, and a slow store must not stall
    /// live editing. Snapshots go onto the persist queue and reach the
    /// store via [`flush_pending`].
    ///
    /// [`flush_pending`]: EditSequencer::flush_pending
    async fn checkpoint_locked(&self, document_id: Uuid, state: &mut DocumentState) -> i32 {
        let author = state.last_author;
        let version = self
            .history
            .append(document_id, state.text.clone(), author)
            .await;
        state.edits_since_checkpoint = 0;
        state.last_checkpoint = Instant::now();

        self.events.emit(SessionEvent::VersionCreated {
            document_id,
            version: version.version_number,
            author,
            created_at: version.created_at,
        });

        debug!(
            document_id = %document_id,
            version = version.version_number,
            "snapshot queued for persistence"
        );
        let mut pending = self.pending_persists.lock().await;
        pending.push((document_id, version.version_number, state.text.clone()));

        version.version_number
    }
}
