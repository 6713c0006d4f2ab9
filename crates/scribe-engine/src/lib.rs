//! Collaborative session engine: server-sequenced edits, anchor rebasing,
//! live presence, and version history.
//!
//! The engine is transport-agnostic. A server layer feeds it
//! [`scribe_core::EditOp`] and presence messages and fans
//! [`scribe_core::SessionEvent`]s back out to connected clients; the engine
//! owns ordering, convergence, and checkpointing.

pub mod anchors;
pub mod clock;
pub mod history;
pub mod presence;
pub mod sequencer;
pub mod store;
pub mod transform;

pub use anchors::{rebase_range, AnchorTracker, TrackedAnchor};
pub use clock::SequenceClock;
pub use history::VersionHistoryStore;
pub use presence::{PresenceConfig, PresenceRegistry};
pub use sequencer::{CheckpointPolicy, EditSequencer};
pub use store::InMemoryDocumentStore;
pub use transform::{apply_kind, transform_kind, validate_kind};
