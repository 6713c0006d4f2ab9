//! # scribe-core
//!
//! Core types, traits, and abstractions for the Scribe collaborative
//! session engine.
//!
//! This crate provides the foundational data structures, wire protocol,
//! error taxonomy, and event bus that the engine and notification crates
//! depend on.

pub mod defaults;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod protocol;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, SessionEvent};
pub use models::*;
pub use protocol::{AnchorUpdate, EditAck, EditMessage, PresenceMessage, VersionEvent};
pub use traits::{
    DeliveryChannel, DeliveryReceipt, DocumentStore, IdentityProvider, StoredDocument,
    UserIdentity,
};
