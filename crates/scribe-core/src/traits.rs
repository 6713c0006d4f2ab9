//! Contracts for external collaborators.
//!
//! The session engine treats persistence, identity, and delivery as
//! pluggable backends; these traits are the full extent of what it
//! assumes about them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Notification;

/// A document as loaded from the system of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub text: String,
    pub current_version: i32,
}

/// System of record for document text, consulted on first join and
/// written to on checkpoints.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document's text and current version.
    ///
    /// Returns [`crate::Error::UnknownDocument`] if the document does not
    /// exist.
    async fn load(&self, document_id: Uuid) -> Result<StoredDocument>;

    /// Persist a checkpoint snapshot.
    async fn persist_snapshot(&self, document_id: Uuid, version: i32, text: &str) -> Result<()>;
}

/// Resolved identity for a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
}

/// Resolves session tokens to identities. The engine never authenticates
/// credentials itself.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn resolve(&self, session_token: &str) -> Result<UserIdentity>;
}

/// Outcome reported by a delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryReceipt {
    Delivered,
    Failed(String),
}

/// External push/email channel for finalized notification payloads.
///
/// A notification is only marked delivered once the channel acknowledges;
/// everything else stays a retry candidate.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, notification: &Notification) -> Result<DeliveryReceipt>;
}
