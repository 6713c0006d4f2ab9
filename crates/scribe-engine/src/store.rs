//! In-memory [`DocumentStore`] backend.
//!
//! Serves as the system of record in tests and single-process deployments.
//! Supports flipping into an unavailable state so callers can exercise
//! checkpoint failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use scribe_core::{DocumentStore, Error, Result, StoredDocument};

#[derive(Default)]
pub struct InMemoryDocumentStore {
    docs: RwLock<HashMap<Uuid, StoredDocument>>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document.
    pub async fn insert(&self, document_id: Uuid, text: impl Into<String>) {
        let mut docs = self.docs.write().await;
        docs.insert(
            document_id,
            StoredDocument {
                text: text.into(),
                current_version: 0,
            },
        );
    }

    /// Toggle simulated outage. While unavailable, every call returns
    /// [`Error::PersistenceUnavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::PersistenceUnavailable(
                "document store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn load(&self, document_id: Uuid) -> Result<StoredDocument> {
        self.check_available()?;
        let docs = self.docs.read().await;
        docs.get(&document_id)
            .cloned()
            .ok_or(Error::UnknownDocument(document_id))
    }

    async fn persist_snapshot(&self, document_id: Uuid, version: i32, text: &str) -> Result<()> {
        self.check_available()?;
        let mut docs = self.docs.write().await;
        let doc = docs
            .get_mut(&document_id)
            .ok_or(Error::UnknownDocument(document_id))?;
        doc.text = text.to_string();
        doc.current_version = version;
        Ok(())
    }
}
