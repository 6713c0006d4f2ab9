//! Version history: checkpoint snapshots, unified diffs, restore.
//!
//! Versions store the full content snapshot; diffs are derived on read
//! with `similar`. History is capped per document, evicting oldest first
//! while version numbering stays contiguous from the checkpoint stream's
//! point of view (numbers are never reassigned).

use std::collections::HashMap;

use chrono::Utc;
use similar::{ChangeTag, TextDiff};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use scribe_core::{defaults, Error, NoteVersion, Result};

/// In-memory per-document version log.
pub struct VersionHistoryStore {
    versions: RwLock<HashMap<Uuid, Vec<NoteVersion>>>,
    max_versions: usize,
}

impl Default for VersionHistoryStore {
    fn default() -> Self {
        Self::new(defaults::MAX_HISTORY_VERSIONS)
    }
}

impl VersionHistoryStore {
    pub fn new(max_versions: usize) -> Self {
        Self {
            versions: RwLock::new(HashMap::new()),
            max_versions,
        }
    }

    /// Append a snapshot as the next version of a document.
    ///
    /// Version numbers start at 1 and increase by 1 per snapshot, even
    /// after older versions have been evicted by the cap.
    pub async fn append(
        &self,
        document_id: Uuid,
        content: impl Into<String>,
        created_by: Uuid,
    ) -> NoteVersion {
        let mut versions = self.versions.write().await;
        let log = versions.entry(document_id).or_default();
        let version_number = log.last().map(|v| v.version_number + 1).unwrap_or(1);

        let version = NoteVersion {
            id: Uuid::new_v4(),
            document_id,
            version_number,
            content: content.into(),
            created_by,
            created_at: Utc::now(),
        };
        log.push(version.clone());

        if log.len() > self.max_versions {
            let excess = log.len() - self.max_versions;
            log.drain(..excess);
        }

        debug!(document_id = %document_id, version = version_number, "version snapshot appended");
        version
    }

    /// All retained versions, oldest first.
    pub async fn list(&self, document_id: Uuid) -> Vec<NoteVersion> {
        let versions = self.versions.read().await;
        versions.get(&document_id).cloned().unwrap_or_default()
    }

    /// One retained version by number.
    pub async fn get(&self, document_id: Uuid, version_number: i32) -> Result<NoteVersion> {
        let versions = self.versions.read().await;
        versions
            .get(&document_id)
            .and_then(|log| log.iter().find(|v| v.version_number == version_number))
            .cloned()
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "version {version_number} not retained for document {document_id}"
                ))
            })
    }

    /// Line-based unified diff between two retained versions.
    pub async fn diff(&self, document_id: Uuid, from: i32, to: i32) -> Result<String> {
        let old = self.get(document_id, from).await?;
        let new = self.get(document_id, to).await?;
        Ok(render_diff(
            &old.content,
            &new.content,
            from,
            to,
        ))
    }

    /// Content of a version, for restoring as a new edit. Restoring never
    /// rewrites the log; the caller applies the returned content as a
    /// fresh change on top of the current state.
    pub async fn restore(&self, document_id: Uuid, version_number: i32) -> Result<String> {
        let version = self.get(document_id, version_number).await?;
        Ok(version.content)
    }

    /// Drop a document's log when its session is torn down.
    pub async fn forget(&self, document_id: Uuid) {
        let mut versions = self.versions.write().await;
        versions.remove(&document_id);
    }

    /// Highest retained version number (0 if none).
    pub async fn latest_number(&self, document_id: Uuid) -> i32 {
        let versions = self.versions.read().await;
        versions
            .get(&document_id)
            .and_then(|log| log.last())
            .map(|v| v.version_number)
            .unwrap_or(0)
    }
}

fn render_diff(old: &str, new: &str, from: i32, to: i32) -> String {
    let diff = TextDiff::from_lines(old, new);
    let mut out = format!("--- version {from}\n+++ version {to}\n");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        out.push_str(sign);
        out.push_str(change.value());
        if !change.value().ends_with('\n') {
            out.push('\n');
        }
    }
    out
}
