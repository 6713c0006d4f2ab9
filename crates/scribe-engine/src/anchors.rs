//! Rebasing of comment/selection anchors across applied edits.
//!
//! Anchors are registered per document and transformed in place every time
//! the sequencer applies an edit. An anchor fully contained by a deletion
//! is flagged invalidated rather than re-pointed at unrelated text; the
//! comment survives as orphaned and the UI decides what to do with it.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, trace};
use uuid::Uuid;

use scribe_core::{AnchorRange, AnchorUpdate, EditKind, Error, Result, SequencedEdit};

/// A live anchor on one document.
#[derive(Debug, Clone)]
pub struct TrackedAnchor {
    pub id: Uuid,
    pub range: AnchorRange,
    pub invalidated: bool,
    /// Comment thread resolved. Resolved anchors keep rebasing (the
    /// thread can be reopened) but are hidden by clients.
    pub resolved: bool,
    /// Highest applied sequence this anchor has been rebased through.
    /// Replaying an already-seen edit is a no-op, which makes rebasing
    /// idempotent per (anchor, op) pair.
    rebased_through: u64,
}

/// Rebase a single `[from, to)` range over one edit.
///
/// Returns the new bounds plus whether the anchor was invalidated by a
/// deletion that fully contains it. Results never leave `[0, new_len]`.
pub fn rebase_range(from: usize, to: usize, kind: &EditKind) -> (usize, usize, bool) {
    match kind {
        EditKind::Insert { position, text } => {
            let shift = text.chars().count();
            if *position >= to {
                // Entirely after the anchor
                (from, to, false)
            } else if *position <= from {
                // Entirely before: shift both bounds
                (from + shift, to + shift, false)
            } else {
                // Inside: the anchor grows around the insertion
                (from, to + shift, false)
            }
        }
        EditKind::Delete { position, length } => {
            let end = position + length;
            if *position >= to {
                (from, to, false)
            } else if end <= from {
                (from - length, to - length, false)
            } else if *position <= from && end >= to {
                // Deletion swallows the whole anchor: orphan it, collapsed
                // at the deletion start
                (*position, *position, true)
            } else {
                let map = |coord: usize| {
                    if coord <= *position {
                        coord
                    } else if coord >= end {
                        coord - length
                    } else {
                        *position
                    }
                };
                (map(from), map(to), false)
            }
        }
    }
}

/// Registry of live anchors, keyed by document id.
#[derive(Debug, Default)]
pub struct AnchorTracker {
    anchors: RwLock<HashMap<Uuid, Vec<TrackedAnchor>>>,
}

impl AnchorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an anchor. `rebased_through` starts at the sequence
    /// the range was computed against, so earlier edits never re-shift it.
    pub async fn track(&self, document_id: Uuid, anchor_id: Uuid, range: AnchorRange, at_sequence: u64) {
        debug_assert!(range.from <= range.to);
        let mut anchors = self.anchors.write().await;
        anchors.entry(document_id).or_default().push(TrackedAnchor {
            id: anchor_id,
            range,
            invalidated: false,
            resolved: false,
            rebased_through: at_sequence,
        });
        debug!(document_id = %document_id, anchor_id = %anchor_id, "anchor tracked");
    }

    /// Stop tracking an anchor (comment resolved and deleted, or document
    /// closed).
    pub async fn untrack(&self, document_id: Uuid, anchor_id: Uuid) -> Result<()> {
        let mut anchors = self.anchors.write().await;
        let list = anchors
            .get_mut(&document_id)
            .ok_or(Error::UnknownDocument(document_id))?;
        let before = list.len();
        list.retain(|a| a.id != anchor_id);
        if list.len() == before {
            return Err(Error::InvalidInput(format!("unknown anchor {anchor_id}")));
        }
        Ok(())
    }

    /// Mark an anchor's comment thread resolved. The anchor keeps
    /// rebasing so the thread can be reopened at the right position.
    pub async fn resolve(&self, document_id: Uuid, anchor_id: Uuid) -> Result<()> {
        let mut anchors = self.anchors.write().await;
        let list = anchors
            .get_mut(&document_id)
            .ok_or(Error::UnknownDocument(document_id))?;
        let anchor = list
            .iter_mut()
            .find(|a| a.id == anchor_id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown anchor {anchor_id}")))?;
        anchor.resolved = true;
        debug!(document_id = %document_id, anchor_id = %anchor_id, "anchor resolved");
        Ok(())
    }

    /// Drop every anchor for a document.
    pub async fn clear(&self, document_id: Uuid) {
        let mut anchors = self.anchors.write().await;
        anchors.remove(&document_id);
    }

    /// Rebase all live anchors on a document over one applied edit.
    ///
    /// Returns updates for anchors whose bounds changed or that became
    /// invalidated, in track order. Must be fed edits in applied-sequence
    /// order; an edit at or below an anchor's watermark is skipped.
    pub async fn rebase(&self, document_id: Uuid, edit: &SequencedEdit) -> Vec<AnchorUpdate> {
        let mut anchors = self.anchors.write().await;
        let Some(list) = anchors.get_mut(&document_id) else {
            return Vec::new();
        };

        let mut updates = Vec::new();
        for anchor in list.iter_mut() {
            if edit.sequence <= anchor.rebased_through {
                trace!(anchor_id = %anchor.id, seq = edit.sequence, "rebase replay skipped");
                continue;
            }
            anchor.rebased_through = edit.sequence;
            if anchor.invalidated {
                continue;
            }

            let (from, to, invalidated) =
                rebase_range(anchor.range.from, anchor.range.to, &edit.kind);
            if from == anchor.range.from && to == anchor.range.to && !invalidated {
                continue;
            }

            anchor.range.from = from;
            anchor.range.to = to;
            anchor.invalidated = invalidated;
            if invalidated {
                debug!(document_id = %document_id, anchor_id = %anchor.id, seq = edit.sequence, "anchor invalidated");
            }
            updates.push(AnchorUpdate {
                document_id,
                anchor_id: anchor.id,
                from,
                to,
                invalidated,
            });
        }
        updates
    }

    /// Snapshot of the live anchors on a document, in track order.
    pub async fn anchors(&self, document_id: Uuid) -> Vec<TrackedAnchor> {
        let anchors = self.anchors.read().await;
        anchors.get(&document_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn edit(sequence: u64, kind: EditKind) -> SequencedEdit {
        SequencedEdit {
            sequence,
            kind,
            author: Uuid::nil(),
            applied_at: Utc::now(),
        }
    }

    fn insert(position: usize, text: &str) -> EditKind {
        EditKind::Insert {
            position,
            text: text.to_string(),
        }
    }

    fn delete(position: usize, length: usize) -> EditKind {
        EditKind::Delete { position, length }
    }

    #[test]
    fn test_rebase_range_edit_after_anchor() {
        assert_eq!(rebase_range(2, 5, &insert(5, "x")), (2, 5, false));
        assert_eq!(rebase_range(2, 5, &delete(6, 3)), (2, 5, false));
    }

    #[test]
    fn test_rebase_range_edit_before_anchor() {
        assert_eq!(rebase_range(6, 11, &insert(5, ",")), (7, 12, false));
        assert_eq!(rebase_range(7, 12, &delete(0, 5)), (2, 7, false));
    }

    #[test]
    fn test_rebase_range_insert_at_start_shifts() {
        assert_eq!(rebase_range(4, 8, &insert(4, "ab")), (6, 10, false));
    }

    #[test]
    fn test_rebase_range_insert_inside_extends() {
        assert_eq!(rebase_range(2, 6, &insert(4, "xyz")), (2, 9, false));
    }

    #[test]
    fn test_rebase_range_delete_containing_invalidates() {
        let (from, to, invalidated) = rebase_range(4, 7, &delete(2, 8));
        assert!(invalidated);
        assert_eq!((from, to), (2, 2));
    }

    #[test]
    fn test_rebase_range_exact_cover_invalidates() {
        let (from, to, invalidated) = rebase_range(3, 6, &delete(3, 3));
        assert!(invalidated);
        assert_eq!((from, to), (3, 3));
    }

    #[test]
    fn test_rebase_range_partial_overlap_clamps() {
        // Delete [4,9) overlapping anchor [6,11): head consumed
        assert_eq!(rebase_range(6, 11, &delete(4, 5)), (4, 6, false));
        // Delete [8,14) overlapping anchor [6,11): tail consumed
        assert_eq!(rebase_range(6, 11, &delete(8, 6)), (6, 8, false));
    }

    #[tokio::test]
    async fn test_rebase_applies_in_order() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(6, 11, "world"), 0)
            .await;

        // "hello world" with a comment on "world"
        let updates = tracker.rebase(doc, &edit(1, insert(5, ","))).await;
        assert_eq!(updates.len(), 1);
        assert_eq!((updates[0].from, updates[0].to), (7, 12));

        let updates = tracker.rebase(doc, &edit(2, delete(0, 5))).await;
        assert_eq!(updates.len(), 1);
        assert_eq!((updates[0].from, updates[0].to), (2, 7));
        assert!(!updates[0].invalidated);
    }

    #[tokio::test]
    async fn test_rebase_idempotent_per_edit() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(6, 11, "world"), 0)
            .await;

        let e = edit(1, insert(0, "abc"));
        let first = tracker.rebase(doc, &e).await;
        assert_eq!((first[0].from, first[0].to), (9, 14));

        // Replaying the same sequenced edit must not shift again
        let second = tracker.rebase(doc, &e).await;
        assert!(second.is_empty());
        let anchors = tracker.anchors(doc).await;
        assert_eq!((anchors[0].range.from, anchors[0].range.to), (9, 14));
    }

    #[tokio::test]
    async fn test_invalidated_anchor_stays_in_bounds() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(3, 8, "lo wo"), 0)
            .await;

        // Delete everything: document length becomes 0
        let updates = tracker.rebase(doc, &edit(1, delete(0, 11))).await;
        assert!(updates[0].invalidated);
        assert!(updates[0].from <= updates[0].to);
        assert_eq!(updates[0].to, 0);
    }

    #[tokio::test]
    async fn test_invalidated_anchor_skips_further_rebase() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(2, 4, "ll"), 0)
            .await;

        let updates = tracker.rebase(doc, &edit(1, delete(0, 6))).await;
        assert!(updates[0].invalidated);

        // Later edits leave the orphaned anchor alone
        let updates = tracker.rebase(doc, &edit(2, insert(0, "fresh"))).await;
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_unaffected_anchor_not_reported() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        tracker
            .track(doc, Uuid::new_v4(), AnchorRange::new(0, 3, "hel"), 0)
            .await;
        tracker
            .track(doc, Uuid::new_v4(), AnchorRange::new(8, 11, "rld"), 0)
            .await;

        let updates = tracker.rebase(doc, &edit(1, insert(5, "x"))).await;
        // Only the anchor after the insert moves
        assert_eq!(updates.len(), 1);
        assert_eq!((updates[0].from, updates[0].to), (9, 12));
    }

    #[tokio::test]
    async fn test_track_untrack() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(0, 1, "h"), 0)
            .await;
        assert_eq!(tracker.anchors(doc).await.len(), 1);

        tracker.untrack(doc, anchor).await.unwrap();
        assert!(tracker.anchors(doc).await.is_empty());

        assert!(tracker.untrack(doc, anchor).await.is_err());
    }

    #[tokio::test]
    async fn test_resolved_anchor_keeps_rebasing() {
        let tracker = AnchorTracker::new();
        let doc = Uuid::new_v4();
        let anchor = Uuid::new_v4();
        tracker
            .track(doc, anchor, AnchorRange::new(6, 11, "world"), 0)
            .await;
        tracker.resolve(doc, anchor).await.unwrap();

        let updates = tracker.rebase(doc, &edit(1, insert(0, "ab"))).await;
        assert_eq!((updates[0].from, updates[0].to), (8, 13));

        let anchors = tracker.anchors(doc).await;
        assert!(anchors[0].resolved);
    }

    #[tokio::test]
    async fn test_rebase_unknown_document_is_empty() {
        let tracker = AnchorTracker::new();
        let updates = tracker
            .rebase(Uuid::new_v4(), &edit(1, insert(0, "x")))
            .await;
        assert!(updates.is_empty());
    }
}
