//! Field-stable wire messages exchanged with collaborating clients.
//!
//! These are the shapes the session engine exposes; renames here are
//! breaking changes for every connected editor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EditKind, EditOp, SelectionRange};

/// A client edit submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditMessage {
    pub document_id: Uuid,
    pub client_op_id: Uuid,
    pub base_sequence: u64,
    #[serde(flatten)]
    pub kind: EditKind,
}

impl EditMessage {
    /// Stamp the message with its authenticated author. The author comes
    /// from the resolved session identity, never from the wire.
    pub fn into_op(self, author: Uuid) -> EditOp {
        EditOp {
            document_id: self.document_id,
            client_op_id: self.client_op_id,
            base_sequence: self.base_sequence,
            kind: self.kind,
            author,
        }
    }
}

/// Acknowledgment returned to the submitting client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditAck {
    pub applied_sequence: u64,
    pub transformed_position: usize,
    pub transformed_length: usize,
}

/// A presence update, broadcast to all other session members.
///
/// Presence is not sequenced through the edit path; last-update-wins
/// per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PresenceMessage {
    Cursor {
        document_id: Uuid,
        user_id: Uuid,
        position: usize,
    },
    Selection {
        document_id: Uuid,
        user_id: Uuid,
        #[serde(flatten)]
        range: SelectionRange,
    },
    Typing {
        document_id: Uuid,
        user_id: Uuid,
        typing: bool,
    },
    Join {
        document_id: Uuid,
        user_id: Uuid,
        name: String,
        color: String,
    },
    Leave {
        document_id: Uuid,
        user_id: Uuid,
    },
}

impl PresenceMessage {
    pub fn document_id(&self) -> Uuid {
        match self {
            PresenceMessage::Cursor { document_id, .. }
            | PresenceMessage::Selection { document_id, .. }
            | PresenceMessage::Typing { document_id, .. }
            | PresenceMessage::Join { document_id, .. }
            | PresenceMessage::Leave { document_id, .. } => *document_id,
        }
    }

    pub fn user_id(&self) -> Uuid {
        match self {
            PresenceMessage::Cursor { user_id, .. }
            | PresenceMessage::Selection { user_id, .. }
            | PresenceMessage::Typing { user_id, .. }
            | PresenceMessage::Join { user_id, .. }
            | PresenceMessage::Leave { user_id, .. } => *user_id,
        }
    }
}

/// Broadcast after an edit moves a comment/selection anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorUpdate {
    pub document_id: Uuid,
    pub anchor_id: Uuid,
    pub from: usize,
    pub to: usize,
    pub invalidated: bool,
}

/// Broadcast when a checkpoint writes a new history version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionEvent {
    pub document_id: Uuid,
    pub version: i32,
    pub author: Uuid,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_message_flattens_kind() {
        let msg = EditMessage {
            document_id: Uuid::nil(),
            client_op_id: Uuid::nil(),
            base_sequence: 0,
            kind: EditKind::Insert {
                position: 5,
                text: ",".to_string(),
            },
        };
        let json = serde_json::to_string(&msg).unwrap();
        // Kind fields sit at the top level of the message
        assert!(json.contains(r#""kind":"insert"#));
        assert!(json.contains(r#""position":5"#));
        assert!(!json.contains(r#""kind":{"#));

        let back: EditMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, msg.kind);
    }

    #[test]
    fn test_edit_message_into_op() {
        let author = Uuid::new_v4();
        let msg = EditMessage {
            document_id: Uuid::new_v4(),
            client_op_id: Uuid::new_v4(),
            base_sequence: 3,
            kind: EditKind::Delete {
                position: 0,
                length: 5,
            },
        };
        let op = msg.clone().into_op(author);
        assert_eq!(op.author, author);
        assert_eq!(op.base_sequence, 3);
        assert_eq!(op.kind, msg.kind);
    }

    #[test]
    fn test_presence_message_kinds() {
        let msg = PresenceMessage::Cursor {
            document_id: Uuid::nil(),
            user_id: Uuid::nil(),
            position: 12,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""kind":"cursor"#));
        assert!(json.contains(r#""position":12"#));

        let msg = PresenceMessage::Selection {
            document_id: Uuid::nil(),
            user_id: Uuid::nil(),
            range: SelectionRange { from: 3, to: 9 },
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""kind":"selection"#));
        assert!(json.contains(r#""from":3"#));
        assert!(json.contains(r#""to":9"#));

        let msg = PresenceMessage::Leave {
            document_id: Uuid::nil(),
            user_id: Uuid::nil(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""kind":"leave"#));
    }

    #[test]
    fn test_presence_message_accessors() {
        let doc = Uuid::new_v4();
        let user = Uuid::new_v4();
        let msg = PresenceMessage::Typing {
            document_id: doc,
            user_id: user,
            typing: true,
        };
        assert_eq!(msg.document_id(), doc);
        assert_eq!(msg.user_id(), user);
    }

    #[test]
    fn test_anchor_update_roundtrip() {
        let update = AnchorUpdate {
            document_id: Uuid::nil(),
            anchor_id: Uuid::nil(),
            from: 2,
            to: 7,
            invalidated: false,
        };
        let json = serde_json::to_string(&update).unwrap();
        let back: AnchorUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }

    #[test]
    fn test_version_event_iso8601() {
        let event = VersionEvent {
            document_id: Uuid::nil(),
            version: 3,
            author: Uuid::nil(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["created_at"].as_str().unwrap().contains('T'));
        assert_eq!(parsed["version"], 3);
    }
}
