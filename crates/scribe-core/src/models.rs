//! Domain models for collaborative document sessions.
//!
//! Field sets follow the product's wire contracts: presence and comment
//! shapes from the document editor, version entries from note history, and
//! the closed notification type/priority sets from the notification service.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// EDITS
// =============================================================================

/// A single text mutation, in character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EditKind {
    /// Insert `text` at `position`.
    Insert { position: usize, text: String },
    /// Delete `length` characters starting at `position`.
    Delete { position: usize, length: usize },
}

impl EditKind {
    /// Character position where this edit takes effect.
    pub fn position(&self) -> usize {
        match self {
            EditKind::Insert { position, .. } => *position,
            EditKind::Delete { position, .. } => *position,
        }
    }

    /// Net change in document length once applied.
    pub fn length_delta(&self) -> i64 {
        match self {
            EditKind::Insert { text, .. } => text.chars().count() as i64,
            EditKind::Delete { length, .. } => -(*length as i64),
        }
    }

    /// Number of characters inserted or deleted.
    pub fn length(&self) -> usize {
        match self {
            EditKind::Insert { text, .. } => text.chars().count(),
            EditKind::Delete { length, .. } => *length,
        }
    }
}

/// A client-submitted edit, computed against `base_sequence`.
///
/// Immutable once sequenced. `client_op_id` is the idempotency key for
/// at-least-once resubmission after a dropped acknowledgment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditOp {
    pub document_id: Uuid,
    pub client_op_id: Uuid,
    pub base_sequence: u64,
    pub kind: EditKind,
    pub author: Uuid,
}

/// An edit after sequencing: transformed coordinates plus the sequence
/// number the server assigned. Entries form the per-document edit log.
#[derive(Debug, Clone, Serialize)]
pub struct SequencedEdit {
    pub sequence: u64,
    pub kind: EditKind,
    pub author: Uuid,
    pub applied_at: DateTime<Utc>,
}

// =============================================================================
// PRESENCE
// =============================================================================

/// A selection range in character offsets, `from <= to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub from: usize,
    pub to: usize,
}

/// Live per-user session state for one open document.
///
/// Created on join, mutated on every presence event, removed on explicit
/// leave or liveness timeout. Not part of document content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaborativeUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    /// Display color (hex) assigned at join time.
    pub color: String,
    /// Cursor offset, if the client has reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<SelectionRange>,
    /// Whether the user is currently typing.
    pub typing: bool,
    pub joined_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

// =============================================================================
// COMMENTS
// =============================================================================

/// A text-range anchor in document coordinates.
///
/// `text` is the anchored substring at creation time, kept so an orphaned
/// comment can still show what it referred to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRange {
    pub from: usize,
    pub to: usize,
    pub text: String,
}

impl AnchorRange {
    pub fn new(from: usize, to: usize, text: impl Into<String>) -> Self {
        debug_assert!(from <= to);
        Self {
            from,
            to,
            text: text.into(),
        }
    }
}

/// A reply inside a comment thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentReply {
    pub id: Uuid,
    pub comment_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A range-anchored comment on a document.
///
/// The anchor is rebased on every applied edit that overlaps or precedes
/// its range; it is never left pointing at a stale offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteComment {
    pub id: Uuid,
    pub document_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_email: String,
    pub content: String,
    pub position: AnchorRange,
    pub resolved: bool,
    #[serde(default)]
    pub replies: Vec<CommentReply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// VERSION HISTORY
// =============================================================================

/// One immutable entry in a document's version history.
///
/// Version numbers are contiguous per document starting at 1. Entries are
/// written by the sequencer's checkpoint policy, never by user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    /// Full content snapshot; diffs are derived on read.
    pub content: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Closed set of notification types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    CalendarReminder,
    CalendarEventCreated,
    CalendarEventUpdated,
    CalendarEventCancelled,
    NoteShared,
    NoteComment,
    NoteMention,
    WorkspaceInvite,
    WorkspaceJoined,
    SystemUpdate,
    SystemMaintenance,
    TaskAssigned,
    TaskCompleted,
    TaskDueSoon,
}

/// Notification priority; `Urgent` bypasses quiet hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Entity category a notification relates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelatedType {
    Event,
    Note,
    Workspace,
    Task,
}

/// A structured action button attached to a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationAction {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

/// A user-facing notification.
///
/// Content is immutable after creation; only the read/archived flags and
/// `read_at` transition afterwards. `scheduled_for` and `created_at`
/// serialize as ISO-8601.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_type: Option<RelatedType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
    pub is_read: bool,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
}

impl Notification {
    /// Create an unread, unarchived notification stamped now.
    pub fn new(
        user_id: Uuid,
        notification_type: NotificationType,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: NotificationPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            notification_type,
            title: title.into(),
            message: message.into(),
            priority,
            related_id: None,
            related_type: None,
            actions: Vec::new(),
            is_read: false,
            is_archived: false,
            created_at: Utc::now(),
            read_at: None,
            scheduled_for: None,
        }
    }

    /// Attach a related entity reference.
    pub fn with_related(mut self, related_id: impl Into<String>, related_type: RelatedType) -> Self {
        self.related_id = Some(related_id.into());
        self.related_type = Some(related_type);
        self
    }

    /// Hold the notification until the given time.
    pub fn scheduled_for(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(at);
        self
    }
}

/// Per-user delivery preferences consumed by the scheduler.
///
/// Quiet hours are wall-clock times and may wrap midnight
/// (e.g. 22:00 to 07:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub user_id: Uuid,
    pub email_enabled: bool,
    pub push_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_hours_start: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet_hours_end: Option<NaiveTime>,
}

impl NotificationPreferences {
    /// Preferences with no quiet hours configured.
    pub fn always_on(user_id: Uuid) -> Self {
        Self {
            user_id,
            email_enabled: true,
            push_enabled: true,
            quiet_hours_start: None,
            quiet_hours_end: None,
        }
    }

    /// Set the quiet hours window.
    pub fn with_quiet_hours(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.quiet_hours_start = Some(start);
        self.quiet_hours_end = Some(end);
        self
    }
}
