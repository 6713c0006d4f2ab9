//! Session event types and event bus for real-time broadcast.
//!
//! Aggregates events from the edit sequencer, presence registry, history
//! store, and notification scheduler into a single broadcast channel.
//! Downstream consumers (WebSocket fan-out, telemetry) subscribe
//! independently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::CollaborativeUser;
use crate::protocol::{AnchorUpdate, PresenceMessage};

/// Unified session event, serialized as JSON with a `type` tag field, e.g.
/// `{"type":"EditApplied","document_id":"...","sequence":4}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// An edit was sequenced and applied to the authoritative text.
    EditApplied {
        document_id: Uuid,
        sequence: u64,
        author: Uuid,
    },
    /// An anchor was rebased (or invalidated) by an applied edit.
    AnchorUpdated {
        #[serde(flatten)]
        update: AnchorUpdate,
    },
    /// A user joined a document session.
    UserJoined {
        document_id: Uuid,
        user: CollaborativeUser,
    },
    /// A presence field changed (cursor, selection, typing, leave).
    PresenceChanged {
        #[serde(flatten)]
        message: PresenceMessage,
    },
    /// A checkpoint wrote a new history version.
    VersionCreated {
        document_id: Uuid,
        version: i32,
        author: Uuid,
        created_at: DateTime<Utc>,
    },
    /// A notification entered the scheduler queue.
    NotificationQueued {
        notification_id: Uuid,
        user_id: Uuid,
    },
    /// The delivery channel acknowledged a notification.
    NotificationDelivered { notification_id: Uuid },
    /// A notification exhausted its retries.
    NotificationFailed {
        notification_id: Uuid,
        error: String,
    },
}

impl SessionEvent {
    /// Returns the namespaced event type (e.g., `"edit.applied"`).
    pub fn event_type(&self) -> &'static str {
        match self {
            SessionEvent::EditApplied { .. } => "edit.applied",
            SessionEvent::AnchorUpdated { .. } => "anchor.updated",
            SessionEvent::UserJoined { .. } => "presence.joined",
            SessionEvent::PresenceChanged { .. } => "presence.changed",
            SessionEvent::VersionCreated { .. } => "version.created",
            SessionEvent::NotificationQueued { .. } => "notification.queued",
            SessionEvent::NotificationDelivered { .. } => "notification.delivered",
            SessionEvent::NotificationFailed { .. } => "notification.failed",
        }
    }

    /// Returns the primary entity ID this event relates to.
    pub fn entity_id(&self) -> Uuid {
        match self {
            SessionEvent::EditApplied { document_id, .. } => *document_id,
            SessionEvent::AnchorUpdated { update } => update.document_id,
            SessionEvent::UserJoined { document_id, .. } => *document_id,
            SessionEvent::PresenceChanged { message } => message.document_id(),
            SessionEvent::VersionCreated { document_id, .. } => *document_id,
            SessionEvent::NotificationQueued {
                notification_id, ..
            }
            | SessionEvent::NotificationDelivered { notification_id }
            | SessionEvent::NotificationFailed {
                notification_id, ..
            } => *notification_id,
        }
    }
}

/// Broadcast-based event bus for distributing session events.
///
/// Uses `tokio::sync::broadcast` with a configurable buffer. Slow receivers
/// that fall behind get a `Lagged` error and miss events; freshness matters
/// more than completeness for live collaboration streams.
pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    ///
    /// Recommended: [`crate::defaults::EVENT_BUS_CAPACITY`] for production,
    /// 32 for tests.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event to all subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn emit(&self, event: SessionEvent) {
        tracing::debug!(
            event_type = event.event_type(),
            entity_id = %event.entity_id(),
            subscriber_count = self.tx.receiver_count(),
            "session event"
        );
        let _ = self.tx.send(event);
    }

    /// Subscribe to receive events. Each subscriber gets its own stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_emit_subscribe() {
        let bus = EventBus::new(32);
        let mut rx = bus.subscribe();

        bus.emit(SessionEvent::EditApplied {
            document_id: Uuid::nil(),
            sequence: 1,
            author: Uuid::nil(),
        });

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::EditApplied { sequence: 1, .. }));
        assert_eq!(event.event_type(), "edit.applied");
    }

    #[tokio::test]
    async fn test_event_bus_multiple_subscribers() {
        let bus = EventBus::new(32);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(SessionEvent::NotificationDelivered {
            notification_id: Uuid::nil(),
        });

        assert!(matches!(
            rx1.recv().await.unwrap(),
            SessionEvent::NotificationDelivered { .. }
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            SessionEvent::NotificationDelivered { .. }
        ));
    }

    #[tokio::test]
    async fn test_event_bus_no_subscribers_ok() {
        let bus = EventBus::new(32);
        // Should not panic with no subscribers
        bus.emit(SessionEvent::NotificationQueued {
            notification_id: Uuid::nil(),
            user_id: Uuid::nil(),
        });
    }

    #[tokio::test]
    async fn test_event_bus_subscriber_count() {
        let bus = EventBus::new(32);
        assert_eq!(bus.subscriber_count(), 0);

        let _rx1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(_rx1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_session_event_json_serialization() {
        let event = SessionEvent::EditApplied {
            document_id: Uuid::nil(),
            sequence: 4,
            author: Uuid::nil(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"EditApplied"#));
        assert!(json.contains(r#""sequence":4"#));
    }

    #[test]
    fn test_anchor_updated_flattens() {
        let event = SessionEvent::AnchorUpdated {
            update: crate::protocol::AnchorUpdate {
                document_id: Uuid::nil(),
                anchor_id: Uuid::nil(),
                from: 2,
                to: 7,
                invalidated: true,
            },
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "AnchorUpdated");
        assert_eq!(parsed["from"], 2);
        assert_eq!(parsed["invalidated"], true);
    }

    #[test]
    fn test_event_type_names_exhaustive() {
        assert_eq!(
            SessionEvent::VersionCreated {
                document_id: Uuid::nil(),
                version: 1,
                author: Uuid::nil(),
                created_at: Utc::now(),
            }
            .event_type(),
            "version.created"
        );
        assert_eq!(
            SessionEvent::NotificationFailed {
                notification_id: Uuid::nil(),
                error: String::new(),
            }
            .event_type(),
            "notification.failed"
        );
        assert_eq!(
            SessionEvent::PresenceChanged {
                message: PresenceMessage::Leave {
                    document_id: Uuid::nil(),
                    user_id: Uuid::nil(),
                },
            }
            .event_type(),
            "presence.changed"
        );
    }

    #[test]
    fn test_entity_id() {
        let doc = Uuid::new_v4();
        let event = SessionEvent::EditApplied {
            document_id: doc,
            sequence: 0,
            author: Uuid::nil(),
        };
        assert_eq!(event.entity_id(), doc);
    }
}
