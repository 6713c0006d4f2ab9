//! Notification queue with scheduling, quiet hours, and bounded retries.
//!
//! The scheduler stores notifications and answers "what is deliverable
//! right now"; actual delivery is the worker's job. `due_now` never
//! mutates queue state, so a crashed worker can restart and re-poll
//! without losing anything (at-least-once delivery).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use scribe_core::{
    defaults, Error, EventBus, Notification, NotificationPreferences, Result, SessionEvent,
};

use crate::quiet_hours::deliverable_at;

/// Delivery lifecycle of a queued notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Delivered,
    Failed,
    Cancelled,
}

/// A notification plus its queue bookkeeping.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    pub notification: Notification,
    pub status: QueueStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// In-memory notification scheduler.
pub struct NotificationScheduler {
    entries: RwLock<HashMap<Uuid, QueuedNotification>>,
    preferences: RwLock<HashMap<Uuid, NotificationPreferences>>,
    events: Arc<EventBus>,
    max_retries: u32,
    page_limit: usize,
}

impl NotificationScheduler {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            preferences: RwLock::new(HashMap::new()),
            events,
            max_retries: defaults::NOTIFY_MAX_RETRIES,
            page_limit: defaults::NOTIFY_PAGE_LIMIT,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Register a user's delivery preferences, replacing any previous.
    pub async fn register_preferences(&self, preferences: NotificationPreferences) {
        let mut prefs = self.preferences.write().await;
        prefs.insert(preferences.user_id, preferences);
    }

    /// Queue a notification for delivery.
    pub async fn enqueue(&self, notification: Notification) {
        let id = notification.id;
        let user_id = notification.user_id;
        debug!(
            notification_id = %id,
            user_id = %user_id,
            notification_type = ?notification.notification_type,
            "notification queued"
        );
        let mut entries = self.entries.write().await;
        entries.insert(
            id,
            QueuedNotification {
                notification,
                status: QueueStatus::Pending,
                attempts: 0,
                last_error: None,
            },
        );
        drop(entries);
        self.events.emit(SessionEvent::NotificationQueued {
            notification_id: id,
            user_id,
        });
    }

    /// Pending notifications deliverable at `now`, oldest first, capped at
    /// one page. Excludes entries scheduled for later, deferred by quiet
    /// hours, cancelled, delivered, or retry-exhausted. Read-only and
    /// restartable.
    ///
    /// Quiet hours compare against `now`'s wall-clock time; callers are
    /// expected to pass the recipient-local now.
    pub async fn due_now(&self, now: DateTime<Utc>) -> Vec<Notification> {
        let entries = self.entries.read().await;
        let preferences = self.preferences.read().await;

        let mut due: Vec<&QueuedNotification> = entries
            .values()
            .filter(|e| e.status == QueueStatus::Pending)
            .filter(|e| match e.notification.scheduled_for {
                Some(at) => at <= now,
                None => true,
            })
            .filter(|e| {
                deliverable_at(
                    e.notification.priority,
                    now.time(),
                    preferences.get(&e.notification.user_id),
                )
            })
            .collect();

        due.sort_by_key(|e| e.notification.created_at);
        due.into_iter()
            .take(self.page_limit)
            .map(|e| e.notification.clone())
            .collect()
    }

    /// Cancel pending notifications that reference a superseded entity,
    /// returning how many were cancelled.
    pub async fn cancel_related(&self, related_id: &str) -> usize {
        let mut entries = self.entries.write().await;
        let mut cancelled = 0;
        for entry in entries.values_mut() {
            if entry.status == QueueStatus::Pending
                && entry.notification.related_id.as_deref() == Some(related_id)
            {
                entry.status = QueueStatus::Cancelled;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            info!(related_id, cancelled, "superseded notifications cancelled");
        }
        cancelled
    }

    /// Mark a notification delivered after channel acknowledgment.
    pub async fn mark_delivered(&self, id: Uuid) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown notification {id}")))?;
        entry.status = QueueStatus::Delivered;
        drop(entries);
        self.events
            .emit(SessionEvent::NotificationDelivered { notification_id: id });
        Ok(())
    }

    /// Record a delivery failure. The notification stays pending until the
    /// attempt count reaches the bounded maximum, then flips to failed.
    pub async fn record_failure(&self, id: Uuid, error: impl Into<String>) -> Result<()> {
        let error = error.into();
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown notification {id}")))?;
        entry.attempts += 1;
        entry.last_error = Some(error.clone());

        if entry.attempts >= self.max_retries {
            entry.status = QueueStatus::Failed;
            warn!(
                notification_id = %id,
                attempts = entry.attempts,
                error = %error,
                "notification failed permanently"
            );
            drop(entries);
            self.events.emit(SessionEvent::NotificationFailed {
                notification_id: id,
                error,
            });
        } else {
            debug!(
                notification_id = %id,
                attempts = entry.attempts,
                error = %error,
                "delivery attempt failed, will retry"
            );
        }
        Ok(())
    }

    /// Mark a stored notification read.
    pub async fn mark_read(&self, id: Uuid) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown notification {id}")))?;
        entry.notification.is_read = true;
        entry.notification.read_at = Some(Utc::now());
        Ok(())
    }

    /// Archive a stored notification.
    pub async fn archive(&self, id: Uuid) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| Error::InvalidInput(format!("unknown notification {id}")))?;
        entry.notification.is_archived = true;
        Ok(())
    }

    /// Retry-exhausted notifications, for inspection.
    pub async fn failed(&self) -> Vec<QueuedNotification> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|e| e.status == QueueStatus::Failed)
            .cloned()
            .collect()
    }

    /// A user's unarchived notifications, newest first.
    pub async fn for_user(&self, user_id: Uuid) -> Vec<Notification> {
        let entries = self.entries.read().await;
        let mut list: Vec<Notification> = entries
            .values()
            .filter(|e| e.notification.user_id == user_id && !e.notification.is_archived)
            .map(|e| e.notification.clone())
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        list
    }

    /// Queue bookkeeping for one notification.
    pub async fn get(&self, id: Uuid) -> Option<QueuedNotification> {
        let entries = self.entries.read().await;
        entries.get(&id).cloned()
    }
}
