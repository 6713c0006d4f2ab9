//! Notification scheduling and delivery for collaborative sessions.
//!
//! Notifications are queued by the session layer (comments, mentions,
//! shares, reminders), gated by per-user quiet hours, and drained by a
//! background worker through a pluggable [`scribe_core::DeliveryChannel`]
//! with at-least-once semantics and bounded retries.

pub mod mentions;
pub mod quiet_hours;
pub mod scheduler;
pub mod worker;

pub use mentions::{comment_notifications, extract_mentions};
pub use quiet_hours::{deliverable_at, in_window};
pub use scheduler::{NotificationScheduler, QueueStatus, QueuedNotification};
pub use worker::{DeliveryConfig, DeliveryEvent, DeliveryWorker, WorkerHandle};
