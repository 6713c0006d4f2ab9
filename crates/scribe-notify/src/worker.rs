//! Delivery worker polling the scheduler and pushing through a channel.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use scribe_core::{defaults, DeliveryChannel, DeliveryReceipt, Error, Result};

use crate::scheduler::NotificationScheduler;

/// Configuration for the delivery worker.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Polling interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Whether to enable delivery.
    pub enabled: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::NOTIFY_POLL_INTERVAL_MS,
            enabled: true,
        }
    }
}

impl DeliveryConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `NOTIFY_WORKER_ENABLED` | `true` | Enable/disable delivery |
    /// | `NOTIFY_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    pub fn from_env() -> Self {
        let enabled = std::env::var("NOTIFY_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("NOTIFY_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::NOTIFY_POLL_INTERVAL_MS);

        Self {
            poll_interval_ms,
            enabled,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable or disable delivery.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the delivery worker.
#[derive(Debug, Clone)]
pub enum DeliveryEvent {
    /// A notification was handed to the channel and acknowledged.
    Delivered { notification_id: Uuid },
    /// A delivery attempt failed; the scheduler decides on retry.
    AttemptFailed {
        notification_id: Uuid,
        error: String,
    },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<DeliveryEvent>,
}

impl WorkerHandle {
    /// Signal the worker to shut down gracefully.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.event_rx.resubscribe()
    }
}

/// Worker that drains due notifications through a [`DeliveryChannel`].
///
/// At-least-once: a notification is only marked delivered once the channel
/// acknowledges, so a crash between delivery and marking re-delivers on
/// restart.
pub struct DeliveryWorker {
    scheduler: Arc<NotificationScheduler>,
    channel: Arc<dyn DeliveryChannel>,
    config: DeliveryConfig,
    event_tx: broadcast::Sender<DeliveryEvent>,
}

impl DeliveryWorker {
    pub fn new(
        scheduler: Arc<NotificationScheduler>,
        channel: Arc<dyn DeliveryChannel>,
        config: DeliveryConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            scheduler,
            channel,
            config,
            event_tx,
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<DeliveryEvent> {
        self.event_tx.subscribe()
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
        }
    }

    /// Run the delivery loop. Only sleeps when nothing is due.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Delivery worker is disabled, not starting");
            return;
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "Delivery worker started"
        );
        let _ = self.event_tx.send(DeliveryEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Delivery worker received shutdown signal");
                break;
            }

            let due = self.scheduler.due_now(Utc::now()).await;
            if due.is_empty() {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Delivery worker received shutdown signal");
                        break;
                    }
                    _ = sleep(poll_interval) => {}
                }
                continue;
            }

            debug!(batch = due.len(), "Delivering due notifications");
            for notification in due {
                self.deliver_one(&notification).await;
            }
            // No sleep; immediately poll for more
        }

        let _ = self.event_tx.send(DeliveryEvent::WorkerStopped);
        info!("Delivery worker stopped");
    }

    async fn deliver_one(&self, notification: &scribe_core::Notification) {
        let start = Instant::now();
        let id = notification.id;

        let outcome = match self.channel.deliver(notification).await {
            Ok(DeliveryReceipt::Delivered) => Ok(()),
            Ok(DeliveryReceipt::Failed(e)) => Err(e),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => {
                if let Err(e) = self.scheduler.mark_delivered(id).await {
                    error!(notification_id = %id, error = %e, "Failed to mark delivered");
                } else {
                    info!(
                        notification_id = %id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Notification delivered"
                    );
                    let _ = self
                        .event_tx
                        .send(DeliveryEvent::Delivered { notification_id: id });
                }
            }
            Err(error) => {
                warn!(
                    notification_id = %id,
                    %error,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Delivery attempt failed"
                );
                if let Err(e) = self.scheduler.record_failure(id, error.clone()).await {
                    error!(notification_id = %id, error = %e, "Failed to record failure");
                }
                let _ = self.event_tx.send(DeliveryEvent::AttemptFailed {
                    notification_id: id,
                    error,
                });
            }
        }
    }
}
