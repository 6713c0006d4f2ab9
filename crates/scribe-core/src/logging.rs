//! Structured logging schema and field name constants.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (session open/close), checkpoints |
//! | DEBUG | Decision points: transforms, rebases, scheduling choices |
//! | TRACE | Per-item iteration (individual anchors, queue scans) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "presence", "history", "notify"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "submit", "rebase", "join", "due_now"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Document UUID being operated on.
pub const DOCUMENT_ID: &str = "document_id";

/// User UUID for presence and notification events.
pub const USER_ID: &str = "user_id";

/// Client-generated op id (idempotency key).
pub const CLIENT_OP_ID: &str = "client_op_id";

/// Comment/selection anchor UUID.
pub const ANCHOR_ID: &str = "anchor_id";

/// Notification UUID.
pub const NOTIFICATION_ID: &str = "notification_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Applied sequence number.
pub const SEQUENCE: &str = "seq";

/// History version number.
pub const VERSION: &str = "version";

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Delivery attempt count for a notification.
pub const ATTEMPTS: &str = "attempts";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Initialize console tracing for tests and embedding binaries.
///
/// Honors `RUST_LOG`; defaults to `info` for the workspace crates. Safe to
/// call more than once; later calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scribe_core=info,scribe_engine=info,scribe_notify=info".into());

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing();
        init_tracing();
    }

    #[test]
    fn test_field_names_snake_case() {
        for field in [
            SUBSYSTEM,
            OPERATION,
            DOCUMENT_ID,
            USER_ID,
            CLIENT_OP_ID,
            ANCHOR_ID,
            NOTIFICATION_ID,
            SEQUENCE,
            VERSION,
            DURATION_MS,
            ATTEMPTS,
            ERROR_MSG,
        ] {
            assert!(field.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }
    }
}
