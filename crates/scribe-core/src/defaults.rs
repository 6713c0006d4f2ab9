//! Centralized default constants for the session engine.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// SEQUENCING / CHECKPOINTS
// =============================================================================

/// Number of applied edits that triggers a history checkpoint.
pub const CHECKPOINT_EDIT_COUNT: usize = 25;

/// Seconds since the last checkpoint after which the next edit triggers one
/// regardless of edit count. Keeps slow sessions from losing hours of work.
pub const CHECKPOINT_INTERVAL_SECS: u64 = 300;

/// Maximum history versions kept per document before oldest-eviction.
pub const MAX_HISTORY_VERSIONS: usize = 50;

// =============================================================================
// PRESENCE
// =============================================================================

/// Seconds of silence after which a session member is evicted and a
/// synthesized leave event is broadcast. Bounds memory for abandoned
/// connections.
pub const PRESENCE_TIMEOUT_SECS: u64 = 60;

/// Display colors assigned to users at join time, round-robin with a
/// random starting offset.
pub const USER_COLORS: &[&str] = &[
    "#f87171", "#fb923c", "#facc15", "#4ade80", "#2dd4bf", "#60a5fa", "#a78bfa", "#f472b6",
];

// =============================================================================
// EVENTS
// =============================================================================

/// Default event bus broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Maximum delivery attempts before a notification is marked failed.
pub const NOTIFY_MAX_RETRIES: u32 = 3;

/// Default delivery worker poll interval in milliseconds.
pub const NOTIFY_POLL_INTERVAL_MS: u64 = 500;

/// Maximum notifications returned per `due_now` poll; the rest surface
/// on the next poll.
pub const NOTIFY_PAGE_LIMIT: usize = 50;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_thresholds_positive() {
        const {
            assert!(CHECKPOINT_EDIT_COUNT > 0);
            assert!(CHECKPOINT_INTERVAL_SECS > 0);
            assert!(MAX_HISTORY_VERSIONS > 1);
        }
    }

    #[test]
    fn color_palette_is_hex() {
        assert!(!USER_COLORS.is_empty());
        for color in USER_COLORS {
            assert!(color.starts_with('#') && color.len() == 7, "bad color {color}");
        }
    }

    #[test]
    fn retry_cap_bounded() {
        const {
            assert!(NOTIFY_MAX_RETRIES >= 1);
            assert!(NOTIFY_MAX_RETRIES < 10);
        }
    }
}
