//! Quiet-hours gating for notification delivery.
//!
//! Pure functions of priority, wall-clock time, and per-user preferences.
//! `urgent` always goes through; everything else waits out the window.

use chrono::NaiveTime;

use scribe_core::{NotificationPreferences, NotificationPriority};

/// Whether `time` falls inside the `[start, end)` window. Windows may wrap
/// midnight (start 22:00, end 07:00). A degenerate window with
/// `start == end` is treated as no window at all.
pub fn in_window(time: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start == end {
        false
    } else if start < end {
        time >= start && time < end
    } else {
        // Wraps midnight
        time >= start || time < end
    }
}

/// Whether a notification with `priority` may be delivered to a user at
/// the given local wall-clock time. No preferences or no configured quiet
/// hours means always deliverable.
pub fn deliverable_at(
    priority: NotificationPriority,
    local_time: NaiveTime,
    preferences: Option<&NotificationPreferences>,
) -> bool {
    if priority == NotificationPriority::Urgent {
        return true;
    }
    let Some(prefs) = preferences else {
        return true;
    };
    match (prefs.quiet_hours_start, prefs.quiet_hours_end) {
        (Some(start), Some(end)) => !in_window(local_time, start, end),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn quiet(start: NaiveTime, end: NaiveTime) -> NotificationPreferences {
        NotificationPreferences::always_on(Uuid::new_v4()).with_quiet_hours(start, end)
    }

    #[test]
    fn test_window_same_day() {
        assert!(in_window(t(13, 0), t(12, 0), t(14, 0)));
        assert!(!in_window(t(11, 59), t(12, 0), t(14, 0)));
        // End is exclusive
        assert!(!in_window(t(14, 0), t(12, 0), t(14, 0)));
        assert!(in_window(t(12, 0), t(12, 0), t(14, 0)));
    }

    #[test]
    fn test_window_wraps_midnight() {
        let (start, end) = (t(22, 0), t(7, 0));
        assert!(in_window(t(23, 30), start, end));
        assert!(in_window(t(3, 0), start, end));
        assert!(!in_window(t(7, 0), start, end));
        assert!(!in_window(t(12, 0), start, end));
        assert!(in_window(t(22, 0), start, end));
    }

    #[test]
    fn test_degenerate_window() {
        assert!(!in_window(t(5, 0), t(5, 0), t(5, 0)));
    }

    #[test]
    fn test_urgent_bypasses_quiet_hours() {
        let prefs = quiet(t(22, 0), t(7, 0));
        assert!(deliverable_at(
            NotificationPriority::Urgent,
            t(2, 0),
            Some(&prefs)
        ));
    }

    #[test]
    fn test_medium_defers_in_quiet_hours() {
        let prefs = quiet(t(22, 0), t(7, 0));
        assert!(!deliverable_at(
            NotificationPriority::Medium,
            t(2, 0),
            Some(&prefs)
        ));
        assert!(deliverable_at(
            NotificationPriority::Medium,
            t(9, 0),
            Some(&prefs)
        ));
    }

    #[test]
    fn test_no_preferences_always_deliverable() {
        assert!(deliverable_at(NotificationPriority::Low, t(3, 0), None));
        let prefs = NotificationPreferences::always_on(Uuid::new_v4());
        assert!(deliverable_at(
            NotificationPriority::Low,
            t(3, 0),
            Some(&prefs)
        ));
    }
}
