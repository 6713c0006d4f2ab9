//! Error types for the Scribe collaborative session engine.

use thiserror::Error;

/// Result type alias using the session engine's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for collaborative session operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Edit or presence operation referenced a document with no open session.
    #[error("Unknown document: {0}")]
    UnknownDocument(uuid::Uuid),

    /// Edit coordinates are malformed with respect to the current text.
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    /// An edit's base sequence cannot be reconciled: either ahead of the
    /// server or older than the session log reaches back. Stale-but-covered
    /// bases are transformed forward instead and never produce this.
    #[error("Stale submission: base sequence {base} cannot be reconciled with current {current}")]
    StaleSubmission { base: u64, current: u64 },

    /// Presence operation referenced a user not in the session.
    #[error("Unknown user: {0}")]
    UnknownUser(uuid::Uuid),

    /// Notification delivery channel reported failure.
    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    /// Document or history store is unreachable; edits continue in memory.
    #[error("Persistence unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_unknown_document() {
        let id = Uuid::nil();
        let err = Error::UnknownDocument(id);
        assert_eq!(err.to_string(), format!("Unknown document: {}", id));
    }

    #[test]
    fn test_error_display_invalid_range() {
        let err = Error::InvalidRange("delete [4, 9) beyond length 5".to_string());
        assert_eq!(err.to_string(), "Invalid range: delete [4, 9) beyond length 5");
    }

    #[test]
    fn test_error_display_stale_submission() {
        let err = Error::StaleSubmission { base: 3, current: 7 };
        assert_eq!(
            err.to_string(),
            "Stale submission: base sequence 3 cannot be reconciled with current 7"
        );
    }

    #[test]
    fn test_error_display_unknown_user() {
        let id = Uuid::new_v4();
        let err = Error::UnknownUser(id);
        assert!(err.to_string().contains(&id.to_string()));
    }

    #[test]
    fn test_error_display_delivery_failed() {
        let err = Error::DeliveryFailed("push endpoint 503".to_string());
        assert_eq!(err.to_string(), "Delivery failed: push endpoint 503");
    }

    #[test]
    fn test_error_display_persistence_unavailable() {
        let err = Error::PersistenceUnavailable("store timeout".to_string());
        assert_eq!(err.to_string(), "Persistence unavailable: store timeout");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("empty comment body".to_string());
        assert_eq!(err.to_string(), "Invalid input: empty comment body");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("unexpected state".to_string());
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        match err {
            Error::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }

    #[test]
    fn test_result_type_ok() {
        fn get_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(get_result().unwrap(), 42);
    }
}
