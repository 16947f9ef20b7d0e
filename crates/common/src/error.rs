//! Error types for payflow primitives

use thiserror::Error;

/// Result type alias using the payflow common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the polling primitive and its status sources
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The status query could not complete (transport failure, non-success
    /// response, malformed payload). Never retried by the poller.
    #[error("Status source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Invalid poll configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub fn source_unavailable(reason: impl Into<String>) -> Self {
        Error::SourceUnavailable(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::source_unavailable("status endpoint returned 502");
        assert_eq!(
            err.to_string(),
            "Status source unavailable: status endpoint returned 502"
        );
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
