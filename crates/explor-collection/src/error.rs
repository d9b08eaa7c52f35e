//! Error types for the collection client.
//!
//! [`CollectionError`] is `Clone` because one in-flight object request is
//! shared by every caller waiting on the same id, and each of them receives
//! the same outcome.

/// Errors that can occur while talking to the collection API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    /// The caller abandoned the operation through its cancellation token.
    ///
    /// Not a failure: callers should drop the result silently.
    #[error("request cancelled")]
    Cancelled,

    /// The API answered with a non-2xx status.
    #[error("Met API request failed with status {status}: {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path relative to the API base URL.
        path: String,
    },

    /// The request never produced a response (DNS, connect, reset, ...).
    #[error("Met API transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON.
    #[error("Met API response decode error: {0}")]
    Decode(String),
}

impl CollectionError {
    /// Whether this error represents cancellation rather than failure.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cancelled_reports_cancellation() {
        assert!(CollectionError::Cancelled.is_cancelled());
        assert!(
            !CollectionError::Status {
                status: 500,
                path: String::from("/objects/1"),
            }
            .is_cancelled()
        );
        assert!(!CollectionError::Transport(String::from("reset")).is_cancelled());
    }

    #[test]
    fn status_error_names_path() {
        let err = CollectionError::Status {
            status: 404,
            path: String::from("/objects/9"),
        };
        assert_eq!(
            err.to_string(),
            "Met API request failed with status 404: /objects/9"
        );
    }
}
