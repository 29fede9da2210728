//! Error types for the confluence-markdown library.

use std::io;
use thiserror::Error;

/// Result type alias for confluence-markdown operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while indexing, converting or writing an export.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The export scope target (page, space) does not exist or is not accessible.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The retrieval collaborator gave up after exhausting its retries.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A path template references an unknown placeholder.
    #[error("Invalid path template `{template}`: unknown placeholder `{{{placeholder}}}`")]
    InvalidTemplate {
        /// The template as configured
        template: String,
        /// The offending placeholder name
        placeholder: String,
    },

    /// A configuration value is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A page URL could not be interpreted.
    #[error("Could not parse page URL: {0}")]
    InvalidUrl(String),

    /// Error during rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error aborts a whole export run rather than a single document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::InvalidTemplate { .. } | Error::Config(_)
        )
    }
}

/// Errors reported by a [`Source`](crate::source::Source).
///
/// Not-found is kept apart from transport failures: the first is a statement
/// about the content, the second about the connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The requested document, space or attachment does not exist.
    #[error("{kind} `{id}` not found")]
    NotFound {
        /// What was requested ("page", "space", "attachment")
        kind: &'static str,
        /// Identifier that was requested
        id: String,
    },

    /// The request failed after the collaborator's retry policy gave up.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl FetchError {
    /// Create a not-found error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        FetchError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

impl From<FetchError> for Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NotFound { .. } => Error::NotFound(err.to_string()),
            FetchError::Transport(msg) => Error::Transport(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("page `42` not found".to_string());
        assert_eq!(err.to_string(), "Not found: page `42` not found");

        let err = Error::InvalidTemplate {
            template: "{space}/{nope}.md".to_string(),
            placeholder: "nope".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid path template `{space}/{nope}.md`: unknown placeholder `{nope}`"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_fetch_error_conversion() {
        let err: Error = FetchError::not_found("space", "DOCS").into();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.is_fatal());

        let err: Error = FetchError::Transport("503".into()).into();
        assert!(matches!(err, Error::Transport(_)));
        assert!(!err.is_fatal());
    }
}
