//! Backend error types

use thiserror::Error;

/// Maximum number of body characters kept in a status error
pub const MAX_ERROR_BODY_CHARS: usize = 500;

/// Errors that can occur talking to the document archive
///
/// `Clone` because one fetch result is handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Could not reach the archive
    #[error("document archive unavailable: {0}")]
    Unavailable(String),

    /// Request exceeded the configured timeout
    #[error("document archive request timed out: {0}")]
    Timeout(String),

    /// Archive answered with a non-success status
    #[error("document archive returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Archive answered with a body we could not use
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from the given settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure inside this process (e.g. a fetch task panicked)
    #[error("internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Create a status error, truncating the body
    pub fn status(status: u16, body: impl AsRef<str>) -> Self {
        Self::Status {
            status,
            body: body.as_ref().chars().take(MAX_ERROR_BODY_CHARS).collect(),
        }
    }

    /// Create an invalid response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Map a transport error from reqwest
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }

    /// Stable machine-readable kind, used in tool error payloads
    pub fn kind(&self) -> &'static str {
        match self {
            BackendError::Unavailable(_) => "paperless_request_error",
            BackendError::Timeout(_) => "paperless_timeout",
            BackendError::Status { .. } => "paperless_http_error",
            BackendError::InvalidResponse(_) => "unexpected_response",
            BackendError::Configuration(_) => "config_error",
            BackendError::Internal(_) => "internal_error",
        }
    }

    /// HTTP status, when the archive answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> String {
        match self {
            BackendError::Unavailable(m)
            | BackendError::Timeout(m)
            | BackendError::InvalidResponse(m)
            | BackendError::Configuration(m)
            | BackendError::Internal(m) => m.clone(),
            BackendError::Status { body, .. } => body.clone(),
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_body_truncated() {
        let long = "x".repeat(2000);
        let err = BackendError::status(502, &long);
        assert_eq!(err.message().len(), MAX_ERROR_BODY_CHARS);
        assert_eq!(err.status_code(), Some(502));
        assert_eq!(err.kind(), "paperless_http_error");
    }

    #[test]
    fn test_kinds() {
        assert_eq!(BackendError::Timeout("t".into()).kind(), "paperless_timeout");
        assert_eq!(BackendError::Unavailable("u".into()).kind(), "paperless_request_error");
        assert_eq!(BackendError::invalid_response("bad").kind(), "unexpected_response");
        assert_eq!(BackendError::Timeout("t".into()).status_code(), None);
    }
}
