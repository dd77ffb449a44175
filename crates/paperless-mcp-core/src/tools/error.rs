//! Tool error types

use serde_json::{Map, Value};
use thiserror::Error;

use crate::backend::BackendError;

/// Errors returned by tool calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Arguments rejected before any backend call
    #[error("{message}")]
    Validation {
        message: String,
        /// Accepted values, when the argument is an enumeration
        allowed: Option<Vec<String>>,
    },

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// File exists but could not be read
    #[error("{0}")]
    File(String),

    #[error("{operation} failed: {source}")]
    Backend {
        operation: &'static str,
        source: BackendError,
    },
}

impl ToolError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            allowed: None,
        }
    }

    pub fn validation_with_allowed(message: impl Into<String>, allowed: Vec<String>) -> Self {
        Self::Validation {
            message: message.into(),
            allowed: Some(allowed),
        }
    }

    /// Wrap a backend failure with the operation that hit it
    pub fn backend(operation: &'static str, source: BackendError) -> Self {
        Self::Backend { operation, source }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ToolError::Validation { .. })
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation { .. } => "invalid_request",
            ToolError::FileNotFound(_) => "file_not_found",
            ToolError::File(_) => "file_error",
            ToolError::Backend { source, .. } => source.kind(),
        }
    }

    /// `{error, status_code?, message, allowed?}` payload handed to callers
    pub fn to_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("error".to_string(), Value::from(self.kind()));
        match self {
            ToolError::Validation { message, allowed } => {
                payload.insert("message".to_string(), Value::from(message.clone()));
                if let Some(allowed) = allowed {
                    payload.insert("allowed".to_string(), Value::from(allowed.clone()));
                }
            }
            ToolError::FileNotFound(_) | ToolError::File(_) => {
                payload.insert("message".to_string(), Value::from(self.to_string()));
            }
            ToolError::Backend { source, .. } => {
                return backend_error_payload(source);
            }
        }
        Value::Object(payload)
    }
}

/// `{error, status_code?, message}` for a backend failure
pub fn backend_error_payload(error: &BackendError) -> Value {
    let mut payload = Map::new();
    payload.insert("error".to_string(), Value::from(error.kind()));
    if let Some(status) = error.status_code() {
        payload.insert("status_code".to_string(), Value::from(status));
    }
    payload.insert("message".to_string(), Value::from(error.message()));
    Value::Object(payload)
}

pub type ToolResult<T> = Result<T, ToolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_payload() {
        let err = ToolError::validation_with_allowed("Unknown lookup types: widgets", vec!["tags".into()]);
        assert!(err.is_validation());
        assert_eq!(
            err.to_payload(),
            json!({
                "error": "invalid_request",
                "message": "Unknown lookup types: widgets",
                "allowed": ["tags"]
            })
        );
    }

    #[test]
    fn test_backend_payload() {
        let err = ToolError::backend("get_document", BackendError::status(404, "missing"));
        assert_eq!(err.kind(), "paperless_http_error");
        assert_eq!(
            err.to_payload(),
            json!({"error": "paperless_http_error", "status_code": 404, "message": "missing"})
        );

        let timeout = ToolError::backend("search_documents", BackendError::Timeout("slow".into()));
        assert_eq!(
            timeout.to_payload(),
            json!({"error": "paperless_timeout", "message": "slow"})
        );
    }

    #[test]
    fn test_file_payload() {
        let err = ToolError::FileNotFound("/tmp/missing.pdf".into());
        assert_eq!(
            err.to_payload(),
            json!({"error": "file_not_found", "message": "File not found: /tmp/missing.pdf"})
        );
    }
}
