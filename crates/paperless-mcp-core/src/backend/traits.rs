//! Backend client trait definition

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use super::error::BackendResult;

/// A file part plus text fields for a multipart upload
#[derive(Debug, Clone, PartialEq)]
pub struct MultipartUpload {
    /// Plain form fields, repeated keys allowed
    pub fields: Vec<(String, String)>,
    /// Name of the file form field
    pub file_field: String,
    /// File name reported to the archive
    pub file_name: String,
    /// File content
    pub bytes: Vec<u8>,
    /// MIME type of the file part
    pub mime_type: String,
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Multipart(MultipartUpload),
}

/// One request against the archive API
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    /// Path relative to the base URL, e.g. `/api/tags/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl BackendRequest {
    /// Create a request without query or body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// Append a query parameter
    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append several query parameters
    pub fn with_query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    /// Set a JSON body
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a multipart body
    pub fn with_multipart(mut self, upload: MultipartUpload) -> Self {
        self.body = Some(RequestBody::Multipart(upload));
        self
    }

    /// First value of a query parameter
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// JSON body, if any
    pub fn json_body(&self) -> Option<&Value> {
        match &self.body {
            Some(RequestBody::Json(value)) => Some(value),
            _ => None,
        }
    }
}

/// Client for the document archive HTTP API
///
/// Implementations:
/// - `HttpBackendClient`: reqwest against a live archive
/// - `MockBackend`: In-memory archive for testing
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Send a request and return the parsed JSON body
    async fn request(&self, request: BackendRequest) -> BackendResult<Value>;
}
