//! Document archive backend
//!
//! This module provides the client abstraction the tools and the lookup
//! fetcher talk to, with a reqwest implementation and an in-memory mock.

mod error;
mod http;
mod mock;
mod traits;

pub use error::{BackendError, BackendResult, MAX_ERROR_BODY_CHARS};
pub use http::HttpBackendClient;
pub use mock::MockBackend;
pub use traits::{BackendClient, BackendRequest, MultipartUpload, RequestBody};
