//! Mock backend for testing
//!
//! An in-memory archive: serves lookup lists with real pagination, echoes
//! created lookup entries back into its store, and records every request.
//! Failures and latency can be injected per route.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Method;
use serde_json::{json, Value};

use super::error::{BackendError, BackendResult};
use super::traits::{BackendClient, BackendRequest};
use crate::types::{LookupCategory, LookupRecord};

/// Page size used when a request does not ask for one
const DEFAULT_MOCK_PAGE_SIZE: usize = 25;

type RouteKey = (Method, String);

/// In-memory archive
pub struct MockBackend {
    lookups: Mutex<HashMap<LookupCategory, Vec<LookupRecord>>>,
    replies: Mutex<HashMap<RouteKey, Value>>,
    failures: Mutex<HashMap<RouteKey, BackendError>>,
    calls: Mutex<Vec<BackendRequest>>,
    delay: Option<Duration>,
    max_page_size: Option<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create an empty archive
    pub fn new() -> Self {
        Self {
            lookups: Mutex::new(HashMap::new()),
            replies: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            max_page_size: None,
        }
    }

    /// Delay every response (uses tokio's clock, so paused-time tests stay fast)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cap the page size regardless of what the client asks for
    pub fn with_max_page_size(mut self, size: usize) -> Self {
        self.max_page_size = Some(size.max(1));
        self
    }

    /// Replace the stored records of a category
    pub fn set_lookup(&self, category: LookupCategory, records: Vec<Value>) {
        let records = records
            .into_iter()
            .filter_map(|r| match r {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.lookups.lock().insert(category, records);
    }

    /// Fixed JSON reply for a route
    pub fn set_reply(&self, method: Method, path: impl Into<String>, reply: Value) {
        self.replies.lock().insert((method, path.into()), reply);
    }

    /// Make a route fail until cleared
    pub fn set_failure(&self, method: Method, path: impl Into<String>, error: BackendError) {
        self.failures.lock().insert((method, path.into()), error);
    }

    /// Stop failing a route
    pub fn clear_failure(&self, method: &Method, path: &str) {
        self.failures.lock().remove(&(method.clone(), path.to_string()));
    }

    /// Every request received so far
    pub fn calls(&self) -> Vec<BackendRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received for a route
    pub fn call_count(&self, method: &Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| &r.method == method && r.path == path)
            .count()
    }

    /// Number of list requests that started a fetch of a category (page 1)
    pub fn fetch_count(&self, category: LookupCategory) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| {
                r.method == Method::GET
                    && r.path == category.endpoint()
                    && r.query_value("page").unwrap_or("1") == "1"
            })
            .count()
    }

    /// Last request received for a route
    pub fn last_call(&self, method: &Method, path: &str) -> Option<BackendRequest> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|r| &r.method == method && r.path == path)
            .cloned()
    }

    fn list_page(&self, category: LookupCategory, request: &BackendRequest) -> BackendResult<Value> {
        let page: usize = request
            .query_value("page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
            .max(1);
        let mut page_size: usize = request
            .query_value("page_size")
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_MOCK_PAGE_SIZE)
            .max(1);
        if let Some(cap) = self.max_page_size {
            page_size = page_size.min(cap);
        }

        let lookups = self.lookups.lock();
        let records = lookups.get(&category).cloned().unwrap_or_default();
        let start = (page - 1) * page_size;
        if start > 0 && start >= records.len() {
            return Err(BackendError::status(404, r#"{"detail":"Invalid page."}"#));
        }
        let end = (start + page_size).min(records.len());
        let next = if end < records.len() {
            Value::String(format!("{}?page={}", category.endpoint(), page + 1))
        } else {
            Value::Null
        };

        Ok(json!({
            "count": records.len(),
            "next": next,
            "previous": Value::Null,
            "results": records[start..end].to_vec(),
        }))
    }

    fn create_lookup(&self, category: LookupCategory, request: &BackendRequest) -> BackendResult<Value> {
        let Some(Value::Object(body)) = request.json_body() else {
            return Err(BackendError::status(400, r#"{"detail":"JSON object expected."}"#));
        };
        let mut lookups = self.lookups.lock();
        let records = lookups.entry(category).or_default();
        let next_id = records
            .iter()
            .filter_map(|r| r.get("id").and_then(Value::as_i64))
            .max()
            .unwrap_or(0)
            + 1;
        let mut created = body.clone();
        created.insert("id".to_string(), Value::from(next_id));
        records.push(created.clone());
        Ok(Value::Object(created))
    }
}

#[async_trait]
impl BackendClient for MockBackend {
    async fn request(&self, request: BackendRequest) -> BackendResult<Value> {
        self.calls.lock().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let key = (request.method.clone(), request.path.clone());
        if let Some(error) = self.failures.lock().get(&key) {
            return Err(error.clone());
        }
        if let Some(reply) = self.replies.lock().get(&key) {
            return Ok(reply.clone());
        }

        match (LookupCategory::from_endpoint(&request.path), &request.method) {
            (Some(category), &Method::GET) => self.list_page(category, &request),
            (Some(category), &Method::POST) => self.create_lookup(category, &request),
            _ => Err(BackendError::status(404, r#"{"detail":"Not found."}"#)),
        }
    }
}
