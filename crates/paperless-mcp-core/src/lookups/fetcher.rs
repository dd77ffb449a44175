//! Paginated retrieval of one lookup category

use std::sync::Arc;

use serde_json::Value;

use crate::backend::{BackendClient, BackendError, BackendRequest, BackendResult};
use crate::log_debug;
use crate::logging::Logger;
use crate::types::{LookupCategory, LookupRecord};

/// Page size requested from the archive
pub const LOOKUP_PAGE_SIZE: u32 = 100;

/// Upper bound on pages followed for one category
pub const MAX_LOOKUP_PAGES: u32 = 1000;

/// Retrieves complete lookup lists from the archive
#[derive(Clone)]
pub struct LookupFetcher {
    backend: Arc<dyn BackendClient>,
    logger: Arc<dyn Logger>,
}

impl LookupFetcher {
    pub fn new(backend: Arc<dyn BackendClient>, logger: Arc<dyn Logger>) -> Self {
        Self { backend, logger }
    }

    /// Fetch every record of a category, following `next` until exhausted.
    ///
    /// Records keep the archive's listing order. No retries.
    pub async fn fetch(&self, category: LookupCategory) -> BackendResult<Vec<LookupRecord>> {
        let mut records = Vec::new();

        for page in 1..=MAX_LOOKUP_PAGES {
            let request = BackendRequest::get(category.endpoint())
                .with_query("page", page)
                .with_query("page_size", LOOKUP_PAGE_SIZE);
            let payload = self.backend.request(request).await?;

            let Value::Object(mut payload) = payload else {
                return Err(BackendError::invalid_response(format!(
                    "{} listing is not a JSON object",
                    category
                )));
            };
            let Some(Value::Array(results)) = payload.remove("results") else {
                return Err(BackendError::invalid_response(format!(
                    "{} listing has no results array",
                    category
                )));
            };

            records.extend(results.into_iter().filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            }));

            if !has_next(payload.get("next")) {
                log_debug!(self.logger, "fetched {} {} across {} page(s)", records.len(), category, page);
                return Ok(records);
            }
        }

        Err(BackendError::invalid_response(format!(
            "{} listing did not end after {} pages",
            category, MAX_LOOKUP_PAGES
        )))
    }
}

fn has_next(next: Option<&Value>) -> bool {
    match next {
        None | Some(Value::Null) => false,
        Some(Value::String(url)) => !url.trim().is_empty(),
        Some(_) => true,
    }
}
