//! Tool implementations
//!
//! Every tool validates its arguments before touching the archive. Lookup
//! reads go through the cache; lookup creation invalidates it.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use super::error::{backend_error_payload, ToolError, ToolResult};
use super::params::{
    CreateLookupParams, ListLookupsParams, ListLookupsResponse, SearchDocumentsParams,
    UpdateDocumentParams, UploadDocumentParams, MAX_SEARCH_PAGE_SIZE,
};
use crate::backend::{BackendClient, BackendError, BackendRequest, MultipartUpload};
use crate::logging::Logger;
use crate::lookups::{normalize_fields, project, LookupCache};
use crate::types::{
    metadata_form_fields, normalize_matching_algorithm, scalar_to_string, DocumentSummary,
    LookupCategory, SearchPage, MATCHING_ALGORITHM_AUTO,
};
use crate::{log_debug, log_error, log_info};

const DOCUMENTS_ENDPOINT: &str = "/api/documents/";
const UPLOAD_ENDPOINT: &str = "/api/documents/post_document/";

/// Multipart field carrying the uploaded file
pub const UPLOAD_FILE_FIELD: &str = "document";
const UPLOAD_MIME_TYPE: &str = "application/octet-stream";

/// Routes tool calls to the archive and the lookup cache
#[derive(Clone)]
pub struct ToolDispatcher {
    backend: Arc<dyn BackendClient>,
    cache: LookupCache,
    logger: Arc<dyn Logger>,
}

impl ToolDispatcher {
    pub fn new(backend: Arc<dyn BackendClient>, cache: LookupCache, logger: Arc<dyn Logger>) -> Self {
        Self {
            backend,
            cache,
            logger,
        }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    /// Liveness probe; never touches the archive
    pub fn healthcheck(&self) -> &'static str {
        log_info!(self.logger, "healthcheck started");
        log_info!(self.logger, "healthcheck completed");
        "ok"
    }

    /// Search documents by full-text query and filters
    pub async fn search_documents(&self, params: SearchDocumentsParams) -> ToolResult<SearchPage> {
        let query = search_query(&params)?;
        log_info!(self.logger, "search_documents started");
        log_debug!(self.logger, "search_documents params={:?}", query);

        let request = BackendRequest::get(DOCUMENTS_ENDPOINT).with_query_pairs(query);
        let payload = self.call("search_documents", request).await?;

        let Value::Object(mut payload) = payload else {
            return Err(self.unexpected("search_documents", "archive returned non-object JSON"));
        };
        let Some(Value::Array(results)) = payload.remove("results") else {
            return Err(self.unexpected("search_documents", "archive response missing results list"));
        };

        let count = payload
            .remove("count")
            .unwrap_or_else(|| Value::from(results.len()));
        let page = SearchPage {
            count,
            next: payload.remove("next").unwrap_or(Value::Null),
            previous: payload.remove("previous").unwrap_or(Value::Null),
            results: results
                .iter()
                .filter_map(Value::as_object)
                .map(DocumentSummary::from_record)
                .collect(),
        };
        log_info!(
            self.logger,
            "search_documents completed total={} returned={}",
            page.count,
            page.results.len()
        );
        Ok(page)
    }

    /// Fetch one document by id
    pub async fn get_document(&self, document_id: i64) -> ToolResult<Value> {
        let document_id = positive_id(document_id)?;
        log_info!(self.logger, "get_document started id={}", document_id);

        let request = BackendRequest::get(document_path(document_id));
        let document = self.call("get_document", request).await?;
        let document = self.expect_object("get_document", document)?;

        log_info!(self.logger, "get_document completed id={}", document_id);
        Ok(document)
    }

    /// Upload a file from the local disk.
    ///
    /// The archive acknowledges with a bare task id string; it is returned
    /// as `{"task_id": ...}`.
    pub async fn upload_document(&self, params: UploadDocumentParams) -> ToolResult<Value> {
        let file_path = params.file_path.trim();
        if file_path.is_empty() {
            return Err(ToolError::validation("file_path is required."));
        }
        let path = Path::new(file_path);
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(ToolError::FileNotFound(file_path.to_string())),
        }

        let upload_name = params
            .filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| file_path.to_string());
        let fields = params
            .metadata
            .as_ref()
            .map(metadata_form_fields)
            .unwrap_or_default();

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            log_error!(self.logger, "failed to read {}: {}", file_path, e);
            ToolError::File(format!("failed to read {}: {}", file_path, e))
        })?;

        log_info!(self.logger, "upload_document started filename={}", upload_name);
        let request = BackendRequest::post(UPLOAD_ENDPOINT).with_multipart(MultipartUpload {
            fields,
            file_field: UPLOAD_FILE_FIELD.to_string(),
            file_name: upload_name,
            bytes,
            mime_type: UPLOAD_MIME_TYPE.to_string(),
        });
        let acknowledgement = match self.call("upload_document", request).await? {
            Value::String(task_id) => json!({ "task_id": task_id }),
            other => self.expect_object("upload_document", other)?,
        };

        log_info!(self.logger, "upload_document completed");
        Ok(acknowledgement)
    }

    /// Patch the given fields of a document
    pub async fn update_document(&self, params: UpdateDocumentParams) -> ToolResult<Value> {
        let document_id = positive_id(params.document_id)?;
        if params.updates.is_empty() {
            return Err(ToolError::validation("updates must be a non-empty object."));
        }
        log_info!(self.logger, "update_document started id={}", document_id);
        log_debug!(self.logger, "update_document payload={:?}", params.updates);

        let request = BackendRequest::patch(document_path(document_id))
            .with_json(Value::Object(params.updates));
        let document = self.call("update_document", request).await?;
        let document = self.expect_object("update_document", document)?;

        log_info!(self.logger, "update_document completed id={}", document_id);
        Ok(document)
    }

    /// Create a lookup entry, then invalidate its category in the cache
    pub async fn create_lookup(&self, params: CreateLookupParams) -> ToolResult<Value> {
        let category = resolve_lookup_type(&params.lookup_type)?;
        let payload = lookup_payload(category, params)?;
        log_info!(self.logger, "create_lookup started type={}", category);
        log_debug!(self.logger, "create_lookup payload={:?}", payload);

        let request = BackendRequest::post(category.endpoint()).with_json(Value::Object(payload));
        let created = self.call("create_lookup", request).await?;

        self.cache.invalidate(category);
        log_info!(self.logger, "create_lookup completed type={}", category);
        Ok(created)
    }

    /// List lookup entries from the cache.
    ///
    /// Failures are reported per category. When only one category was asked
    /// for, its failure fails the call.
    pub async fn list_lookups(&self, params: ListLookupsParams) -> ToolResult<ListLookupsResponse> {
        let categories = resolve_include(params.include.as_deref())?;
        let fields = normalize_fields(params.fields.as_deref());
        log_info!(
            self.logger,
            "list_lookups started include={:?} refresh={}",
            categories.iter().map(|c| c.plural()).collect::<Vec<_>>(),
            params.refresh
        );

        let mut results = self.cache.get(categories.iter().copied(), params.refresh).await;
        if categories.len() == 1 {
            if let Some(Err(e)) = results.values().next() {
                log_error!(self.logger, "list_lookups failed for {}: {}", e.category, e.source);
                return Err(ToolError::backend("list_lookups", e.source.clone()));
            }
        }

        let mut response = ListLookupsResponse::default();
        for category in categories {
            let Some(result) = results.remove(&category) else {
                continue;
            };
            let name = category.plural().to_string();
            match result {
                Ok(lookup) => {
                    log_info!(
                        self.logger,
                        "list_lookups {} cache_hit={} count={}",
                        name,
                        lookup.served_from_cache,
                        lookup.records.len()
                    );
                    response.counts.insert(name.clone(), lookup.records.len());
                    response
                        .lookups
                        .insert(name, project(&lookup.records, fields.as_deref()));
                }
                Err(e) => {
                    log_error!(self.logger, "list_lookups failed for {}: {}", name, e.source);
                    response.errors.insert(name, backend_error_payload(&e.source));
                }
            }
        }
        log_info!(
            self.logger,
            "list_lookups completed lists={} errors={}",
            response.lookups.len(),
            response.errors.len()
        );
        Ok(response)
    }

    async fn call(&self, operation: &'static str, request: BackendRequest) -> ToolResult<Value> {
        self.backend.request(request).await.map_err(|e| {
            log_error!(self.logger, "{} failed: {}", operation, e);
            ToolError::backend(operation, e)
        })
    }

    fn expect_object(&self, operation: &'static str, value: Value) -> ToolResult<Value> {
        if value.is_object() {
            Ok(value)
        } else {
            Err(self.unexpected(operation, "archive returned non-object JSON"))
        }
    }

    fn unexpected(&self, operation: &'static str, message: &str) -> ToolError {
        log_error!(self.logger, "{}: {}", operation, message);
        ToolError::backend(operation, BackendError::invalid_response(message))
    }
}

fn document_path(document_id: i64) -> String {
    format!("{}{}/", DOCUMENTS_ENDPOINT, document_id)
}

fn positive_id(document_id: i64) -> ToolResult<i64> {
    if document_id <= 0 {
        return Err(ToolError::validation("document_id must be positive."));
    }
    Ok(document_id)
}

/// Query pairs for a document search
fn search_query(params: &SearchDocumentsParams) -> ToolResult<Vec<(String, String)>> {
    if params.page < 1 {
        return Err(ToolError::validation("page must be 1 or greater."));
    }
    if params.page_size < 1 || params.page_size > MAX_SEARCH_PAGE_SIZE {
        return Err(ToolError::validation(format!(
            "page_size must be between 1 and {}.",
            MAX_SEARCH_PAGE_SIZE
        )));
    }

    let mut query = vec![
        ("page".to_string(), params.page.to_string()),
        ("page_size".to_string(), params.page_size.to_string()),
    ];
    let mut push = |key: &str, value: String| query.push((key.to_string(), value));

    if let Some(text) = trimmed(params.query.as_deref()) {
        push("query", text);
    }
    if let Some(id) = params.tag_id {
        push("tags__id", id.to_string());
    }
    if let Some(id) = params.correspondent_id {
        push("correspondent__id", id.to_string());
    }
    if let Some(id) = params.document_type_id {
        push("document_type__id", id.to_string());
    }
    if let Some(date) = trimmed(params.created_from.as_deref()) {
        push("created__date__gte", date);
    }
    if let Some(date) = trimmed(params.created_to.as_deref()) {
        push("created__date__lte", date);
    }

    for (key, value) in params.custom_filters.iter().flatten() {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        match value {
            Value::Null => {}
            Value::String(s) => {
                if let Some(s) = trimmed(Some(s.as_str())) {
                    push(key, s);
                }
            }
            // Lists repeat the key once per item
            Value::Array(items) => {
                for item in items.iter().filter(|item| !item.is_null()) {
                    push(key, scalar_to_string(item));
                }
            }
            other => push(key, scalar_to_string(other)),
        }
    }
    Ok(query)
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn resolve_lookup_type(lookup_type: &str) -> ToolResult<LookupCategory> {
    if lookup_type.trim().is_empty() {
        return Err(ToolError::validation_with_allowed(
            "lookup_type is required.",
            LookupCategory::allowed_names(),
        ));
    }
    lookup_type.parse::<LookupCategory>().map_err(|e| {
        ToolError::validation_with_allowed(e.to_string(), LookupCategory::allowed_names())
    })
}

/// Body of a create request, with overrides and matching defaults applied
fn lookup_payload(category: LookupCategory, params: CreateLookupParams) -> ToolResult<Map<String, Value>> {
    if params.data.is_empty() {
        return Err(ToolError::validation("data must be a non-empty object."));
    }
    let mut payload = params.data;

    if let Some(parent_id) = params.parent_id {
        if category != LookupCategory::Tag {
            return Err(ToolError::validation("parent_id is only supported for tags."));
        }
        payload.insert("parent".to_string(), Value::from(parent_id));
    }
    if let Some(pattern) = params.match_pattern {
        payload.insert("match".to_string(), Value::from(pattern));
    }
    if let Some(algorithm) = params.matching_algorithm.filter(|a| !a.is_null()) {
        payload.insert("matching_algorithm".to_string(), algorithm);
    }
    if let Some(permissions) = params.permissions {
        payload.insert("permissions".to_string(), Value::from(permissions));
    }

    match payload.remove("matching_algorithm") {
        Some(Value::Null) | None => {}
        Some(algorithm) => {
            payload.insert(
                "matching_algorithm".to_string(),
                normalize_matching_algorithm(&algorithm),
            );
        }
    }
    if params.auto_match && category.supports_matching() && !payload.contains_key("matching_algorithm") {
        payload.insert(
            "matching_algorithm".to_string(),
            Value::from(MATCHING_ALGORITHM_AUTO),
        );
    }
    Ok(payload)
}

/// Categories named in `include`; all of them when absent or blank
fn resolve_include(include: Option<&[String]>) -> ToolResult<BTreeSet<LookupCategory>> {
    let names: BTreeSet<&str> = include
        .unwrap_or_default()
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(LookupCategory::ALL.into_iter().collect());
    }

    let mut categories = BTreeSet::new();
    let mut unknown = Vec::new();
    for name in names {
        match LookupCategory::from_alias(name) {
            Some(category) => {
                categories.insert(category);
            }
            None => unknown.push(name),
        }
    }
    if !unknown.is_empty() {
        return Err(ToolError::validation_with_allowed(
            format!("Unknown lookup types: {}", unknown.join(", ")),
            LookupCategory::allowed_names(),
        ));
    }
    Ok(categories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockBackend, RequestBody};
    use crate::logging::{Level, MemoryLogger, NoOpLogger};
    use crate::lookups::{CacheConfig, LookupFetcher};
    use reqwest::Method;
    use serde_json::json;
    use std::io::Write;
    use std::time::Duration;

    fn setup() -> (Arc<MockBackend>, ToolDispatcher) {
        let backend = Arc::new(MockBackend::new());
        backend.set_lookup(
            LookupCategory::Tag,
            vec![json!({"id": 1, "name": "Inbox", "matching_algorithm": 6})],
        );
        backend.set_lookup(LookupCategory::Correspondent, vec![json!({"id": 3, "name": "ACME"})]);

        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let fetcher = LookupFetcher::new(backend.clone(), logger.clone());
        let cache = LookupCache::new(fetcher, CacheConfig::from_secs(300), logger.clone());
        (backend.clone(), ToolDispatcher::new(backend, cache, logger))
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_healthcheck() {
        let (backend, dispatcher) = setup();
        assert_eq!(dispatcher.healthcheck(), "ok");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tools_log_started_and_completed() {
        let backend = Arc::new(MockBackend::new());
        backend.set_lookup(LookupCategory::Tag, vec![json!({"id": 1, "name": "Inbox"})]);
        let logger = Arc::new(MemoryLogger::new());
        let fetcher = LookupFetcher::new(backend.clone(), Arc::new(NoOpLogger::new()));
        let cache = LookupCache::new(fetcher, CacheConfig::from_secs(300), Arc::new(NoOpLogger::new()));
        let dispatcher = ToolDispatcher::new(backend, cache, logger.clone());

        dispatcher.healthcheck();
        dispatcher
            .list_lookups(ListLookupsParams {
                include: Some(vec!["tags".into()]),
                ..Default::default()
            })
            .await
            .unwrap();

        let info = logger.messages(Level::Info);
        assert_eq!(info.first().map(String::as_str), Some("healthcheck started"));
        assert_eq!(info.get(1).map(String::as_str), Some("healthcheck completed"));
        assert!(info
            .iter()
            .any(|line| line == r#"list_lookups started include=["tags"] refresh=false"#));
        assert_eq!(
            info.last().map(String::as_str),
            Some("list_lookups completed lists=1 errors=0")
        );
    }

    #[tokio::test]
    async fn test_search_page_size_cap() {
        let (backend, dispatcher) = setup();
        backend.set_reply(Method::GET, DOCUMENTS_ENDPOINT, json!({"count": 0, "results": []}));

        let err = dispatcher
            .search_documents(SearchDocumentsParams {
                page_size: 500,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(backend.calls().is_empty());

        let page = dispatcher
            .search_documents(SearchDocumentsParams {
                page_size: 100,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.count, json!(0));
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_bad_page() {
        let (_, dispatcher) = setup();
        for params in [
            SearchDocumentsParams { page: 0, ..Default::default() },
            SearchDocumentsParams { page_size: 0, ..Default::default() },
        ] {
            assert!(dispatcher.search_documents(params).await.unwrap_err().is_validation());
        }
    }

    #[tokio::test]
    async fn test_search_builds_query_and_compacts_results() {
        let (backend, dispatcher) = setup();
        backend.set_reply(
            Method::GET,
            DOCUMENTS_ENDPOINT,
            json!({
                "next": null,
                "results": [
                    {"id": 9, "title": "Bill", "content": "full text", "tags": [1]},
                    "junk"
                ]
            }),
        );

        let mut filters = Map::new();
        filters.insert("storage_path__id".into(), json!(2));
        filters.insert("title__icontains".into(), json!("  "));
        filters.insert(" ".into(), json!("x"));
        filters.insert("owner__id".into(), Value::Null);
        filters.insert("tags__id__all".into(), json!([1, null, 2]));
        let page = dispatcher
            .search_documents(SearchDocumentsParams {
                query: Some("  invoice ".into()),
                tag_id: Some(4),
                created_from: Some("2024-01-01".into()),
                created_to: Some(" ".into()),
                custom_filters: Some(filters),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.count, json!(2));
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].title, json!("Bill"));

        let call = backend.last_call(&Method::GET, DOCUMENTS_ENDPOINT).unwrap();
        assert_eq!(call.query_value("query"), Some("invoice"));
        assert_eq!(call.query_value("page"), Some("1"));
        assert_eq!(call.query_value("page_size"), Some("25"));
        assert_eq!(call.query_value("tags__id"), Some("4"));
        assert_eq!(call.query_value("created__date__gte"), Some("2024-01-01"));
        assert_eq!(call.query_value("created__date__lte"), None);
        assert_eq!(call.query_value("storage_path__id"), Some("2"));
        assert_eq!(call.query_value("title__icontains"), None);
        assert_eq!(call.query_value("owner__id"), None);
        let all_tags: Vec<&str> = call
            .query
            .iter()
            .filter(|(key, _)| key == "tags__id__all")
            .map(|(_, value)| value.as_str())
            .collect();
        assert_eq!(all_tags, vec!["1", "2"]);
        assert_eq!(call.query.len(), 8);
    }

    #[tokio::test]
    async fn test_search_without_results_is_unexpected() {
        let (backend, dispatcher) = setup();
        backend.set_reply(Method::GET, DOCUMENTS_ENDPOINT, json!({"detail": "?"}));

        let err = dispatcher
            .search_documents(SearchDocumentsParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "unexpected_response");
    }

    #[tokio::test]
    async fn test_get_document() {
        let (backend, dispatcher) = setup();
        backend.set_reply(Method::GET, "/api/documents/7/", json!({"id": 7, "title": "Lease"}));

        assert_eq!(dispatcher.get_document(7).await.unwrap()["title"], json!("Lease"));
        assert!(dispatcher.get_document(0).await.unwrap_err().is_validation());

        let missing = dispatcher.get_document(8).await.unwrap_err();
        assert_eq!(missing.to_payload()["status_code"], json!(404));
    }

    #[tokio::test]
    async fn test_update_document_sends_only_given_fields() {
        let (backend, dispatcher) = setup();
        backend.set_reply(Method::PATCH, "/api/documents/5/", json!({"id": 5, "title": "New"}));

        let updated = dispatcher
            .update_document(UpdateDocumentParams {
                document_id: 5,
                updates: object(json!({"title": "New", "correspondent": null})),
            })
            .await
            .unwrap();
        assert_eq!(updated["title"], json!("New"));

        let call = backend.last_call(&Method::PATCH, "/api/documents/5/").unwrap();
        assert_eq!(call.json_body(), Some(&json!({"title": "New", "correspondent": null})));

        let err = dispatcher
            .update_document(UpdateDocumentParams {
                document_id: 5,
                updates: Map::new(),
            })
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_upload_document() {
        let (backend, dispatcher) = setup();
        backend.set_reply(Method::POST, UPLOAD_ENDPOINT, json!({"task_id": "abc"}));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.7").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let ack = dispatcher
            .upload_document(UploadDocumentParams {
                file_path: format!(" {} ", path),
                metadata: Some(object(json!({"title": "Scan", "tags": [1, 2]}))),
                filename: Some("scan.pdf".into()),
            })
            .await
            .unwrap();
        assert_eq!(ack["task_id"], json!("abc"));

        let call = backend.last_call(&Method::POST, UPLOAD_ENDPOINT).unwrap();
        let Some(RequestBody::Multipart(upload)) = call.body else {
            panic!("expected multipart body");
        };
        assert_eq!(upload.file_field, "document");
        assert_eq!(upload.file_name, "scan.pdf");
        assert_eq!(upload.mime_type, "application/octet-stream");
        assert_eq!(upload.bytes, b"%PDF-1.7".to_vec());
        let mut fields = upload.fields.clone();
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("tags".to_string(), "1".to_string()),
                ("tags".to_string(), "2".to_string()),
                ("title".to_string(), "Scan".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_skips_backend() {
        let (backend, dispatcher) = setup();

        let err = dispatcher
            .upload_document(UploadDocumentParams {
                file_path: "/definitely/not/here.pdf".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "file_not_found");

        let blank = dispatcher
            .upload_document(UploadDocumentParams::default())
            .await
            .unwrap_err();
        assert!(blank.is_validation());
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_lookup_payload() {
        let (backend, dispatcher) = setup();

        let mut params = CreateLookupParams::new("tag", object(json!({"name": "Invoices"})));
        params.parent_id = Some(1);
        params.match_pattern = Some("invoice".into());
        let created = dispatcher.create_lookup(params).await.unwrap();
        assert_eq!(created["id"], json!(2));

        let call = backend.last_call(&Method::POST, "/api/tags/").unwrap();
        assert_eq!(
            call.json_body(),
            Some(&json!({"name": "Invoices", "parent": 1, "match": "invoice", "matching_algorithm": 6}))
        );

        let mut params = CreateLookupParams::new("correspondents", object(json!({"name": "Bank"})));
        params.matching_algorithm = Some(json!("regex"));
        dispatcher.create_lookup(params).await.unwrap();
        let call = backend.last_call(&Method::POST, "/api/correspondents/").unwrap();
        assert_eq!(call.json_body().unwrap()["matching_algorithm"], json!(4));

        let params = CreateLookupParams::new(
            "custom_field",
            object(json!({"name": "Amount", "data_type": "monetary"})),
        );
        dispatcher.create_lookup(params).await.unwrap();
        let call = backend.last_call(&Method::POST, "/api/custom_fields/").unwrap();
        assert!(call.json_body().unwrap().get("matching_algorithm").is_none());

        let mut params = CreateLookupParams::new("document_type", object(json!({"name": "Receipt", "matching_algorithm": null})));
        params.auto_match = false;
        dispatcher.create_lookup(params).await.unwrap();
        let call = backend.last_call(&Method::POST, "/api/document_types/").unwrap();
        assert_eq!(call.json_body(), Some(&json!({"name": "Receipt"})));
    }

    #[tokio::test]
    async fn test_create_lookup_validation() {
        let (backend, dispatcher) = setup();

        let err = dispatcher
            .create_lookup(CreateLookupParams::new("widgets", object(json!({"name": "x"}))))
            .await
            .unwrap_err();
        assert_eq!(err.to_payload()["allowed"].as_array().unwrap().len(), 5);

        let err = dispatcher
            .create_lookup(CreateLookupParams::new("tags", Map::new()))
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let mut params = CreateLookupParams::new("correspondent", object(json!({"name": "x"})));
        params.parent_id = Some(3);
        assert!(dispatcher.create_lookup(params).await.unwrap_err().is_validation());

        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_reflects_new_entry() {
        let (backend, dispatcher) = setup();
        let include = ListLookupsParams {
            include: Some(vec!["tags".into()]),
            ..Default::default()
        };

        let before = dispatcher.list_lookups(include.clone()).await.unwrap();
        assert_eq!(before.counts["tags"], 1);

        dispatcher
            .create_lookup(CreateLookupParams::new("tags", object(json!({"name": "Invoices"}))))
            .await
            .unwrap();

        let after = dispatcher.list_lookups(include).await.unwrap();
        assert_eq!(after.counts["tags"], 2);
        assert_eq!(backend.fetch_count(LookupCategory::Tag), 2);
    }

    #[tokio::test]
    async fn test_failed_create_keeps_cache() {
        let (backend, dispatcher) = setup();
        dispatcher.list_lookups(ListLookupsParams::default()).await.unwrap();
        backend.set_failure(Method::POST, "/api/tags/", BackendError::status(400, "duplicate"));

        let err = dispatcher
            .create_lookup(CreateLookupParams::new("tag", object(json!({"name": "Inbox"}))))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "paperless_http_error");
        assert!(dispatcher.cache().cached_at(LookupCategory::Tag).is_some());
    }

    #[tokio::test]
    async fn test_list_lookups_partial_failure() {
        let (backend, dispatcher) = setup();
        backend.set_failure(
            Method::GET,
            "/api/correspondents/",
            BackendError::Timeout("slow".into()),
        );

        let response = dispatcher
            .list_lookups(ListLookupsParams {
                include: Some(vec!["tags".into(), "correspondents".into()]),
                fields: Some(vec!["id".into(), " ".into()]),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(response.lookups["tags"], vec![object(json!({"id": 1}))]);
        assert!(!response.lookups.contains_key("correspondents"));
        assert!(!response.counts.contains_key("correspondents"));
        assert_eq!(
            response.errors["correspondents"],
            json!({"error": "paperless_timeout", "message": "slow"})
        );
        assert!(dispatcher.cache().cached_at(LookupCategory::Tag).is_some());
        assert!(dispatcher.cache().cached_at(LookupCategory::Correspondent).is_none());
    }

    #[tokio::test]
    async fn test_list_lookups_single_category_failure_fails_call() {
        let (backend, dispatcher) = setup();
        backend.set_failure(Method::GET, "/api/tags/", BackendError::status(503, "down"));

        let err = dispatcher
            .list_lookups(ListLookupsParams {
                include: Some(vec!["tag".into()]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_payload()["status_code"], json!(503));
    }

    #[tokio::test]
    async fn test_list_lookups_defaults_and_validation() {
        let (backend, dispatcher) = setup();

        let response = dispatcher
            .list_lookups(ListLookupsParams {
                include: Some(vec!["  ".into()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(response.counts.len(), 5);
        assert!(response.errors.is_empty());
        assert_eq!(response.lookups["document_types"], Vec::<Map<String, Value>>::new());

        let err = dispatcher
            .list_lookups(ListLookupsParams {
                include: Some(vec!["tags".into(), "widgets".into(), "gadgets".into()]),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown lookup types: gadgets, widgets"
        );
        assert_eq!(backend.calls().len(), 5);
    }

    #[tokio::test]
    async fn test_list_lookups_refresh_bypasses_cache() {
        let (backend, dispatcher) = setup();
        let params = ListLookupsParams {
            include: Some(vec!["correspondents".into()]),
            ..Default::default()
        };

        dispatcher.list_lookups(params.clone()).await.unwrap();
        dispatcher.list_lookups(params.clone()).await.unwrap();
        assert_eq!(backend.fetch_count(LookupCategory::Correspondent), 1);

        dispatcher
            .list_lookups(ListLookupsParams { refresh: true, ..params })
            .await
            .unwrap();
        assert_eq!(backend.fetch_count(LookupCategory::Correspondent), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_list_lookups_share_fetches() {
        let backend = Arc::new(MockBackend::new().with_delay(Duration::from_millis(20)));
        let logger: Arc<dyn Logger> = Arc::new(NoOpLogger::new());
        let fetcher = LookupFetcher::new(backend.clone(), logger.clone());
        let cache = LookupCache::new(fetcher, CacheConfig::from_secs(60), logger.clone());
        let dispatcher = ToolDispatcher::new(backend.clone(), cache, logger);

        let calls = (0..5).map(|_| dispatcher.list_lookups(ListLookupsParams::default()));
        for response in futures::future::join_all(calls).await {
            assert_eq!(response.unwrap().counts.len(), 5);
        }
        for category in LookupCategory::ALL {
            assert_eq!(backend.fetch_count(category), 1);
        }
    }
}
