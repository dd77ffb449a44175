//! Tool arguments and responses

use std::collections::BTreeMap;

use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::LookupRecord;

pub const DEFAULT_SEARCH_PAGE_SIZE: i64 = 25;
pub const MAX_SEARCH_PAGE_SIZE: i64 = 100;

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_SEARCH_PAGE_SIZE
}

fn default_true() -> bool {
    true
}

// Parameters for search_documents
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SearchDocumentsParams {
    /// Full-text search string. Leave empty to list recent documents.
    #[serde(default)]
    pub query: Option<String>,
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: i64,
    /// Items per page, 1 to 100 (default: 25)
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Filter by tag ID
    #[serde(default)]
    pub tag_id: Option<i64>,
    /// Filter by correspondent ID
    #[serde(default)]
    pub correspondent_id: Option<i64>,
    /// Filter by document type ID
    #[serde(default)]
    pub document_type_id: Option<i64>,
    /// Lower bound (YYYY-MM-DD) for the created date
    #[serde(default)]
    pub created_from: Option<String>,
    /// Upper bound (YYYY-MM-DD) for the created date
    #[serde(default)]
    pub created_to: Option<String>,
    /// Raw archive filter keys and values, e.g. {"storage_path__id": 2}
    #[serde(default)]
    pub custom_filters: Option<Map<String, Value>>,
}

impl Default for SearchDocumentsParams {
    fn default() -> Self {
        Self {
            query: None,
            page: default_page(),
            page_size: default_page_size(),
            tag_id: None,
            correspondent_id: None,
            document_type_id: None,
            created_from: None,
            created_to: None,
            custom_filters: None,
        }
    }
}

// Parameters for get_document
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GetDocumentParams {
    /// Numeric document ID
    pub document_id: i64,
}

// Parameters for upload_document
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UploadDocumentParams {
    /// Path to the file on the server's disk
    pub file_path: String,
    /// Document fields (title, tags, correspondent, created, ...). Lists are sent as
    /// repeated form fields, objects as JSON strings.
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    /// File name reported to the archive (default: the file's own name)
    #[serde(default)]
    pub filename: Option<String>,
}

// Parameters for update_document
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct UpdateDocumentParams {
    /// Numeric document ID
    pub document_id: i64,
    /// Fields to change; only these are sent. Null clears a field where supported.
    pub updates: Map<String, Value>,
}

// Parameters for create_lookup
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CreateLookupParams {
    /// One of tags, document_types, correspondents, storage_paths, custom_fields
    /// (singular forms accepted)
    pub lookup_type: String,
    /// Fields of the new entry, e.g. {"name": "Invoices"}
    pub data: Map<String, Value>,
    /// Parent tag ID (tags only)
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Match string for automatic assignment
    #[serde(default, rename = "match")]
    pub match_pattern: Option<String>,
    /// Matching algorithm: number or label (none, any, all, exact, regex, fuzzy, auto)
    #[serde(default)]
    pub matching_algorithm: Option<Value>,
    /// Default the matching algorithm to auto when none is given (default: true)
    #[serde(default = "default_true")]
    pub auto_match: bool,
    /// User IDs granted access; omit for the archive's defaults
    #[serde(default)]
    pub permissions: Option<Vec<i64>>,
}

impl CreateLookupParams {
    pub fn new(lookup_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            lookup_type: lookup_type.into(),
            data,
            parent_id: None,
            match_pattern: None,
            matching_algorithm: None,
            auto_match: true,
            permissions: None,
        }
    }
}

// Parameters for list_lookups
#[derive(Debug, Clone, Default, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ListLookupsParams {
    /// Bypass the cache and fetch from the archive now
    #[serde(default)]
    pub refresh: bool,
    /// Lookup lists to return (default: all)
    #[serde(default)]
    pub include: Option<Vec<String>>,
    /// Keys to keep in each returned item (default: full items)
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Response of list_lookups
///
/// Serializes as one key per returned category next to `counts` and, when
/// something failed, `errors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListLookupsResponse {
    #[serde(flatten)]
    pub lookups: BTreeMap<String, Vec<LookupRecord>>,
    pub counts: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, Value>,
}
