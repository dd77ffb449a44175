//! Lookup (taxonomy) types shared by the cache, fetcher and tools

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One taxonomy item as returned by the archive, e.g. `{"id": 3, "name": "Invoices", ...}`.
///
/// Nothing beyond `id` is assumed about the shape.
pub type LookupRecord = serde_json::Map<String, Value>;

/// Taxonomy category, used as the cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupCategory {
    Tag,
    DocumentType,
    Correspondent,
    StoragePath,
    CustomField,
}

/// Mapping from every accepted spelling to its category
static LOOKUP_ALIASES: Lazy<HashMap<&'static str, LookupCategory>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for category in LookupCategory::ALL {
        m.insert(category.plural(), category);
        m.insert(category.singular(), category);
    }
    m
});

/// Matching algorithm labels accepted by `create_lookup`
static MATCHING_ALGORITHMS: Lazy<HashMap<&'static str, i64>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("none", 0);
    m.insert("any", 1);
    m.insert("all", 2);
    m.insert("exact", 3);
    m.insert("literal", 3);
    m.insert("regex", 4);
    m.insert("regular_expression", 4);
    m.insert("regular expression", 4);
    m.insert("fuzzy", 5);
    m.insert("auto", 6);
    m
});

/// Numeric value of the "auto" matching algorithm
pub const MATCHING_ALGORITHM_AUTO: i64 = 6;

impl LookupCategory {
    /// All categories in response order
    pub const ALL: [LookupCategory; 5] = [
        LookupCategory::Tag,
        LookupCategory::DocumentType,
        LookupCategory::Correspondent,
        LookupCategory::StoragePath,
        LookupCategory::CustomField,
    ];

    pub fn singular(&self) -> &'static str {
        match self {
            LookupCategory::Tag => "tag",
            LookupCategory::DocumentType => "document_type",
            LookupCategory::Correspondent => "correspondent",
            LookupCategory::StoragePath => "storage_path",
            LookupCategory::CustomField => "custom_field",
        }
    }

    /// Plural name, used as response key and in `include` lists
    pub fn plural(&self) -> &'static str {
        match self {
            LookupCategory::Tag => "tags",
            LookupCategory::DocumentType => "document_types",
            LookupCategory::Correspondent => "correspondents",
            LookupCategory::StoragePath => "storage_paths",
            LookupCategory::CustomField => "custom_fields",
        }
    }

    /// Archive API collection endpoint
    pub fn endpoint(&self) -> &'static str {
        match self {
            LookupCategory::Tag => "/api/tags/",
            LookupCategory::DocumentType => "/api/document_types/",
            LookupCategory::Correspondent => "/api/correspondents/",
            LookupCategory::StoragePath => "/api/storage_paths/",
            LookupCategory::CustomField => "/api/custom_fields/",
        }
    }

    /// Whether entries of this category take `match`/`matching_algorithm`
    pub fn supports_matching(&self) -> bool {
        !matches!(self, LookupCategory::CustomField)
    }

    /// Resolve a singular or plural alias, case-insensitive
    pub fn from_alias(alias: &str) -> Option<Self> {
        let normalized = alias.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        LOOKUP_ALIASES.get(normalized.as_str()).copied()
    }

    /// Resolve an archive endpoint path back to its category
    pub fn from_endpoint(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.endpoint() == path)
    }

    /// Plural names of every category, for error payloads
    pub fn allowed_names() -> Vec<String> {
        Self::ALL.iter().map(|c| c.plural().to_string()).collect()
    }
}

impl fmt::Display for LookupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.plural())
    }
}

/// Error returned when an alias names no category
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lookup type: {0}")]
pub struct UnknownLookupType(pub String);

impl FromStr for LookupCategory {
    type Err = UnknownLookupType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_alias(s).ok_or_else(|| UnknownLookupType(s.trim().to_string()))
    }
}

/// Normalize a matching algorithm given as a label or number.
///
/// Known labels map to their numeric value, numbers pass through, anything
/// else is returned unchanged so the archive can reject it.
pub fn normalize_matching_algorithm(value: &Value) -> Value {
    match value {
        Value::String(label) => MATCHING_ALGORITHMS
            .get(label.trim().to_lowercase().as_str())
            .map(|n| Value::from(*n))
            .unwrap_or_else(|| value.clone()),
        _ => value.clone(),
    }
}
