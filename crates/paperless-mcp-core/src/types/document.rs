//! Document shapes returned by the tools

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Compact view of a document used in search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: Value,
    pub title: Value,
    pub created: Value,
    pub modified: Value,
    pub document_type: Value,
    pub correspondent: Value,
    pub tags: Value,
    pub original_file_name: Value,
}

impl DocumentSummary {
    /// Pick the summary fields out of a full document record
    pub fn from_record(document: &Map<String, Value>) -> Self {
        let field = |name: &str| document.get(name).cloned().unwrap_or(Value::Null);
        Self {
            id: field("id"),
            title: field("title"),
            created: field("created"),
            modified: field("modified"),
            document_type: field("document_type"),
            correspondent: field("correspondent"),
            tags: document
                .get("tags")
                .cloned()
                .unwrap_or_else(|| Value::Array(Vec::new())),
            original_file_name: field("original_file_name"),
        }
    }
}

/// One page of search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub count: Value,
    pub next: Value,
    pub previous: Value,
    pub results: Vec<DocumentSummary>,
}

/// Flatten upload metadata into multipart form fields.
///
/// Lists of scalars become repeated fields, nested containers and mappings
/// are sent as JSON strings, nulls and blank keys are dropped.
pub fn metadata_form_fields(metadata: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in metadata {
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Array(items) => {
                if items.iter().any(|item| item.is_array() || item.is_object()) {
                    pairs.push((key.to_string(), value.to_string()));
                } else {
                    for item in items.iter().filter(|item| !item.is_null()) {
                        pairs.push((key.to_string(), scalar_to_string(item)));
                    }
                }
            }
            Value::Object(_) => pairs.push((key.to_string(), value.to_string())),
            scalar => pairs.push((key.to_string(), scalar_to_string(scalar))),
        }
    }
    pairs
}

/// Render a scalar JSON value the way a form field expects it
pub(crate) fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
