//! Field selection over lookup records

use crate::types::LookupRecord;

/// Trim field names and drop blanks; `None` when nothing is left
pub fn normalize_fields<S: AsRef<str>>(fields: Option<&[S]>) -> Option<Vec<String>> {
    let normalized: Vec<String> = fields?
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Copy records keeping only the requested keys.
///
/// Keys a record does not have are left out, never filled with null.
/// Without a field list every record is copied whole.
pub fn project(records: &[LookupRecord], fields: Option<&[String]>) -> Vec<LookupRecord> {
    match fields {
        None => records.to_vec(),
        Some(fields) => records
            .iter()
            .map(|record| {
                fields
                    .iter()
                    .filter_map(|field| record.get(field).map(|v| (field.clone(), v.clone())))
                    .collect()
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn records() -> Vec<LookupRecord> {
        vec![
            json!({"id": 1, "name": "Inbox", "match": "inbox"}),
            json!({"id": 2, "name": "Paid"}),
        ]
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .collect()
    }

    #[test]
    fn test_project_id_only() {
        let source = records();
        let fields = vec!["id".to_string()];
        let projected = project(&source, Some(&fields));

        assert_eq!(projected.len(), 2);
        for record in &projected {
            assert_eq!(record.len(), 1);
            assert!(record.contains_key("id"));
        }
        assert_eq!(source, records());
    }

    #[test]
    fn test_project_omits_missing_and_unknown() {
        let fields = vec!["name".to_string(), "match".to_string(), "colour".to_string()];
        let projected = project(&records(), Some(&fields));

        assert_eq!(Value::Object(projected[0].clone()), json!({"name": "Inbox", "match": "inbox"}));
        assert_eq!(Value::Object(projected[1].clone()), json!({"name": "Paid"}));
    }

    #[test]
    fn test_project_without_fields_copies() {
        assert_eq!(project(&records(), None), records());
    }

    #[test]
    fn test_normalize_fields() {
        assert_eq!(
            normalize_fields(Some(&[" id ", "", "name"][..])),
            Some(vec!["id".to_string(), "name".to_string()])
        );
        assert_eq!(normalize_fields(Some(&["  "][..])), None);
        assert_eq!(normalize_fields::<String>(None), None);
    }
}
