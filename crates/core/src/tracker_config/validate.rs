//! Tracker config document validation.
//!
//! Collects every violation instead of stopping at the first; a document
//! with any violation never produces an adapter.

use super::types::{CodeValue, FieldType, TrackerConfig};

/// Validate a parsed tracker config document.
///
/// Returns the full list of violations; an empty list means the document is
/// usable.
pub fn validate_tracker_config(config: &TrackerConfig) -> Vec<String> {
    let mut violations = Vec::new();

    if config.tracker.name.trim().is_empty() {
        violations.push("tracker.name must not be empty".to_string());
    }
    if config.tracker.slug.trim().is_empty() {
        violations.push("tracker.slug must not be empty".to_string());
    }

    if config.endpoints.upload.trim().is_empty() {
        violations.push("endpoints.upload must not be empty".to_string());
    }

    match config.upload.fields.get("torrent") {
        None => violations.push("upload.fields is missing required field 'torrent'".to_string()),
        Some(field) => {
            if field.field_type != FieldType::File {
                violations.push("upload.fields.torrent must have type 'file'".to_string());
            }
            if !field.required {
                violations.push("upload.fields.torrent must be required".to_string());
            }
        }
    }

    for (name, field) in &config.upload.fields {
        if let Some(rules) = &field.sanitize {
            if field.field_type != FieldType::String {
                violations.push(format!(
                    "upload.fields.{}: sanitize rules only apply to string fields",
                    name
                ));
            }
            if rules.max_length == Some(0) {
                violations.push(format!(
                    "upload.fields.{}: sanitize.max_length must be greater than 0",
                    name
                ));
            }
        }
    }

    for (key, entry) in &config.mappings {
        if entry.output_field.trim().is_empty() {
            violations.push(format!("mappings.{}: output_field must not be empty", key));
        }
        if !entry.multi {
            for (token, value) in &entry.values {
                if matches!(value, CodeValue::Many(_)) {
                    violations.push(format!(
                        "mappings.{}.values.{}: list value requires multi: true",
                        key, token
                    ));
                }
            }
            if matches!(entry.default, Some(CodeValue::Many(_))) {
                violations.push(format!(
                    "mappings.{}: list default requires multi: true",
                    key
                ));
            }
        }
    }

    if let Some(template) = &config.response.torrent_url_template {
        if !template.contains("{id}") {
            violations.push(
                "response.torrent_url_template must contain the {id} placeholder".to_string(),
            );
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker_config::load_tracker_config_from_str;

    const VALID_DOC: &str = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    torrent:
      type: file
      required: true
    title:
      source: release_name
      type: string
"#;

    #[test]
    fn test_valid_document_has_no_violations() {
        let config = load_tracker_config_from_str(VALID_DOC).unwrap();
        assert!(validate_tracker_config(&config).is_empty());
    }

    #[test]
    fn test_missing_torrent_field_named_in_violation() {
        let doc = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    title:
      source: release_name
      type: string
"#;
        let config: crate::tracker_config::TrackerConfig = serde_yaml::from_str(doc).unwrap();
        let violations = validate_tracker_config(&config);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].contains("torrent"));
    }

    #[test]
    fn test_torrent_field_wrong_type_rejected() {
        let doc = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    torrent:
      type: string
      required: true
"#;
        let config: crate::tracker_config::TrackerConfig = serde_yaml::from_str(doc).unwrap();
        let violations = validate_tracker_config(&config);
        assert!(violations.iter().any(|v| v.contains("type 'file'")));
    }

    #[test]
    fn test_list_value_without_multi_flag_rejected() {
        let doc = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    torrent:
      type: file
      required: true
mappings:
  language:
    output_field: lang_ids
    values:
      multi: [2, 3]
"#;
        let config: crate::tracker_config::TrackerConfig = serde_yaml::from_str(doc).unwrap();
        let violations = validate_tracker_config(&config);
        assert!(violations.iter().any(|v| v.contains("multi: true")));
    }

    #[test]
    fn test_multiple_violations_all_reported() {
        let doc = r#"
tracker:
  name: ""
  slug: ""
auth:
  type: bearer
endpoints:
  upload: ""
upload:
  fields:
    title:
      type: string
"#;
        let config: crate::tracker_config::TrackerConfig = serde_yaml::from_str(doc).unwrap();
        let violations = validate_tracker_config(&config);
        // name, slug, upload endpoint, missing torrent field
        assert_eq!(violations.len(), 4);
    }

    #[test]
    fn test_url_template_without_placeholder_rejected() {
        let doc = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    torrent:
      type: file
      required: true
response:
  torrent_url_template: "https://example.org/torrents"
"#;
        let config: crate::tracker_config::TrackerConfig = serde_yaml::from_str(doc).unwrap();
        let violations = validate_tracker_config(&config);
        assert!(violations.iter().any(|v| v.contains("{id}")));
    }

    #[test]
    fn test_save_load_validate_roundtrip() {
        let config = load_tracker_config_from_str(VALID_DOC).unwrap();
        let saved = serde_yaml::to_string(&config).unwrap();
        let reloaded = load_tracker_config_from_str(&saved).unwrap();
        assert_eq!(config, reloaded);
        assert!(validate_tracker_config(&reloaded).is_empty());
    }
}
