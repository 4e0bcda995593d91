//! Parsed tracker upload-config documents.
//!
//! These documents describe how to talk to one tracker's upload API:
//! authentication, endpoints, upload form fields, and option mappings. They
//! are parsed into strongly-typed structs once at load time; runtime access
//! is plain field access.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// A complete tracker upload-config document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TrackerConfig {
    pub tracker: TrackerSection,
    pub auth: AuthSection,
    pub endpoints: Endpoints,
    pub upload: UploadSection,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mappings: BTreeMap<String, MappingEntry>,
    #[serde(default)]
    pub cloudflare: CloudflareSection,
    #[serde(default)]
    pub response: ResponseSection,
}

/// Tracker identity.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TrackerSection {
    pub name: String,
    pub slug: String,
}

/// Authentication scheme.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthSection {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    /// Header name for api_key auth (default "Authorization").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
    /// Value prefix for bearer-style headers (default "Bearer ").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Enumerated authentication types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Bearer,
    ApiKey,
    Passkey,
    Cookie,
    None,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Bearer => "bearer",
            AuthType::ApiKey => "api_key",
            AuthType::Passkey => "passkey",
            AuthType::Cookie => "cookie",
            AuthType::None => "none",
        }
    }
}

/// Named URL fragments, joined onto the tracker base URL.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Endpoints {
    pub upload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
}

/// Upload form description.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UploadSection {
    pub fields: FieldMap,
}

/// Upload form fields in document order.
///
/// Multipart parts are emitted in the order the document declares them;
/// some tracker APIs require the torrent part first, so the written order
/// must survive parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, FieldDescriptor)>);

impl FieldMap {
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.0.iter().find(|(k, _)| k.as_str() == name).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldDescriptor)> {
        self.0.iter().map(|(k, v)| (k, v))
    }
}

impl<'a> IntoIterator for &'a FieldMap {
    type Item = (&'a String, &'a FieldDescriptor);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, FieldDescriptor)>,
        fn(&'a (String, FieldDescriptor)) -> (&'a String, &'a FieldDescriptor),
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().map(|(k, v)| (k, v))
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of field descriptors")
            }

            fn visit_map<A>(self, mut access: A) -> Result<FieldMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, FieldDescriptor)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry::<String, FieldDescriptor>()? {
                    if entries.iter().any(|(k, _)| k == &key) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate field '{}'",
                            key
                        )));
                    }
                    entries.push((key, value));
                }
                Ok(FieldMap(entries))
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

impl Serialize for FieldMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One upload form field.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldDescriptor {
    /// Named value in the upload data-source context. Defaults to the
    /// field's own name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sanitize: Option<SanitizeRules>,
}

/// Enumerated field encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    File,
    String,
    Json,
    Boolean,
    Repeated,
    Number,
}

/// String sanitization applied before emission.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SanitizeRules {
    /// Replace spaces with this string (e.g., ".").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_spaces: Option<String>,
    /// Truncate to at most this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
}

impl SanitizeRules {
    /// Apply the configured rules to a value.
    pub fn apply(&self, value: &str) -> String {
        let mut out = match &self.replace_spaces {
            Some(replacement) => value.replace(' ', replacement),
            None => value.to_string(),
        };
        if let Some(max) = self.max_length {
            if out.chars().count() > max {
                out = out.chars().take(max).collect();
            }
        }
        out
    }
}

/// Raw code value as written in the document: either one code or a list.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum CodeValue {
    One(i64),
    Many(Vec<i64>),
}

/// Parsed code value, shaped by the entry's `multi` flag at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingCode {
    Single(i64),
    Multi(Vec<i64>),
}

impl MappingCode {
    /// Flatten into a code list regardless of shape.
    pub fn codes(&self) -> Vec<i64> {
        match self {
            MappingCode::Single(c) => vec![*c],
            MappingCode::Multi(cs) => cs.clone(),
        }
    }
}

/// One option-mapping table: semantic tokens to tracker-specific codes.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MappingEntry {
    /// Release attribute the input token comes from (e.g., "resolution").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_field: Option<String>,
    /// Form field the resolved code is written to.
    pub output_field: String,
    /// When true every value resolves to a code list.
    #[serde(default)]
    pub multi: bool,
    #[serde(default)]
    pub values: BTreeMap<String, CodeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<CodeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<CodeValue>,
}

impl MappingEntry {
    fn shape(&self, value: &CodeValue) -> MappingCode {
        match (self.multi, value) {
            (true, CodeValue::One(c)) => MappingCode::Multi(vec![*c]),
            (true, CodeValue::Many(cs)) => MappingCode::Multi(cs.clone()),
            (false, CodeValue::One(c)) => MappingCode::Single(*c),
            // Validation rejects this shape; take the first code if it slips through.
            (false, CodeValue::Many(cs)) => {
                MappingCode::Single(cs.first().copied().unwrap_or_default())
            }
        }
    }

    /// Resolve a token: exact match, then case-insensitive substring match,
    /// then the entry default, then the fallback.
    pub fn resolve(&self, token: &str) -> Option<MappingCode> {
        if let Some(value) = self.values.get(token) {
            return Some(self.shape(value));
        }

        let lowered = token.to_lowercase();
        for (key, value) in &self.values {
            let key_lower = key.to_lowercase();
            if lowered.contains(&key_lower) || key_lower.contains(&lowered) {
                return Some(self.shape(value));
            }
        }

        self.default
            .as_ref()
            .or(self.fallback.as_ref())
            .map(|v| self.shape(v))
    }
}

/// Cloudflare bypass requirement. Orthogonal to the auth type.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CloudflareSection {
    #[serde(default)]
    pub enabled: bool,
}

/// How upload responses are reduced to a result.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResponseSection {
    /// Dot-path to the boolean success flag.
    #[serde(default = "default_success_field")]
    pub success_field: String,
    /// Dot-path to the created torrent's id.
    #[serde(default = "default_torrent_id_field")]
    pub torrent_id_field: String,
    /// Dot-path to the error message.
    #[serde(default = "default_error_field")]
    pub error_field: String,
    /// Template for the torrent's tracker-side URL, with `{id}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_url_template: Option<String>,
}

impl Default for ResponseSection {
    fn default() -> Self {
        Self {
            success_field: default_success_field(),
            torrent_id_field: default_torrent_id_field(),
            error_field: default_error_field(),
            torrent_url_template: None,
        }
    }
}

fn default_success_field() -> String {
    "success".to_string()
}

fn default_torrent_id_field() -> String {
    "data.id".to_string()
}

fn default_error_field() -> String {
    "message".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replace_spaces_and_truncate() {
        let rules = SanitizeRules {
            replace_spaces: Some(".".to_string()),
            max_length: Some(10),
        };
        assert_eq!(rules.apply("a b c d e f g"), "a.b.c.d.e.");
    }

    #[test]
    fn test_sanitize_no_rules_is_identity() {
        let rules = SanitizeRules {
            replace_spaces: None,
            max_length: None,
        };
        assert_eq!(rules.apply("Movie Name 2024"), "Movie Name 2024");
    }

    #[test]
    fn test_mapping_resolve_exact() {
        let entry: MappingEntry = serde_yaml::from_str(
            r#"
output_field: type_id
values:
  "1080p": 3
  "2160p": 1
default: 5
"#,
        )
        .unwrap();
        assert_eq!(entry.resolve("1080p"), Some(MappingCode::Single(3)));
    }

    #[test]
    fn test_mapping_resolve_substring() {
        let entry: MappingEntry = serde_yaml::from_str(
            r#"
output_field: type_id
values:
  "1080p": 3
"#,
        )
        .unwrap();
        // Token from a release name contains the table key.
        assert_eq!(
            entry.resolve("Movie.2024.1080p.WEB-DL"),
            Some(MappingCode::Single(3))
        );
    }

    #[test]
    fn test_mapping_resolve_default() {
        let entry: MappingEntry = serde_yaml::from_str(
            r#"
output_field: type_id
values:
  "1080p": 3
default: 5
"#,
        )
        .unwrap();
        assert_eq!(entry.resolve("480i"), Some(MappingCode::Single(5)));
    }

    #[test]
    fn test_mapping_multi_shapes_single_code() {
        let entry: MappingEntry = serde_yaml::from_str(
            r#"
output_field: languages
multi: true
values:
  "french": 2
  "multi": [2, 3]
"#,
        )
        .unwrap();
        assert_eq!(entry.resolve("french"), Some(MappingCode::Multi(vec![2])));
        assert_eq!(entry.resolve("multi"), Some(MappingCode::Multi(vec![2, 3])));
    }

    #[test]
    fn test_mapping_no_match_no_default() {
        let entry: MappingEntry = serde_yaml::from_str(
            r#"
output_field: type_id
values:
  "1080p": 3
"#,
        )
        .unwrap();
        assert_eq!(entry.resolve("xyz"), None);
    }

    #[test]
    fn test_field_map_keeps_document_order() {
        // Declaration order deliberately inverts alphabetical order.
        let section: UploadSection = serde_yaml::from_str(
            r#"
fields:
  torrent:
    type: file
    required: true
  nfo:
    type: file
  description:
    type: string
"#,
        )
        .unwrap();

        let names: Vec<_> = section.fields.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["torrent", "nfo", "description"]);

        // Order survives a serialize round-trip.
        let raw = serde_yaml::to_string(&section).unwrap();
        let reloaded: UploadSection = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(section, reloaded);
    }

    #[test]
    fn test_field_map_lookup() {
        let section: UploadSection = serde_yaml::from_str(
            r#"
fields:
  torrent:
    type: file
    required: true
"#,
        )
        .unwrap();
        assert!(section.fields.get("torrent").is_some());
        assert!(section.fields.get("missing").is_none());
        assert_eq!(section.fields.len(), 1);
    }

    #[test]
    fn test_field_map_rejects_duplicate_keys() {
        let result: Result<UploadSection, _> = serde_yaml::from_str(
            r#"
fields:
  torrent:
    type: file
  torrent:
    type: string
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_auth_type_parse() {
        let auth: AuthSection = serde_yaml::from_str("type: api_key\nheader: X-Api-Key").unwrap();
        assert_eq!(auth.auth_type, AuthType::ApiKey);
        assert_eq!(auth.header.as_deref(), Some("X-Api-Key"));
    }

    #[test]
    fn test_unknown_auth_type_fails_parse() {
        let result: Result<AuthSection, _> = serde_yaml::from_str("type: magic");
        assert!(result.is_err());
    }
}
