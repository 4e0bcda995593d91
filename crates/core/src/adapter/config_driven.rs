//! Config-driven generic adapter.
//!
//! Implements the full adapter contract from a tracker config document
//! alone: authentication, upload form construction, response reduction,
//! and search all come from the parsed config, no per-tracker code.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, RequestBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::tracker::{AdapterKind, Tracker};
use crate::tracker_config::{AuthType, FieldType, MappingCode, TrackerConfig};

use super::cloudflare::CloudflareBypassClient;
use super::passkey::MIN_PASSKEY_LEN;
use super::torznab::parse_torznab_results;
use super::types::{
    derive_name_query, AdapterInfo, DuplicateQuery, DuplicateResult, ExistingTorrent,
    HealthStatus, SearchMethod, TrackerCategory, TrackerError, TrackerTag, UploadOutcome,
    UploadRequest,
};
use super::TrackerAdapter;

/// One encoded upload form part, before conversion to multipart.
#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    File {
        field: String,
        filename: String,
        bytes: Vec<u8>,
    },
    Text {
        field: String,
        value: String,
    },
}

/// A value resolved from the upload data-source context.
enum SourceValue {
    Bytes(Vec<u8>),
    Text(String),
    List(Vec<String>),
}

fn resolve_source(name: &str, request: &UploadRequest, tracker: &Tracker) -> Option<SourceValue> {
    match name {
        "torrent" | "torrent_bytes" => Some(SourceValue::Bytes(request.torrent_bytes.clone())),
        "nfo" | "nfo_bytes" => request.nfo_bytes.clone().map(SourceValue::Bytes),
        "release_name" | "name" => Some(SourceValue::Text(request.release_name.clone())),
        "category_id" => request
            .category_id
            .or(tracker.default_category_id)
            .map(|id| SourceValue::Text(id.to_string())),
        "subcategory_id" | "type_id" => request
            .subcategory_id
            .or(tracker.default_subcategory_id)
            .map(|id| SourceValue::Text(id.to_string())),
        "tag_ids" | "tags" => {
            if request.tag_ids.is_empty() {
                None
            } else {
                Some(SourceValue::List(
                    request.tag_ids.iter().map(|id| id.to_string()).collect(),
                ))
            }
        }
        "description" => request.description.clone().map(SourceValue::Text),
        "tmdb_id" => request.tmdb_id.map(|id| SourceValue::Text(id.to_string())),
        "tmdb_type" => request.tmdb_type.clone().map(SourceValue::Text),
        "cover_url" => request.cover_url.clone().map(SourceValue::Text),
        other => request
            .extra
            .get(other)
            .map(|v| SourceValue::Text(v.clone())),
    }
}

fn synthesized_filename(field: &str, source: &str, release_name: &str) -> String {
    if field == "torrent" || source == "torrent" || source == "torrent_bytes" {
        "torrent.torrent".to_string()
    } else if source == "nfo" || source == "nfo_bytes" {
        format!("{}.nfo", release_name)
    } else {
        format!("{}.bin", field)
    }
}

fn value_as_text(value: SourceValue) -> String {
    match value {
        SourceValue::Text(s) => s,
        SourceValue::Bytes(b) => String::from_utf8_lossy(&b).to_string(),
        SourceValue::List(items) => items.join(","),
    }
}

/// Build the upload form parts for a request against a config document.
///
/// Field order follows the document's field map order. A required field
/// with no resolvable value aborts with an error naming the field; an
/// optional one is omitted.
pub fn build_form_parts(
    config: &TrackerConfig,
    tracker: &Tracker,
    request: &UploadRequest,
) -> Result<Vec<FormPart>, TrackerError> {
    let mut parts = Vec::new();

    for (field_name, descriptor) in &config.upload.fields {
        let source = descriptor.source.as_deref().unwrap_or(field_name);
        let value = resolve_source(source, request, tracker);

        let value = match value {
            Some(v) => v,
            None if descriptor.required => {
                return Err(TrackerError::MissingField(field_name.clone()));
            }
            None => continue,
        };

        match descriptor.field_type {
            FieldType::File => {
                let bytes = match value {
                    SourceValue::Bytes(b) => b,
                    SourceValue::Text(s) => s.into_bytes(),
                    SourceValue::List(_) => {
                        return Err(TrackerError::InvalidConfig(format!(
                            "Field '{}' cannot encode a list as a file",
                            field_name
                        )));
                    }
                };
                parts.push(FormPart::File {
                    field: field_name.clone(),
                    filename: synthesized_filename(field_name, source, &request.release_name),
                    bytes,
                });
            }
            FieldType::String => {
                let mut text = value_as_text(value);
                if let Some(rules) = &descriptor.sanitize {
                    text = rules.apply(&text);
                }
                parts.push(FormPart::Text {
                    field: field_name.clone(),
                    value: text,
                });
            }
            FieldType::Json => {
                let json = match value {
                    SourceValue::List(items) => serde_json::to_string(&items),
                    other => serde_json::to_string(&value_as_text(other)),
                }
                .map_err(|e| TrackerError::Api(e.to_string()))?;
                parts.push(FormPart::Text {
                    field: field_name.clone(),
                    value: json,
                });
            }
            FieldType::Boolean => {
                let text = value_as_text(value).to_lowercase();
                let truthy = matches!(text.as_str(), "true" | "1" | "yes" | "on");
                parts.push(FormPart::Text {
                    field: field_name.clone(),
                    value: if truthy { "true" } else { "false" }.to_string(),
                });
            }
            FieldType::Repeated => {
                let items = match value {
                    SourceValue::List(items) => items,
                    other => vec![value_as_text(other)],
                };
                for item in items {
                    parts.push(FormPart::Text {
                        field: field_name.clone(),
                        value: item,
                    });
                }
            }
            FieldType::Number => {
                let text = value_as_text(value);
                let trimmed = text.trim();
                if trimmed.parse::<f64>().is_err() {
                    return Err(TrackerError::Api(format!(
                        "Field '{}' is not numeric: {}",
                        field_name, trimmed
                    )));
                }
                parts.push(FormPart::Text {
                    field: field_name.clone(),
                    value: trimmed.to_string(),
                });
            }
        }
    }

    // Option mappings contribute additional form entries resolved from
    // release attributes.
    for (key, entry) in &config.mappings {
        let input = entry.input_field.as_deref().unwrap_or(key);
        let token = match input {
            "release_name" | "name" => Some(request.release_name.clone()),
            other => request.extra.get(other).cloned(),
        };

        let Some(token) = token else { continue };
        let Some(code) = entry.resolve(&token) else { continue };

        match code {
            MappingCode::Single(c) => parts.push(FormPart::Text {
                field: entry.output_field.clone(),
                value: c.to_string(),
            }),
            MappingCode::Multi(cs) => {
                for c in cs {
                    parts.push(FormPart::Text {
                        field: entry.output_field.clone(),
                        value: c.to_string(),
                    });
                }
            }
        }
    }

    Ok(parts)
}

/// Look up a dot-path in a JSON value. Absent or non-object intermediate
/// segments yield `None`, never an error.
pub fn path_lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn lookup_bool(root: &Value, path: &str, default: bool) -> bool {
    path_lookup(root, path)
        .and_then(Value::as_bool)
        .unwrap_or(default)
}

fn lookup_string(root: &Value, path: &str) -> Option<String> {
    path_lookup(root, path).map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn parse_json_hits(root: &Value) -> Vec<ExistingTorrent> {
    let items = root
        .get("data")
        .and_then(Value::as_array)
        .or_else(|| root.as_array());

    let Some(items) = items else {
        return vec![];
    };

    items
        .iter()
        .filter_map(|item| {
            let body = item.get("attributes").unwrap_or(item);
            let title = body.get("name").or_else(|| body.get("title"))?;
            Some(ExistingTorrent {
                title: title.as_str()?.to_string(),
                link: body
                    .get("details_link")
                    .or_else(|| body.get("link"))
                    .and_then(Value::as_str)
                    .map(String::from),
                guid: body.get("guid").and_then(Value::as_str).map(String::from),
                size: body.get("size").and_then(Value::as_u64),
                exact_match: false,
            })
        })
        .collect()
}

pub struct ConfigDrivenAdapter {
    tracker: Tracker,
    config: Arc<TrackerConfig>,
    client: Client,
    bypass: Option<Arc<CloudflareBypassClient>>,
}

impl ConfigDrivenAdapter {
    pub fn new(
        tracker: Tracker,
        config: Arc<TrackerConfig>,
        http: &HttpConfig,
        bypass: Option<Arc<CloudflareBypassClient>>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            tracker,
            config,
            client,
            bypass,
        }
    }

    fn base_url(&self) -> &str {
        self.config
            .endpoints
            .base
            .as_deref()
            .unwrap_or(&self.tracker.base_url)
            .trim_end_matches('/')
    }

    fn endpoint_url(&self, fragment: &str) -> String {
        if fragment.starts_with("http://") || fragment.starts_with("https://") {
            fragment.to_string()
        } else {
            format!("{}{}", self.base_url(), fragment)
        }
    }

    /// Apply the configured auth scheme to a request.
    fn with_auth(&self, builder: RequestBuilder) -> Result<RequestBuilder, TrackerError> {
        match self.config.auth.auth_type {
            AuthType::Bearer => {
                let token = self.credential("API token")?;
                let prefix = self.config.auth.prefix.as_deref().unwrap_or("Bearer ");
                Ok(builder.header(
                    self.config.auth.header.as_deref().unwrap_or("Authorization"),
                    format!("{}{}", prefix, token),
                ))
            }
            AuthType::ApiKey => {
                let token = self.credential("API key")?;
                let header = self.config.auth.header.as_deref().unwrap_or("Authorization");
                let value = match self.config.auth.prefix.as_deref() {
                    Some(prefix) => format!("{}{}", prefix, token),
                    None => token.to_string(),
                };
                Ok(builder.header(header, value))
            }
            // Passkey rides in the URL, cookie auth in the bypass session.
            AuthType::Passkey | AuthType::Cookie | AuthType::None => Ok(builder),
        }
    }

    fn credential(&self, what: &str) -> Result<&str, TrackerError> {
        let token = self.tracker.api_key.as_deref().unwrap_or_default().trim();
        if token.is_empty() {
            return Err(TrackerError::Auth(format!("{} not configured", what)));
        }
        Ok(token)
    }

    fn passkey(&self) -> Result<&str, TrackerError> {
        let passkey = self.tracker.passkey.as_deref().unwrap_or_default().trim();
        if passkey.len() < MIN_PASSKEY_LEN {
            return Err(TrackerError::Auth("Passkey missing or too short".to_string()));
        }
        Ok(passkey)
    }

    fn needs_bypass(&self) -> bool {
        self.config.cloudflare.enabled || self.tracker.requires_cloudflare_bypass
    }

    async fn with_bypass(&self, builder: RequestBuilder) -> Result<RequestBuilder, TrackerError> {
        if !self.needs_bypass() {
            return Ok(builder);
        }
        let bypass = self.bypass.as_ref().ok_or_else(|| {
            TrackerError::InvalidConfig("Cloudflare bypass required but no service configured".to_string())
        })?;
        let session = bypass.session_for(self.base_url()).await?;
        Ok(builder
            .header(reqwest::header::COOKIE, session.cookie_header)
            .header(reqwest::header::USER_AGENT, session.user_agent))
    }

    async fn prepared(&self, builder: RequestBuilder) -> Result<RequestBuilder, TrackerError> {
        let builder = self.with_auth(builder)?;
        self.with_bypass(builder).await
    }

    async fn probe(&self, endpoint: &str) -> Result<bool, TrackerError> {
        let url = self.endpoint_url(endpoint);
        let builder = self.prepared(self.client.get(&url)).await?;
        let response = builder.send().await.map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        match status.as_u16() {
            401 => Err(TrackerError::Auth("Credentials rejected".to_string())),
            403 => Err(TrackerError::Auth("Credentials lack permission".to_string())),
            _ if status.is_success() => Ok(true),
            _ => Err(TrackerError::Api(format!("HTTP {}", status))),
        }
    }

    fn into_multipart(parts: Vec<FormPart>) -> Result<multipart::Form, TrackerError> {
        let mut form = multipart::Form::new();
        for part in parts {
            form = match part {
                FormPart::File {
                    field,
                    filename,
                    bytes,
                } => {
                    let file_part = multipart::Part::bytes(bytes)
                        .file_name(filename)
                        .mime_str("application/octet-stream")
                        .map_err(|e| TrackerError::Api(e.to_string()))?;
                    form.part(field, file_part)
                }
                FormPart::Text { field, value } => form.text(field, value),
            };
        }
        Ok(form)
    }

    async fn search_raw(&self, params: &[(&str, String)]) -> Result<String, TrackerError> {
        let search = self.config.endpoints.search.as_ref().ok_or_else(|| {
            TrackerError::InvalidConfig("No search endpoint configured".to_string())
        })?;

        let mut url = self.endpoint_url(search);
        let separator = if url.contains('?') { '&' } else { '?' };
        let mut first = true;
        for (key, value) in params {
            url.push(if first { separator } else { '&' });
            url.push_str(&format!("{}={}", key, urlencoding::encode(value)));
            first = false;
        }
        if self.config.auth.auth_type == AuthType::Passkey {
            url.push('&');
            url.push_str(&format!("passkey={}", self.passkey()?));
        }

        let builder = self.prepared(self.client.get(&url)).await?;
        let response = builder.send().await.map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TrackerError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(TrackerError::Api(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TrackerError::Api(e.to_string()))
    }

    fn parse_hits(body: &str) -> Vec<ExistingTorrent> {
        if body.trim_start().starts_with('<') {
            parse_torznab_results(body)
        } else {
            serde_json::from_str::<Value>(body)
                .map(|root| parse_json_hits(&root))
                .unwrap_or_default()
        }
    }

    fn reduce_upload_response(&self, body: &str) -> UploadOutcome {
        let response = &self.config.response;
        let Ok(root) = serde_json::from_str::<Value>(body) else {
            return UploadOutcome {
                success: false,
                torrent_id: None,
                torrent_url: None,
                message: Some("Response was not JSON".to_string()),
                raw_response: Some(body.to_string()),
            };
        };

        let success = lookup_bool(&root, &response.success_field, false);
        let torrent_id = lookup_string(&root, &response.torrent_id_field);
        let message = lookup_string(&root, &response.error_field);
        let torrent_url = torrent_id.as_ref().and_then(|id| {
            response
                .torrent_url_template
                .as_ref()
                .map(|template| template.replace("{id}", id))
        });

        UploadOutcome {
            success,
            torrent_id,
            torrent_url,
            message,
            raw_response: Some(body.to_string()),
        }
    }
}

#[async_trait]
impl TrackerAdapter for ConfigDrivenAdapter {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            kind: AdapterKind::ConfigDriven,
            tracker_slug: self.tracker.slug.clone(),
            supports_tags: self.config.endpoints.tags.is_some(),
            supports_categories: self.config.endpoints.categories.is_some(),
            supports_search: self.config.endpoints.search.is_some(),
        }
    }

    async fn authenticate(&self) -> Result<bool, TrackerError> {
        match self.config.auth.auth_type {
            // Format validation only, no probe endpoint exists for passkeys.
            AuthType::Passkey => self.passkey().map(|_| true),
            AuthType::None => Ok(true),
            AuthType::Bearer | AuthType::ApiKey | AuthType::Cookie => {
                let endpoint = self
                    .config
                    .endpoints
                    .health
                    .as_deref()
                    .or(self.config.endpoints.categories.as_deref())
                    .ok_or_else(|| {
                        TrackerError::InvalidConfig(
                            "No health or categories endpoint to probe".to_string(),
                        )
                    })?;
                let valid = self.probe(endpoint).await?;
                debug!(tracker = %self.tracker.slug, "Auth probe succeeded");
                Ok(valid)
            }
        }
    }

    async fn upload_torrent(&self, request: &UploadRequest) -> Result<UploadOutcome, TrackerError> {
        self.authenticate().await?;

        let parts = build_form_parts(&self.config, &self.tracker, request)?;
        let form = Self::into_multipart(parts)?;

        let mut url = self.endpoint_url(&self.config.endpoints.upload);
        if self.config.auth.auth_type == AuthType::Passkey {
            let separator = if url.contains('?') { '&' } else { '?' };
            url.push(separator);
            url.push_str(&format!("passkey={}", self.passkey()?));
        }

        let builder = self.prepared(self.client.post(&url)).await?;
        let response = builder
            .multipart(form)
            .send()
            .await
            .map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TrackerError::Auth(format!("HTTP {}", status)));
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TrackerError::Api(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        Ok(self.reduce_upload_response(&body))
    }

    async fn validate_credentials(&self) -> Result<bool, TrackerError> {
        match self.authenticate().await {
            Ok(valid) => Ok(valid),
            Err(TrackerError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError> {
        let Some(endpoint) = self.config.endpoints.tags.as_deref() else {
            return Ok(vec![]);
        };
        let url = self.endpoint_url(endpoint);
        let builder = self.prepared(self.client.get(&url)).await?;
        let response = builder.send().await.map_err(TrackerError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(TrackerError::Api(format!("HTTP {}", response.status())));
        }

        let root: Value = response
            .json()
            .await
            .map_err(|e| TrackerError::Api(format!("Failed to parse response: {}", e)))?;

        let items = root
            .get("data")
            .and_then(Value::as_array)
            .or_else(|| root.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                Some(TrackerTag {
                    id: item.get("id").and_then(Value::as_i64)?,
                    label: item
                        .get("name")
                        .or_else(|| item.get("label"))
                        .and_then(Value::as_str)?
                        .to_string(),
                    category: item
                        .get("category")
                        .and_then(Value::as_str)
                        .map(String::from),
                    description: item
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                })
            })
            .collect())
    }

    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError> {
        let Some(endpoint) = self.config.endpoints.categories.as_deref() else {
            return Ok(vec![]);
        };
        let url = self.endpoint_url(endpoint);
        let builder = self.prepared(self.client.get(&url)).await?;
        let response = builder.send().await.map_err(TrackerError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(TrackerError::Api(format!("HTTP {}", response.status())));
        }

        let root: Value = response
            .json()
            .await
            .map_err(|e| TrackerError::Api(format!("Failed to parse response: {}", e)))?;

        let items = root
            .get("data")
            .and_then(Value::as_array)
            .or_else(|| root.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(items
            .iter()
            .filter_map(|item| {
                Some(TrackerCategory {
                    id: item.get("id").and_then(Value::as_i64)?,
                    label: item
                        .get("name")
                        .or_else(|| item.get("label"))
                        .and_then(Value::as_str)?
                        .to_string(),
                    description: item
                        .get("description")
                        .and_then(Value::as_str)
                        .map(String::from),
                })
            })
            .collect())
    }

    async fn check_duplicate(
        &self,
        query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError> {
        if self.config.endpoints.search.is_none() {
            return Ok(DuplicateResult::no_hits(SearchMethod::None));
        }

        if let Some(tmdb_id) = query.tmdb_id {
            let body = self.search_raw(&[("tmdbid", tmdb_id.to_string())]).await?;
            let hits = Self::parse_hits(&body);
            if !hits.is_empty() {
                return Ok(DuplicateResult::from_hits(hits, SearchMethod::Tmdb, query.file_size));
            }
        }

        if let Some(imdb_id) = &query.imdb_id {
            let body = self.search_raw(&[("imdbid", imdb_id.clone())]).await?;
            let hits = Self::parse_hits(&body);
            if !hits.is_empty() {
                return Ok(DuplicateResult::from_hits(hits, SearchMethod::Imdb, query.file_size));
            }
        }

        if let Some(release_name) = &query.release_name {
            let title = derive_name_query(release_name);
            if !title.is_empty() {
                let body = self.search_raw(&[("q", title)]).await?;
                let hits = Self::parse_hits(&body);
                if !hits.is_empty() {
                    return Ok(DuplicateResult::from_hits(
                        hits,
                        SearchMethod::Name,
                        query.file_size,
                    ));
                }
            }
        }

        Ok(DuplicateResult::no_hits(SearchMethod::None))
    }

    async fn health_check(&self) -> HealthStatus {
        let bypass_available = if self.needs_bypass() {
            match &self.bypass {
                Some(bypass) => Some(bypass.is_available().await),
                None => Some(false),
            }
        } else {
            None
        };

        let (reachable, credentials_valid) = match self.authenticate().await {
            Ok(valid) => (true, valid),
            Err(TrackerError::Auth(_)) => (true, false),
            Err(e) => {
                warn!(tracker = %self.tracker.slug, error = %e, "Health probe failed");
                (false, false)
            }
        };

        HealthStatus {
            tracker_reachable: reachable,
            credentials_valid,
            bypass_available,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tracker_fixture;
    use crate::tracker_config::load_tracker_config_from_str;
    use serde_json::json;

    const DOC: &str = r#"
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

    fn request() -> UploadRequest {
        UploadRequest {
            release_name: "Movie.2024.1080p-GRP".to_string(),
            torrent_bytes: vec![1, 2, 3],
            ..Default::default()
        }
    }

    #[test]
    fn test_form_parts_file_and_title() {
        let config = load_tracker_config_from_str(DOC).unwrap();
        let tracker = tracker_fixture("exm");
        let parts = build_form_parts(&config, &tracker, &request()).unwrap();

        assert_eq!(
            parts[0],
            FormPart::File {
                field: "torrent".to_string(),
                filename: "torrent.torrent".to_string(),
                bytes: vec![1, 2, 3],
            }
        );
        assert_eq!(
            parts[1],
            FormPart::Text {
                field: "title".to_string(),
                value: "Movie.2024.1080p-GRP".to_string(),
            }
        );
    }

    #[test]
    fn test_form_parts_follow_document_order() {
        // Field names sort alphabetically against their declaration order;
        // the emitted parts must still follow the document.
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
    name:
      source: release_name
      type: string
    description:
      type: string
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let mut req = request();
        req.description = Some("mediainfo".to_string());
        let parts = build_form_parts(&config, &tracker, &req).unwrap();

        let fields: Vec<_> = parts
            .iter()
            .map(|p| match p {
                FormPart::File { field, .. } => field.as_str(),
                FormPart::Text { field, .. } => field.as_str(),
            })
            .collect();
        assert_eq!(fields, vec!["torrent", "name", "description"]);
    }

    #[test]
    fn test_missing_required_field_names_the_field() {
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
    nfo:
      type: file
      required: true
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        match build_form_parts(&config, &tracker, &request()) {
            Err(TrackerError::MissingField(field)) => assert_eq!(field, "nfo"),
            other => panic!("Expected MissingField, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_optional_missing_field_omitted() {
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
    description:
      type: string
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let parts = build_form_parts(&config, &tracker, &request()).unwrap();
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_repeated_field_one_entry_per_element() {
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
    tags:
      source: tag_ids
      type: repeated
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let mut req = request();
        req.tag_ids = vec![4, 7, 9];
        let parts = build_form_parts(&config, &tracker, &req).unwrap();

        let tag_parts: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                FormPart::Text { field, value } if field == "tags" => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tag_parts, vec!["4", "7", "9"]);
    }

    #[test]
    fn test_boolean_and_number_encodings() {
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
    anonymous:
      type: boolean
    tmdb:
      source: tmdb_id
      type: number
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let mut req = request();
        req.tmdb_id = Some(550);
        req.extra.insert("anonymous".to_string(), "1".to_string());
        let parts = build_form_parts(&config, &tracker, &req).unwrap();

        assert!(parts.contains(&FormPart::Text {
            field: "anonymous".to_string(),
            value: "true".to_string(),
        }));
        assert!(parts.contains(&FormPart::Text {
            field: "tmdb".to_string(),
            value: "550".to_string(),
        }));
    }

    #[test]
    fn test_sanitize_applied_to_string_field() {
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
    title:
      source: release_name
      type: string
      sanitize:
        replace_spaces: "."
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let mut req = request();
        req.release_name = "Movie Name 2024".to_string();
        let parts = build_form_parts(&config, &tracker, &req).unwrap();
        assert!(parts.contains(&FormPart::Text {
            field: "title".to_string(),
            value: "Movie.Name.2024".to_string(),
        }));
    }

    #[test]
    fn test_mappings_emit_codes() {
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
  quality:
    input_field: resolution
    output_field: type_id
    values:
      "1080p": 3
    default: 5
  language:
    input_field: language
    output_field: lang_ids
    multi: true
    values:
      "multi": [2, 3]
"#;
        let config = load_tracker_config_from_str(doc).unwrap();
        let tracker = tracker_fixture("exm");
        let mut req = request();
        req.extra.insert("resolution".to_string(), "1080p".to_string());
        req.extra.insert("language".to_string(), "multi".to_string());
        let parts = build_form_parts(&config, &tracker, &req).unwrap();

        assert!(parts.contains(&FormPart::Text {
            field: "type_id".to_string(),
            value: "3".to_string(),
        }));
        let langs: Vec<_> = parts
            .iter()
            .filter_map(|p| match p {
                FormPart::Text { field, value } if field == "lang_ids" => Some(value.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(langs, vec!["2", "3"]);
    }

    #[test]
    fn test_path_lookup() {
        let root = json!({"data": {"id": 42, "nested": {"deep": "x"}}});
        assert_eq!(path_lookup(&root, "data.id"), Some(&json!(42)));
        assert_eq!(path_lookup(&root, "data.nested.deep"), Some(&json!("x")));
        assert_eq!(path_lookup(&root, "data.missing"), None);
        // Non-object intermediate segment.
        assert_eq!(path_lookup(&root, "data.id.sub"), None);
    }

    #[test]
    fn test_lookup_defaults() {
        let root = json!({"ok": true});
        assert!(lookup_bool(&root, "ok", false));
        assert!(!lookup_bool(&root, "missing.path", false));
        assert!(lookup_bool(&root, "missing.path", true));
        assert_eq!(lookup_string(&root, "nope"), None);
    }

    #[test]
    fn test_parse_json_hits_shapes() {
        let wrapped = json!({"data": [{"attributes": {"name": "A", "size": 10}}]});
        let hits = parse_json_hits(&wrapped);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "A");
        assert_eq!(hits[0].size, Some(10));

        let flat = json!([{"name": "B"}]);
        assert_eq!(parse_json_hits(&flat).len(), 1);

        assert!(parse_json_hits(&json!({"other": 1})).is_empty());
    }

    #[test]
    fn test_reduce_upload_response() {
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
  success_field: success
  torrent_id_field: data.id
  error_field: message
  torrent_url_template: "https://tracker.example/torrents/{id}"
"#;
        let config = Arc::new(load_tracker_config_from_str(doc).unwrap());
        let adapter = ConfigDrivenAdapter::new(
            tracker_fixture("exm"),
            config,
            &crate::config::HttpConfig::default(),
            None,
        );

        let outcome =
            adapter.reduce_upload_response(r#"{"success": true, "data": {"id": 7}, "message": "ok"}"#);
        assert!(outcome.success);
        assert_eq!(outcome.torrent_id.as_deref(), Some("7"));
        assert_eq!(
            outcome.torrent_url.as_deref(),
            Some("https://tracker.example/torrents/7")
        );

        let failed = adapter.reduce_upload_response("not json");
        assert!(!failed.success);
    }
}
