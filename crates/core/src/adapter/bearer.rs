//! Bearer-token adapter for JSON-API trackers.
//!
//! Serves the tracker family with a REST-ish API: an API token in the
//! `Authorization` header, multipart upload, and JSON search/category
//! endpoints. These trackers have no tag concept.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::tracker::{AdapterKind, Tracker};

use super::types::{
    derive_name_query, AdapterInfo, DuplicateQuery, DuplicateResult, ExistingTorrent,
    HealthStatus, SearchMethod, TrackerCategory, TrackerError, TrackerTag, UploadOutcome,
    UploadRequest,
};
use super::TrackerAdapter;

pub struct BearerTokenAdapter {
    tracker: Tracker,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct ApiUploadResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCategory {
    id: i64,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    data: Vec<ApiSearchHit>,
}

#[derive(Debug, Deserialize)]
struct ApiSearchHit {
    attributes: ApiSearchAttributes,
}

#[derive(Debug, Deserialize)]
struct ApiSearchAttributes {
    name: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    details_link: Option<String>,
}

impl BearerTokenAdapter {
    pub fn new(tracker: Tracker, http: &HttpConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { tracker, client }
    }

    fn base_url(&self) -> &str {
        self.tracker.base_url.trim_end_matches('/')
    }

    fn token(&self) -> Result<&str, TrackerError> {
        let token = self.tracker.api_key.as_deref().unwrap_or_default().trim();
        if token.is_empty() {
            return Err(TrackerError::Auth("API token not configured".to_string()));
        }
        Ok(token)
    }

    fn map_auth_status(status: StatusCode) -> Option<TrackerError> {
        match status.as_u16() {
            401 => Some(TrackerError::Auth("Token rejected".to_string())),
            403 => Some(TrackerError::Auth("Token lacks permission".to_string())),
            _ => None,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<T, TrackerError> {
        let token = self.token()?;
        let url = format!("{}{}", self.base_url(), endpoint);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        if let Some(e) = Self::map_auth_status(status) {
            return Err(e);
        }
        if !status.is_success() {
            return Err(TrackerError::Api(format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| TrackerError::Api(format!("Failed to parse response: {}", e)))
    }

    async fn search(
        &self,
        query_param: &str,
        value: &str,
        file_size: Option<u64>,
        method: SearchMethod,
    ) -> Result<Option<DuplicateResult>, TrackerError> {
        let endpoint = format!(
            "/api/torrents/filter?{}={}",
            query_param,
            urlencoding::encode(value)
        );
        let parsed: ApiSearchResponse = self.get_json(&endpoint).await?;

        if parsed.data.is_empty() {
            return Ok(None);
        }

        let hits = parsed
            .data
            .into_iter()
            .map(|hit| ExistingTorrent {
                title: hit.attributes.name,
                link: hit.attributes.details_link,
                guid: None,
                size: hit.attributes.size,
                exact_match: false,
            })
            .collect();

        Ok(Some(DuplicateResult::from_hits(hits, method, file_size)))
    }
}

#[async_trait]
impl TrackerAdapter for BearerTokenAdapter {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            kind: AdapterKind::BearerToken,
            tracker_slug: self.tracker.slug.clone(),
            supports_tags: false,
            supports_categories: true,
            supports_search: true,
        }
    }

    async fn authenticate(&self) -> Result<bool, TrackerError> {
        let _: serde_json::Value = self.get_json("/api/categories").await?;
        debug!(tracker = %self.tracker.slug, "Token probe succeeded");
        Ok(true)
    }

    async fn upload_torrent(&self, request: &UploadRequest) -> Result<UploadOutcome, TrackerError> {
        let token = self.token()?.to_string();

        let category_id = request
            .category_id
            .or(self.tracker.default_category_id)
            .ok_or_else(|| TrackerError::MissingField("category_id".to_string()))?;

        let torrent_part = multipart::Part::bytes(request.torrent_bytes.clone())
            .file_name("torrent.torrent")
            .mime_str("application/x-bittorrent")
            .map_err(|e| TrackerError::Api(e.to_string()))?;

        let mut form = multipart::Form::new()
            .part("torrent", torrent_part)
            .text("name", request.release_name.clone())
            .text("category_id", category_id.to_string());

        if let Some(subcategory_id) = request.subcategory_id.or(self.tracker.default_subcategory_id)
        {
            form = form.text("type_id", subcategory_id.to_string());
        }
        if let Some(description) = &request.description {
            form = form.text("description", description.clone());
        }
        if let Some(tmdb_id) = request.tmdb_id {
            form = form.text("tmdb", tmdb_id.to_string());
        }

        let url = format!("{}/api/torrents/upload", self.base_url());
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        if let Some(e) = Self::map_auth_status(status) {
            return Err(e);
        }

        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TrackerError::Api(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ApiUploadResponse = serde_json::from_str(&body)
            .map_err(|e| TrackerError::Api(format!("Failed to parse response: {}", e)))?;

        let torrent_id = parsed
            .data
            .as_ref()
            .and_then(|d| d.get("id"))
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            });

        let torrent_url = torrent_id
            .as_ref()
            .map(|id| format!("{}/torrents/{}", self.base_url(), id));

        Ok(UploadOutcome {
            success: parsed.success,
            torrent_id,
            torrent_url,
            message: parsed.message,
            raw_response: Some(body),
        })
    }

    async fn validate_credentials(&self) -> Result<bool, TrackerError> {
        if self.token().is_err() {
            return Ok(false);
        }
        match self.authenticate().await {
            Ok(valid) => Ok(valid),
            Err(TrackerError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError> {
        // This tracker family has no tags.
        Ok(vec![])
    }

    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError> {
        let categories: Vec<ApiCategory> = self.get_json("/api/categories").await?;
        Ok(categories
            .into_iter()
            .map(|c| TrackerCategory {
                id: c.id,
                label: c.name,
                description: c.description,
            })
            .collect())
    }

    async fn check_duplicate(
        &self,
        query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError> {
        if let Some(tmdb_id) = query.tmdb_id {
            if let Some(result) = self
                .search("tmdbId", &tmdb_id.to_string(), query.file_size, SearchMethod::Tmdb)
                .await?
            {
                return Ok(result);
            }
        }

        if let Some(imdb_id) = &query.imdb_id {
            if let Some(result) = self
                .search("imdbId", imdb_id, query.file_size, SearchMethod::Imdb)
                .await?
            {
                return Ok(result);
            }
        }

        if let Some(release_name) = &query.release_name {
            let title = derive_name_query(release_name);
            if !title.is_empty() {
                if let Some(result) = self
                    .search("name", &title, query.file_size, SearchMethod::Name)
                    .await?
                {
                    return Ok(result);
                }
            }
        }

        Ok(DuplicateResult::no_hits(SearchMethod::None))
    }

    async fn health_check(&self) -> HealthStatus {
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
            bypass_available: None,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::testing::tracker_fixture;

    fn adapter_with_token(token: Option<&str>) -> BearerTokenAdapter {
        let mut tracker = tracker_fixture("btk");
        tracker.api_key = token.map(|t| t.to_string());
        BearerTokenAdapter::new(tracker, &HttpConfig::default())
    }

    #[test]
    fn test_token_required() {
        assert!(adapter_with_token(Some("tok_abc")).token().is_ok());
        assert!(adapter_with_token(Some("  ")).token().is_err());
        assert!(adapter_with_token(None).token().is_err());
    }

    #[tokio::test]
    async fn test_validate_credentials_missing_token_returns_false() {
        let adapter = adapter_with_token(None);
        assert!(!adapter.validate_credentials().await.unwrap());
    }

    #[tokio::test]
    async fn test_tags_always_empty() {
        let adapter = adapter_with_token(Some("tok"));
        assert!(adapter.get_tags().await.unwrap().is_empty());
    }

    #[test]
    fn test_search_response_parse() {
        let raw = r#"{
            "data": [
                {"attributes": {"name": "Movie.2024.1080p", "size": 4200, "details_link": "https://t/1"}}
            ]
        }"#;
        let parsed: ApiSearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 1);
        assert_eq!(parsed.data[0].attributes.name, "Movie.2024.1080p");
        assert_eq!(parsed.data[0].attributes.size, Some(4200));
    }

    #[test]
    fn test_upload_response_parse() {
        let raw = r#"{"success": true, "data": {"id": 99}, "message": "Uploaded"}"#;
        let parsed: ApiUploadResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("Uploaded"));
    }
}
