//! Passkey-authenticated adapter for Cloudflare-fronted trackers.
//!
//! The tracker family this serves authenticates every request with a
//! passkey query parameter, fronts its site with a Cloudflare challenge,
//! and exposes search over Torznab.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client, RequestBuilder};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::tracker::{AdapterKind, Tracker};

use super::cloudflare::CloudflareBypassClient;
use super::torznab::parse_torznab_results;
use super::types::{
    derive_name_query, AdapterInfo, DuplicateQuery, DuplicateResult, HealthStatus, SearchMethod,
    TrackerCategory, TrackerError, TrackerTag, UploadOutcome, UploadRequest,
};
use super::TrackerAdapter;

/// Minimum length a plausible passkey has.
pub(crate) const MIN_PASSKEY_LEN: usize = 10;

pub struct PasskeyCloudflareAdapter {
    tracker: Tracker,
    client: Client,
    bypass: Option<Arc<CloudflareBypassClient>>,
}

impl PasskeyCloudflareAdapter {
    pub fn new(
        tracker: Tracker,
        http: &HttpConfig,
        bypass: Option<Arc<CloudflareBypassClient>>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            tracker,
            client,
            bypass,
        }
    }

    fn base_url(&self) -> &str {
        self.tracker.base_url.trim_end_matches('/')
    }

    fn passkey(&self) -> Result<&str, TrackerError> {
        let passkey = self
            .tracker
            .passkey
            .as_deref()
            .unwrap_or_default()
            .trim();
        if passkey.len() < MIN_PASSKEY_LEN {
            return Err(TrackerError::Auth("Passkey missing or too short".to_string()));
        }
        Ok(passkey)
    }

    /// Attach the bypass session (cookies + user agent) when the tracker
    /// needs one.
    async fn with_bypass(&self, builder: RequestBuilder) -> Result<RequestBuilder, TrackerError> {
        let Some(bypass) = &self.bypass else {
            return Ok(builder);
        };
        let session = bypass.session_for(self.base_url()).await?;
        Ok(builder
            .header(reqwest::header::COOKIE, session.cookie_header)
            .header(reqwest::header::USER_AGENT, session.user_agent))
    }

    async fn search(&self, params: &[(&str, String)]) -> Result<String, TrackerError> {
        let passkey = self.passkey()?;
        let mut url = format!("{}/api?passkey={}", self.base_url(), passkey);
        for (key, value) in params {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }

        let builder = self.with_bypass(self.client.get(&url)).await?;
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
}

#[async_trait]
impl TrackerAdapter for PasskeyCloudflareAdapter {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            kind: AdapterKind::PasskeyCloudflare,
            tracker_slug: self.tracker.slug.clone(),
            supports_tags: false,
            supports_categories: true,
            supports_search: true,
        }
    }

    async fn authenticate(&self) -> Result<bool, TrackerError> {
        let passkey = self.passkey()?;

        // Lightweight probe: a capabilities request validates the passkey
        // without side effects.
        let url = format!("{}/api?t=caps&passkey={}", self.base_url(), passkey);
        let builder = self.with_bypass(self.client.get(&url)).await?;
        let response = builder.send().await.map_err(TrackerError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(TrackerError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            return Err(TrackerError::Api(format!("HTTP {}", status)));
        }

        debug!(tracker = %self.tracker.slug, "Passkey probe succeeded");
        Ok(true)
    }

    async fn upload_torrent(&self, request: &UploadRequest) -> Result<UploadOutcome, TrackerError> {
        let passkey = self.passkey()?.to_string();

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
            .text("passkey", passkey)
            .text("category", category_id.to_string());

        if let Some(nfo) = &request.nfo_bytes {
            let nfo_part = multipart::Part::bytes(nfo.clone())
                .file_name(format!("{}.nfo", request.release_name))
                .mime_str("text/plain")
                .map_err(|e| TrackerError::Api(e.to_string()))?;
            form = form.part("nfo", nfo_part);
        }
        if let Some(description) = &request.description {
            form = form.text("description", description.clone());
        }

        let url = format!("{}/upload.php", self.base_url());
        let builder = self.with_bypass(self.client.post(&url)).await?;
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

        Ok(UploadOutcome {
            success: true,
            torrent_id: None,
            torrent_url: None,
            message: None,
            raw_response: Some(body),
        })
    }

    async fn validate_credentials(&self) -> Result<bool, TrackerError> {
        if self.passkey().is_err() {
            return Ok(false);
        }
        match self.authenticate().await {
            Ok(valid) => Ok(valid),
            Err(TrackerError::Auth(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError> {
        // Tags are not a concept this tracker family has.
        Ok(vec![])
    }

    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError> {
        Ok(self
            .tracker
            .category_mapping
            .iter()
            .map(|rule| TrackerCategory {
                id: i64::from(rule.category_id),
                label: match &rule.resolution {
                    Some(res) => format!("{:?} {}", rule.media_type, res),
                    None => format!("{:?}", rule.media_type),
                },
                description: None,
            })
            .collect())
    }

    async fn check_duplicate(
        &self,
        query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError> {
        if let Some(tmdb_id) = query.tmdb_id {
            let body = self
                .search(&[("t", "movie".to_string()), ("tmdbid", tmdb_id.to_string())])
                .await?;
            let hits = parse_torznab_results(&body);
            if !hits.is_empty() {
                return Ok(DuplicateResult::from_hits(hits, SearchMethod::Tmdb, query.file_size));
            }
        }

        if let Some(imdb_id) = &query.imdb_id {
            let body = self
                .search(&[("t", "movie".to_string()), ("imdbid", imdb_id.clone())])
                .await?;
            let hits = parse_torznab_results(&body);
            if !hits.is_empty() {
                return Ok(DuplicateResult::from_hits(hits, SearchMethod::Imdb, query.file_size));
            }
        }

        if let Some(release_name) = &query.release_name {
            let title = derive_name_query(release_name);
            if !title.is_empty() {
                let body = self
                    .search(&[("t", "search".to_string()), ("q", title)])
                    .await?;
                let hits = parse_torznab_results(&body);
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
        let bypass_available = match &self.bypass {
            Some(bypass) => Some(bypass.is_available().await),
            None => None,
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
