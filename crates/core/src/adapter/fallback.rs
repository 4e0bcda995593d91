//! Fallback adapter for trackers with no usable upload API.
//!
//! Such trackers still get torrents generated with their announce URL and
//! source flag; the upload itself is manual. The adapter exists so the
//! rest of the system can treat every tracker uniformly.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use tracing::warn;

use crate::config::HttpConfig;
use crate::tracker::{AdapterKind, Tracker};

use super::passkey::MIN_PASSKEY_LEN;
use super::types::{
    AdapterInfo, DuplicateQuery, DuplicateResult, HealthStatus, SearchMethod, TrackerCategory,
    TrackerError, TrackerTag, UploadOutcome, UploadRequest,
};
use super::TrackerAdapter;

pub struct FallbackAdapter {
    tracker: Tracker,
    client: Client,
}

impl FallbackAdapter {
    pub fn new(tracker: Tracker, http: &HttpConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(http.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self { tracker, client }
    }

    fn passkey_plausible(&self) -> bool {
        self.tracker
            .passkey
            .as_deref()
            .is_some_and(|p| p.trim().len() >= MIN_PASSKEY_LEN)
    }
}

#[async_trait]
impl TrackerAdapter for FallbackAdapter {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            kind: AdapterKind::Fallback,
            tracker_slug: self.tracker.slug.clone(),
            supports_tags: false,
            supports_categories: false,
            supports_search: false,
        }
    }

    async fn authenticate(&self) -> Result<bool, TrackerError> {
        Ok(self.passkey_plausible())
    }

    async fn upload_torrent(&self, _request: &UploadRequest) -> Result<UploadOutcome, TrackerError> {
        Err(TrackerError::Api(format!(
            "Tracker '{}' has no upload API; upload the generated torrent manually",
            self.tracker.slug
        )))
    }

    async fn validate_credentials(&self) -> Result<bool, TrackerError> {
        Ok(self.passkey_plausible())
    }

    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError> {
        Ok(vec![])
    }

    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError> {
        Ok(vec![])
    }

    async fn check_duplicate(
        &self,
        _query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError> {
        let mut result = DuplicateResult::no_hits(SearchMethod::None);
        result.message = Some("Tracker has no search API".to_string());
        Ok(result)
    }

    async fn health_check(&self) -> HealthStatus {
        let url = self.tracker.base_url.trim_end_matches('/').to_string();
        let reachable = match self.client.get(&url).send().await {
            Ok(response) => !response.status().is_server_error(),
            Err(e) => {
                warn!(tracker = %self.tracker.slug, error = %e, "Base URL unreachable");
                false
            }
        };

        HealthStatus {
            tracker_reachable: reachable,
            credentials_valid: self.passkey_plausible(),
            bypass_available: None,
            checked_at: Utc::now(),
        }
    }
}
