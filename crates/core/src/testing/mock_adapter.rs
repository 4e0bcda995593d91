//! Mock tracker adapter for testing.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::adapter::{
    AdapterInfo, DuplicateQuery, DuplicateResult, HealthStatus, SearchMethod, TrackerAdapter,
    TrackerCategory, TrackerError, TrackerTag, UploadOutcome, UploadRequest,
};
use crate::tracker::AdapterKind;

/// A recorded upload for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub release_name: String,
    pub category_id: Option<u32>,
    pub torrent_len: usize,
}

/// Mock implementation of the TrackerAdapter trait.
///
/// Provides controllable behavior for testing:
/// - Return a configurable upload outcome or error
/// - Return a configurable duplicate-check result
/// - Track upload requests for assertions
pub struct MockTrackerAdapter {
    slug: String,
    upload_outcome: Arc<RwLock<Result<UploadOutcome, String>>>,
    duplicate_result: Arc<RwLock<DuplicateResult>>,
    /// When set, uploads fail with this retryable error instead.
    retryable_failure: Arc<RwLock<Option<String>>>,
    uploads: Arc<RwLock<Vec<RecordedUpload>>>,
    credentials_valid: Arc<RwLock<bool>>,
}

impl MockTrackerAdapter {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            upload_outcome: Arc::new(RwLock::new(Ok(UploadOutcome {
                success: true,
                torrent_id: Some("1".to_string()),
                torrent_url: None,
                message: None,
                raw_response: None,
            }))),
            duplicate_result: Arc::new(RwLock::new(DuplicateResult::no_hits(SearchMethod::None))),
            retryable_failure: Arc::new(RwLock::new(None)),
            uploads: Arc::new(RwLock::new(Vec::new())),
            credentials_valid: Arc::new(RwLock::new(true)),
        }
    }

    /// Configure the outcome returned by subsequent uploads.
    pub async fn set_upload_outcome(&self, outcome: UploadOutcome) {
        *self.upload_outcome.write().await = Ok(outcome);
    }

    /// Make subsequent uploads fail with a non-retryable API error.
    pub async fn set_upload_error(&self, message: &str) {
        *self.upload_outcome.write().await = Err(message.to_string());
    }

    /// Make subsequent uploads fail with a retryable connection error.
    pub async fn set_retryable_failure(&self, message: &str) {
        *self.retryable_failure.write().await = Some(message.to_string());
    }

    /// Configure the result returned by subsequent duplicate checks.
    pub async fn set_duplicate_result(&self, result: DuplicateResult) {
        *self.duplicate_result.write().await = result;
    }

    pub async fn set_credentials_valid(&self, valid: bool) {
        *self.credentials_valid.write().await = valid;
    }

    /// Uploads recorded so far.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.read().await.clone()
    }
}

#[async_trait]
impl TrackerAdapter for MockTrackerAdapter {
    fn adapter_info(&self) -> AdapterInfo {
        AdapterInfo {
            kind: AdapterKind::Fallback,
            tracker_slug: self.slug.clone(),
            supports_tags: false,
            supports_categories: true,
            supports_search: true,
        }
    }

    async fn authenticate(&self) -> Result<bool, TrackerError> {
        Ok(*self.credentials_valid.read().await)
    }

    async fn upload_torrent(&self, request: &UploadRequest) -> Result<UploadOutcome, TrackerError> {
        self.uploads.write().await.push(RecordedUpload {
            release_name: request.release_name.clone(),
            category_id: request.category_id,
            torrent_len: request.torrent_bytes.len(),
        });

        if let Some(message) = self.retryable_failure.read().await.as_ref() {
            return Err(TrackerError::ConnectionFailed(message.clone()));
        }
        match &*self.upload_outcome.read().await {
            Ok(outcome) => Ok(outcome.clone()),
            Err(message) => Err(TrackerError::Api(message.clone())),
        }
    }

    async fn validate_credentials(&self) -> Result<bool, TrackerError> {
        Ok(*self.credentials_valid.read().await)
    }

    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError> {
        Ok(vec![])
    }

    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError> {
        Ok(vec![TrackerCategory {
            id: 1,
            label: "Movies".to_string(),
            description: None,
        }])
    }

    async fn check_duplicate(
        &self,
        _query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError> {
        Ok(self.duplicate_result.read().await.clone())
    }

    async fn health_check(&self) -> HealthStatus {
        HealthStatus {
            tracker_reachable: true,
            credentials_valid: *self.credentials_valid.read().await,
            bypass_available: None,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_uploads() {
        let adapter = MockTrackerAdapter::new("exm");
        let request = UploadRequest {
            release_name: "Movie.2024.1080p-GRP".to_string(),
            torrent_bytes: vec![0u8; 64],
            category_id: Some(1),
            ..Default::default()
        };
        adapter.upload_torrent(&request).await.unwrap();

        let uploads = adapter.recorded_uploads().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].release_name, "Movie.2024.1080p-GRP");
        assert_eq!(uploads[0].torrent_len, 64);
    }

    #[tokio::test]
    async fn test_retryable_failure_classification() {
        let adapter = MockTrackerAdapter::new("exm");
        adapter.set_retryable_failure("connection reset").await;

        let err = adapter
            .upload_torrent(&UploadRequest::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }
}
