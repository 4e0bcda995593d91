//! The tracker adapter contract.

use async_trait::async_trait;

use super::types::{
    AdapterInfo, DuplicateQuery, DuplicateResult, HealthStatus, TrackerCategory, TrackerError,
    TrackerTag, UploadOutcome, UploadRequest,
};

/// One tracker's upload API, behind a uniform capability set.
///
/// Adapters are stateless from the caller's perspective; any session or
/// cookie state they hold is internal and refreshed as needed. Retryable
/// errors propagate to the queue worker, which owns the retry decision.
#[async_trait]
pub trait TrackerAdapter: Send + Sync {
    /// Static description of this adapter instance.
    fn adapter_info(&self) -> AdapterInfo;

    /// Establish or validate a session. Returns `Ok(false)` when the
    /// credentials are malformed, errors on network or bypass failures.
    async fn authenticate(&self) -> Result<bool, TrackerError>;

    /// Upload a torrent. Re-authenticates automatically when needed and
    /// fails fast on a missing required field, never silently omitting it.
    async fn upload_torrent(&self, request: &UploadRequest) -> Result<UploadOutcome, TrackerError>;

    /// Lightweight credential check with no upload side effects.
    /// Malformed credentials return `Ok(false)`; unreachable networks error.
    async fn validate_credentials(&self) -> Result<bool, TrackerError>;

    /// Fetch the tracker's tags. Adapters without the concept return an
    /// empty list.
    async fn get_tags(&self) -> Result<Vec<TrackerTag>, TrackerError>;

    /// Fetch the tracker's categories. Adapters without the concept return
    /// an empty list.
    async fn get_categories(&self) -> Result<Vec<TrackerCategory>, TrackerError>;

    /// Search for an existing release: TMDB id first, then IMDB id, then a
    /// title query derived from the release name.
    async fn check_duplicate(
        &self,
        query: &DuplicateQuery,
    ) -> Result<DuplicateResult, TrackerError>;

    /// Aggregate health probe. Infallible; failures degrade the returned
    /// booleans.
    async fn health_check(&self) -> HealthStatus;
}
