//! Tracker API handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use seedrelay_core::adapter::HealthStatus;
use seedrelay_core::tracker::{
    AdapterKind, CategoryRule, CreateTrackerRequest, PieceSizeStrategy, Tracker, TrackerStoreError,
};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Tracker representation with credentials redacted.
///
/// Passkeys and API keys are never serialized to API responses; only their
/// presence is reported.
#[derive(Debug, Serialize)]
pub struct TrackerResponse {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub base_url: String,
    pub has_passkey: bool,
    pub has_api_key: bool,
    pub source_flag: String,
    pub piece_strategy: PieceSizeStrategy,
    pub adapter_kind: AdapterKind,
    pub default_category_id: Option<u32>,
    pub default_subcategory_id: Option<u32>,
    pub category_mapping: Vec<CategoryRule>,
    pub enabled: bool,
    pub upload_enabled: bool,
    pub priority: u16,
    pub requires_cloudflare_bypass: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Tracker> for TrackerResponse {
    fn from(tracker: Tracker) -> Self {
        Self {
            id: tracker.id,
            name: tracker.name,
            slug: tracker.slug,
            base_url: tracker.base_url,
            has_passkey: tracker.passkey.is_some_and(|p| !p.is_empty()),
            has_api_key: tracker.api_key.is_some_and(|k| !k.is_empty()),
            source_flag: tracker.source_flag,
            piece_strategy: tracker.piece_strategy,
            adapter_kind: tracker.adapter_kind,
            default_category_id: tracker.default_category_id,
            default_subcategory_id: tracker.default_subcategory_id,
            category_mapping: tracker.category_mapping,
            enabled: tracker.enabled,
            upload_enabled: tracker.upload_enabled,
            priority: tracker.priority,
            requires_cloudflare_bypass: tracker.requires_cloudflare_bypass,
            created_at: tracker.created_at,
            updated_at: tracker.updated_at,
        }
    }
}

/// Request body for toggling the enabled flag
#[derive(Debug, Deserialize)]
pub struct SetEnabledBody {
    pub enabled: bool,
}

/// Response for listing trackers
#[derive(Debug, Serialize)]
pub struct ListTrackersResponse {
    pub trackers: Vec<TrackerResponse>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct TrackerErrorResponse {
    pub error: String,
}

fn error_response(e: TrackerStoreError) -> (StatusCode, Json<TrackerErrorResponse>) {
    let status = match &e {
        TrackerStoreError::NotFound(_) => StatusCode::NOT_FOUND,
        TrackerStoreError::DuplicateSlug(_) => StatusCode::CONFLICT,
        TrackerStoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(TrackerErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// List all trackers ordered by priority
pub async fn list_trackers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListTrackersResponse>, impl IntoResponse> {
    match state.tracker_store().list() {
        Ok(trackers) => Ok(Json(ListTrackersResponse {
            total: trackers.len(),
            trackers: trackers.into_iter().map(TrackerResponse::from).collect(),
        })),
        Err(e) => Err(error_response(e)),
    }
}

/// Register a new tracker
pub async fn create_tracker(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTrackerRequest>,
) -> Result<(StatusCode, Json<TrackerResponse>), impl IntoResponse> {
    match state.tracker_store().create(request) {
        Ok(tracker) => Ok((StatusCode::CREATED, Json(TrackerResponse::from(tracker)))),
        Err(e) => Err(error_response(e)),
    }
}

/// Get a tracker by ID
pub async fn get_tracker(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrackerResponse>, impl IntoResponse> {
    match state.tracker_store().get(&id) {
        Ok(Some(tracker)) => Ok(Json(TrackerResponse::from(tracker))),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(TrackerErrorResponse {
                error: format!("Tracker not found: {}", id),
            }),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Toggle a tracker's enabled flag
pub async fn set_enabled(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SetEnabledBody>,
) -> Result<Json<TrackerResponse>, impl IntoResponse> {
    if let Err(e) = state.tracker_store().set_enabled(&id, body.enabled) {
        return Err(error_response(e));
    }

    // Drop any cached adapter so the next use sees the new flag.
    state.factory().invalidate(&id).await;

    match state.tracker_store().get(&id) {
        Ok(Some(tracker)) => Ok(Json(TrackerResponse::from(tracker))),
        Ok(None) => Err(error_response(TrackerStoreError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

/// Probe one tracker's health
pub async fn tracker_health(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HealthStatus>, impl IntoResponse> {
    let tracker = match state.tracker_store().get(&id) {
        Ok(Some(tracker)) => tracker,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(TrackerErrorResponse {
                    error: format!("Tracker not found: {}", id),
                }),
            ));
        }
        Err(e) => return Err(error_response(e)),
    };

    let health = match state.factory().adapter_for(&tracker).await {
        Ok(adapter) => adapter.health_check().await,
        Err(_) => HealthStatus::unreachable(),
    };

    Ok(Json(health))
}
