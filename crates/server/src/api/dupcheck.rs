//! Duplicate-check API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use seedrelay_core::adapter::DuplicateQuery;
use seedrelay_core::dupcheck::DuplicateSummary;

use crate::state::AppState;

/// Request body for a duplicate check
#[derive(Debug, Deserialize)]
pub struct DupcheckBody {
    /// File entry to check
    pub file_entry_id: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct DupcheckErrorResponse {
    pub error: String,
}

/// Run a duplicate check for one entry across every enabled tracker.
///
/// The resulting summary is stored on the entry and returned. Tracker
/// failures degrade to no-hit results; they never fail the request.
pub async fn check_entry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DupcheckBody>,
) -> Result<Json<DuplicateSummary>, impl IntoResponse> {
    let mut entry = match state.entry_store().get(&body.file_entry_id) {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(DupcheckErrorResponse {
                    error: format!("File entry not found: {}", body.file_entry_id),
                }),
            ));
        }
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DupcheckErrorResponse {
                    error: e.to_string(),
                }),
            ));
        }
    };

    let trackers = match state.tracker_store().list() {
        Ok(trackers) => trackers,
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DupcheckErrorResponse {
                    error: e.to_string(),
                }),
            ));
        }
    };

    let file_size = tokio::fs::metadata(&entry.file_path)
        .await
        .ok()
        .map(|m| m.len());

    let query = DuplicateQuery {
        tmdb_id: entry.tmdb_id,
        imdb_id: None,
        release_name: Some(entry.release_name.clone()),
        quality: entry.attributes.resolution.clone(),
        file_size,
    };

    let summary = state.dupcheck().check_all(&trackers, &query).await;

    entry.duplicate_summary = Some(summary.clone());
    if let Err(e) = state.entry_store().update(&entry) {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(DupcheckErrorResponse {
                error: e.to_string(),
            }),
        ));
    }

    Ok(Json(summary))
}
