//! File entry API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use seedrelay_core::entry::{EntryStatus, FileEntry, FileEntryError};
use seedrelay_core::mapper::ReleaseAttributes;

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for registering a file entry
#[derive(Debug, Deserialize)]
pub struct CreateEntryBody {
    /// Absolute path of the media file
    pub file_path: String,
    /// Release name used for torrents and uploads
    pub release_name: String,
    #[serde(default)]
    pub tmdb_id: Option<u32>,
    #[serde(default)]
    pub tmdb_type: Option<String>,
    /// Category override applied to every tracker
    #[serde(default)]
    pub category_id: Option<u32>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    #[serde(default)]
    pub mediainfo: Option<String>,
    /// Known release attributes; anything missing is detected from the
    /// release name at upload time
    #[serde(default)]
    pub attributes: ReleaseAttributes,
    /// Hold the entry for a manual go-ahead before it can be processed
    #[serde(default)]
    pub require_approval: bool,
}

/// Query parameters for listing entries
#[derive(Debug, Deserialize)]
pub struct ListEntriesParams {
    /// Filter by pipeline status
    pub status: Option<String>,
}

/// Response for listing entries
#[derive(Debug, Serialize)]
pub struct ListEntriesResponse {
    pub entries: Vec<FileEntry>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct EntryErrorResponse {
    pub error: String,
}

fn error_response(e: FileEntryError) -> (StatusCode, Json<EntryErrorResponse>) {
    let status = match &e {
        FileEntryError::NotFound(_) => StatusCode::NOT_FOUND,
        FileEntryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(EntryErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Register a file entry
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateEntryBody>,
) -> Result<(StatusCode, Json<FileEntry>), impl IntoResponse> {
    let mut entry = FileEntry::new(body.file_path, body.release_name);
    entry.tmdb_id = body.tmdb_id;
    entry.tmdb_type = body.tmdb_type;
    entry.category_id = body.category_id;
    entry.tag_ids = body.tag_ids;
    entry.mediainfo = body.mediainfo;
    entry.attributes = body.attributes;
    entry.status = if body.require_approval {
        EntryStatus::PendingApproval
    } else {
        EntryStatus::Prepared
    };

    match state.entry_store().create(&entry) {
        Ok(()) => Ok((StatusCode::CREATED, Json(entry))),
        Err(e) => Err(error_response(e)),
    }
}

/// List file entries, optionally filtered by status
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListEntriesParams>,
) -> Result<Json<ListEntriesResponse>, impl IntoResponse> {
    let result = match &params.status {
        Some(raw) => match EntryStatus::parse(raw) {
            Some(status) => state.entry_store().list_by_status(status),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(EntryErrorResponse {
                        error: format!("Unknown entry status: {}", raw),
                    }),
                ));
            }
        },
        None => state.entry_store().list(),
    };

    match result {
        Ok(entries) => Ok(Json(ListEntriesResponse {
            total: entries.len(),
            entries,
        })),
        Err(e) => Err(error_response(e)),
    }
}

/// Get a file entry by ID
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileEntry>, impl IntoResponse> {
    match state.entry_store().get(&id) {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(EntryErrorResponse {
                error: format!("File entry not found: {}", id),
            }),
        )),
        Err(e) => Err(error_response(e)),
    }
}
