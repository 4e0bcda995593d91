//! Queue API handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use seedrelay_core::queue::{QueueError, QueueItem, QueuePriority, QueueStatus};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for enqueueing a file entry
#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    /// File entry to process
    pub file_entry_id: String,
    /// Dispatch priority, defaults to normal
    pub priority: Option<QueuePriority>,
    /// Process even when the entry is awaiting approval
    #[serde(default)]
    pub skip_approval: bool,
}

/// Query parameters for listing queue items
#[derive(Debug, Deserialize)]
pub struct ListItemsParams {
    /// Filter by status
    pub status: Option<String>,
}

/// Response for listing queue items
#[derive(Debug, Serialize)]
pub struct ListItemsResponse {
    pub items: Vec<QueueItem>,
    pub total: usize,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct QueueErrorResponse {
    pub error: String,
}

fn error_response(e: QueueError) -> (StatusCode, Json<QueueErrorResponse>) {
    let status = match &e {
        QueueError::NotFound(_) => StatusCode::NOT_FOUND,
        QueueError::InvalidState(_) => StatusCode::CONFLICT,
        QueueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(QueueErrorResponse {
            error: e.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Enqueue a file entry for processing
pub async fn enqueue(
    State(state): State<Arc<AppState>>,
    Json(body): Json<EnqueueBody>,
) -> Result<(StatusCode, Json<QueueItem>), impl IntoResponse> {
    // Reject unknown entries up front; the worker would only discover the
    // missing row at dispatch time.
    match state.entry_store().get(&body.file_entry_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(QueueErrorResponse {
                    error: format!("File entry not found: {}", body.file_entry_id),
                }),
            ));
        }
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(QueueErrorResponse {
                    error: e.to_string(),
                }),
            ));
        }
    }

    let priority = body.priority.unwrap_or(QueuePriority::Normal);
    let max_attempts = state.config().queue.max_attempts;

    match state
        .queue_store()
        .enqueue(&body.file_entry_id, priority, body.skip_approval, max_attempts)
    {
        Ok(item) => Ok((StatusCode::CREATED, Json(item))),
        Err(e) => Err(error_response(e)),
    }
}

/// List queue items, optionally filtered by status
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListItemsParams>,
) -> Result<Json<ListItemsResponse>, impl IntoResponse> {
    let result = match &params.status {
        Some(raw) => match QueueStatus::parse(raw) {
            Some(status) => state.queue_store().list_by_status(status),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(QueueErrorResponse {
                        error: format!("Unknown queue status: {}", raw),
                    }),
                ));
            }
        },
        None => state.queue_store().list(),
    };

    match result {
        Ok(items) => Ok(Json(ListItemsResponse {
            total: items.len(),
            items,
        })),
        Err(e) => Err(error_response(e)),
    }
}

/// Get a queue item by ID
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QueueItem>, impl IntoResponse> {
    match state.queue_store().get(&id) {
        Ok(Some(item)) => Ok(Json(item)),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(QueueErrorResponse {
                error: format!("Queue item not found: {}", id),
            }),
        )),
        Err(e) => Err(error_response(e)),
    }
}

/// Cancel a pending queue item (DELETE endpoint)
pub async fn cancel_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QueueItem>, impl IntoResponse> {
    if let Err(e) = state.queue_store().cancel(&id) {
        return Err(error_response(e));
    }

    match state.queue_store().get(&id) {
        Ok(Some(item)) => Ok(Json(item)),
        Ok(None) => Err(error_response(QueueError::NotFound(id))),
        Err(e) => Err(error_response(e)),
    }
}

/// Re-queue a failed or cancelled item with a fresh attempt budget
pub async fn retry_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QueueItem>, impl IntoResponse> {
    match state.queue_store().retry(&id) {
        Ok(item) => Ok(Json(item)),
        Err(e) => Err(error_response(e)),
    }
}
