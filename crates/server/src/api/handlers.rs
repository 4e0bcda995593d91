//! Health, config, and metrics handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use seedrelay_core::adapter::HealthStatus;
use seedrelay_core::config::SanitizedConfig;
use seedrelay_core::queue::WorkerStatus;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub worker: WorkerStatus,
    /// tracker slug -> health probe result, for every enabled tracker.
    pub trackers: HashMap<String, HealthStatus>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Aggregated service health: worker state plus a live probe of every
/// enabled tracker. Probes never error; a failed probe degrades to an
/// unreachable status.
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, impl IntoResponse> {
    let worker = state.worker().status().await;

    let trackers = match state.tracker_store().list() {
        Ok(trackers) => trackers,
        Err(e) => {
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ));
        }
    };

    let probes = trackers
        .iter()
        .filter(|t| t.enabled)
        .map(|tracker| async {
            let health = match state.factory().adapter_for(tracker).await {
                Ok(adapter) => adapter.health_check().await,
                Err(_) => HealthStatus::unreachable(),
            };
            (tracker.slug.clone(), health)
        });

    let tracker_health: HashMap<String, HealthStatus> =
        join_all(probes).await.into_iter().collect();

    let status = if worker.running && tracker_health.values().all(|h| h.healthy()) {
        "ok"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        worker,
        trackers: tracker_health,
    }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    collect_dynamic_metrics(&state).await;
    encode_metrics()
}
