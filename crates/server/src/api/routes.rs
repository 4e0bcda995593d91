use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{dupcheck, entries, handlers, middleware, queue, trackers};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Queue
        .route("/queue", post(queue::enqueue))
        .route("/queue", get(queue::list_items))
        .route("/queue/{id}", get(queue::get_item))
        .route("/queue/{id}", delete(queue::cancel_item))
        .route("/queue/{id}/retry", post(queue::retry_item))
        // File entries
        .route("/entries", post(entries::create_entry))
        .route("/entries", get(entries::list_entries))
        .route("/entries/{id}", get(entries::get_entry))
        // Trackers
        .route("/trackers", get(trackers::list_trackers))
        .route("/trackers", post(trackers::create_tracker))
        .route("/trackers/{id}", get(trackers::get_tracker))
        .route("/trackers/{id}/enable", post(trackers::set_enabled))
        .route("/trackers/{id}/health", get(trackers::tracker_health))
        // Duplicate checks
        .route("/dupcheck", post(dupcheck::check_entry))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(axum_middleware::from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
