//! Prometheus metrics for the seedrelay server.
//!
//! HTTP request metrics are recorded by the metrics middleware; queue and
//! entry gauges are collected dynamically before each scrape.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use seedrelay_core::entry::EntryStatus;
use seedrelay_core::queue::QueueStatus;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedrelay_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedrelay_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedrelay_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Queue / Entry Gauges (collected dynamically)
// =============================================================================

/// Worker running state (1 = running, 0 = stopped).
pub static WORKER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedrelay_worker_running",
        "Whether the queue worker is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Queue items by current status.
pub static QUEUE_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("seedrelay_queue_by_status", "Current queue item count by status"),
        &["status"],
    )
    .unwrap()
});

/// File entries by current status.
pub static ENTRIES_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "seedrelay_entries_by_status",
            "Current file entry count by status",
        ),
        &["status"],
    )
    .unwrap()
});

/// Configured trackers (enabled vs disabled).
pub static TRACKERS_CONFIGURED: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("seedrelay_trackers_configured", "Configured trackers"),
        &["enabled"],
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    registry.register(Box::new(WORKER_RUNNING.clone())).unwrap();
    registry
        .register(Box::new(QUEUE_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(ENTRIES_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(TRACKERS_CONFIGURED.clone()))
        .unwrap();

    // Core metrics (queue dispatches, uploads, torrent generation)
    for metric in seedrelay_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic gauges from current application state.
///
/// Called before encoding metrics so gauges reflect the live worker,
/// queue, and entry state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let worker_status = state.worker().status().await;
    WORKER_RUNNING.set(if worker_status.running { 1 } else { 0 });

    for status in [
        QueueStatus::Pending,
        QueueStatus::Processing,
        QueueStatus::Completed,
        QueueStatus::Failed,
        QueueStatus::Cancelled,
    ] {
        if let Ok(items) = state.queue_store().list_by_status(status) {
            QUEUE_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(items.len() as i64);
        }
    }

    for status in [
        EntryStatus::Scanned,
        EntryStatus::Analyzed,
        EntryStatus::PendingApproval,
        EntryStatus::Approved,
        EntryStatus::Prepared,
        EntryStatus::Uploading,
        EntryStatus::Uploaded,
        EntryStatus::Failed,
    ] {
        if let Ok(entries) = state.entry_store().list_by_status(status) {
            ENTRIES_BY_STATUS
                .with_label_values(&[status.as_str()])
                .set(entries.len() as i64);
        }
    }

    if let Ok(trackers) = state.tracker_store().list() {
        let enabled = trackers.iter().filter(|t| t.enabled).count();
        TRACKERS_CONFIGURED
            .with_label_values(&["true"])
            .set(enabled as i64);
        TRACKERS_CONFIGURED
            .with_label_values(&["false"])
            .set((trackers.len() - enabled) as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    let uuid_regex = regex_lite::Regex::new(
        r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
    )
    .unwrap();
    let numeric_regex = regex_lite::Regex::new(r"/\d+(/|$)").unwrap();

    let result = uuid_regex.replace_all(path, "{id}");
    let result = numeric_regex.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/queue/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/queue/{id}");
    }

    #[test]
    fn test_normalize_path_numeric() {
        let path = "/api/v1/trackers/12345";
        assert_eq!(normalize_path(path), "/api/v1/trackers/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("seedrelay_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
