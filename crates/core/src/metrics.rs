//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Queue (dispatches, outcomes, depth)
//! - Uploads (per-tracker attempts, durations)
//! - Torrent generation and duplicate checks

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Queue Metrics
// =============================================================================

/// Queue dispatches total by outcome.
pub static QUEUE_DISPATCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedrelay_queue_dispatches_total", "Total queue dispatches"),
        &["outcome"], // "completed", "retried", "failed"
    )
    .unwrap()
});

/// Items currently being processed.
pub static QUEUE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "seedrelay_queue_active",
        "Queue items currently being processed",
    )
    .unwrap()
});

/// Completed items removed by TTL cleanup.
pub static QUEUE_CLEANED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "seedrelay_queue_cleaned_total",
        "Completed queue items removed by TTL cleanup",
    )
    .unwrap()
});

/// Processing duration per queue item.
pub static QUEUE_PROCESS_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedrelay_queue_process_duration_seconds",
            "Duration of queue item processing",
        )
        .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 900.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// Upload attempts total by tracker and result.
pub static UPLOAD_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedrelay_upload_attempts_total", "Total upload attempts"),
        &["tracker", "result"], // result: "success", "rejected", "error", "skipped"
    )
    .unwrap()
});

/// Upload request duration per tracker.
pub static UPLOAD_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "seedrelay_upload_duration_seconds",
            "Duration of tracker upload requests",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["tracker"],
    )
    .unwrap()
});

// =============================================================================
// Torrent Generation Metrics
// =============================================================================

/// Torrents generated total by result.
pub static TORRENTS_GENERATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedrelay_torrents_generated_total", "Total torrents generated"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Torrent hashing duration.
pub static TORRENT_HASH_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "seedrelay_torrent_hash_duration_seconds",
            "Duration of torrent piece hashing",
        )
        .buckets(vec![0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 180.0]),
    )
    .unwrap()
});

// =============================================================================
// Duplicate Check Metrics
// =============================================================================

/// Duplicate checks total by tracker and verdict.
pub static DUPCHECK_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("seedrelay_dupcheck_results_total", "Total duplicate checks"),
        &["tracker", "verdict"], // verdict: "clear", "duplicate", "exact", "error"
    )
    .unwrap()
});

/// Duplicate check cache hits and misses.
pub static DUPCHECK_CACHE: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedrelay_dupcheck_cache_total",
            "Duplicate check cache lookups",
        ),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// Cloudflare bypass requests total by status.
pub static BYPASS_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "seedrelay_bypass_requests_total",
            "Total Cloudflare bypass service requests",
        ),
        &["status"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Queue
        Box::new(QUEUE_DISPATCHES.clone()),
        Box::new(QUEUE_ACTIVE.clone()),
        Box::new(QUEUE_CLEANED.clone()),
        Box::new(QUEUE_PROCESS_DURATION.clone()),
        // Uploads
        Box::new(UPLOAD_ATTEMPTS.clone()),
        Box::new(UPLOAD_DURATION.clone()),
        // Torrents
        Box::new(TORRENTS_GENERATED.clone()),
        Box::new(TORRENT_HASH_DURATION.clone()),
        // Duplicate checks
        Box::new(DUPCHECK_RESULTS.clone()),
        Box::new(DUPCHECK_CACHE.clone()),
        // External services
        Box::new(BYPASS_REQUESTS.clone()),
    ]
}
