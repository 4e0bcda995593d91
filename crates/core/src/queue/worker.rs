//! Background queue worker.
//!
//! Polls for pending items, claims them, and processes each in its own
//! task under a concurrency bound. Items are claimed before the task is
//! spawned, so an item cancelled between fetch and claim is never
//! dispatched.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, RwLock, Semaphore};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::metrics;

use super::store::QueueStore;
use super::types::{QueueItem, QueueStatus};
use super::uploader::QueueProcessor;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(3600);

/// Snapshot of the worker's runtime state.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct WorkerStatus {
    pub running: bool,
    pub active_count: usize,
    pub pending_count: usize,
}

/// The queue worker. `start` spawns the dispatch loop; `stop` signals it
/// and waits for in-flight items to finish their current attempt.
pub struct QueueWorker {
    config: QueueConfig,
    store: Arc<dyn QueueStore>,
    processor: Arc<dyn QueueProcessor>,

    running: Arc<AtomicBool>,
    active: Arc<RwLock<HashSet<String>>>,
    permits: Arc<Semaphore>,
    shutdown_tx: broadcast::Sender<()>,
}

impl QueueWorker {
    pub fn new(
        config: QueueConfig,
        store: Arc<dyn QueueStore>,
        processor: Arc<dyn QueueProcessor>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));

        Self {
            config,
            store,
            processor,
            running: Arc::new(AtomicBool::new(false)),
            active: Arc::new(RwLock::new(HashSet::new())),
            permits,
            shutdown_tx,
        }
    }

    /// Start the dispatch loop.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Queue worker already running");
            return;
        }

        info!(
            max_concurrent = self.config.max_concurrent,
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting queue worker"
        );

        let config = self.config.clone();
        let store = Arc::clone(&self.store);
        let processor = Arc::clone(&self.processor);
        let running = Arc::clone(&self.running);
        let active = Arc::clone(&self.active);
        let permits = Arc::clone(&self.permits);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!("Queue dispatch loop started");
            let mut last_cleanup = Instant::now();
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Queue dispatch loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(config.poll_interval_ms)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }

                        Self::dispatch_pending(&store, &processor, &active, &permits).await;

                        if last_cleanup.elapsed() >= CLEANUP_INTERVAL {
                            last_cleanup = Instant::now();
                            match store.cleanup_completed(config.completed_ttl_hours) {
                                Ok(0) => {}
                                Ok(n) => {
                                    metrics::QUEUE_CLEANED.inc_by(n as u64);
                                    debug!(removed = n, "Cleaned up completed queue items");
                                }
                                Err(e) => warn!(error = %e, "Queue cleanup failed"),
                            }
                        }
                    }
                }
            }
            info!("Queue dispatch loop stopped");
        });
    }

    /// Stop the worker and wait for in-flight items to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Queue worker not running");
            return;
        }

        info!("Stopping queue worker");
        let _ = self.shutdown_tx.send(());

        // In-flight items complete their current attempt.
        while !self.active.read().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        info!("Queue worker stopped");
    }

    pub async fn status(&self) -> WorkerStatus {
        let pending_count = self
            .store
            .list_by_status(QueueStatus::Pending)
            .map(|items| items.len())
            .unwrap_or(0);

        WorkerStatus {
            running: self.running.load(Ordering::Relaxed),
            active_count: self.active.read().await.len(),
            pending_count,
        }
    }

    /// Claim and spawn as many pending items as the concurrency bound allows.
    async fn dispatch_pending(
        store: &Arc<dyn QueueStore>,
        processor: &Arc<dyn QueueProcessor>,
        active: &Arc<RwLock<HashSet<String>>>,
        permits: &Arc<Semaphore>,
    ) {
        let available = permits.available_permits();
        if available == 0 {
            return;
        }

        let exclude: Vec<String> = active.read().await.iter().cloned().collect();
        let pending = match store.fetch_pending(available, &exclude) {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Failed to fetch pending queue items");
                return;
            }
        };

        for item in pending {
            let permit = match Arc::clone(permits).try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => break,
            };

            // Claim first; a cancelled or already-taken item is skipped.
            match store.claim(&item.id) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(item = %item.id, "Item no longer pending, skipping");
                    continue;
                }
                Err(e) => {
                    warn!(item = %item.id, error = %e, "Failed to claim queue item");
                    continue;
                }
            }

            active.write().await.insert(item.id.clone());
            metrics::QUEUE_ACTIVE.inc();

            let store = Arc::clone(store);
            let processor = Arc::clone(processor);
            let active = Arc::clone(active);
            tokio::spawn(async move {
                Self::run_one(&store, &processor, &item).await;
                active.write().await.remove(&item.id);
                metrics::QUEUE_ACTIVE.dec();
                drop(permit);
            });
        }
    }

    /// Process one claimed item and record the outcome. Store failures are
    /// logged; they never escape the task.
    async fn run_one(
        store: &Arc<dyn QueueStore>,
        processor: &Arc<dyn QueueProcessor>,
        item: &QueueItem,
    ) {
        debug!(item = %item.id, entry = %item.file_entry_id, "Processing queue item");
        let started = Instant::now();

        match processor.process(item).await {
            Ok(()) => {
                metrics::QUEUE_DISPATCHES.with_label_values(&["completed"]).inc();
                metrics::QUEUE_PROCESS_DURATION
                    .with_label_values(&["completed"])
                    .observe(started.elapsed().as_secs_f64());
                if let Err(e) = store.mark_completed(&item.id) {
                    warn!(item = %item.id, error = %e, "Failed to mark item completed");
                }
            }
            Err(e) => {
                let outcome = match store.mark_failed(&item.id, &e.message, e.retryable) {
                    Ok(QueueStatus::Pending) => "retried",
                    Ok(_) => "failed",
                    Err(store_err) => {
                        warn!(item = %item.id, error = %store_err, "Failed to mark item failed");
                        "failed"
                    }
                };
                metrics::QUEUE_DISPATCHES.with_label_values(&[outcome]).inc();
                metrics::QUEUE_PROCESS_DURATION
                    .with_label_values(&[outcome])
                    .observe(started.elapsed().as_secs_f64());
                warn!(
                    item = %item.id,
                    retryable = e.retryable,
                    outcome,
                    "Queue item failed: {}",
                    e.message
                );
            }
        }
    }
}
