//! Queue persistence trait.

use super::types::{QueueItem, QueuePriority, QueueStatus};
use super::QueueError;

/// Persistence boundary for the processing queue.
///
/// `enqueue`, `cancel`, and `retry` are the only mutation entry points for
/// external callers; the state transitions (`claim`, `mark_completed`,
/// `mark_failed`) belong to the worker.
pub trait QueueStore: Send + Sync {
    fn enqueue(
        &self,
        file_entry_id: &str,
        priority: QueuePriority,
        skip_approval: bool,
        max_attempts: u32,
    ) -> Result<QueueItem, QueueError>;

    fn get(&self, id: &str) -> Result<Option<QueueItem>, QueueError>;

    fn list(&self) -> Result<Vec<QueueItem>, QueueError>;

    fn list_by_status(&self, status: QueueStatus) -> Result<Vec<QueueItem>, QueueError>;

    /// Fetch up to `limit` pending items in dispatch order (priority
    /// ascending, enqueue time ascending), excluding the given ids.
    fn fetch_pending(&self, limit: usize, exclude: &[String]) -> Result<Vec<QueueItem>, QueueError>;

    /// Atomically transition pending -> processing and increment the
    /// attempt counter. Returns false when the item is no longer pending
    /// (e.g. cancelled between fetch and claim).
    fn claim(&self, id: &str) -> Result<bool, QueueError>;

    fn mark_completed(&self, id: &str) -> Result<(), QueueError>;

    /// Record a failure. A retryable failure with attempts below the
    /// budget goes back to pending; anything else is terminally failed.
    /// Returns the resulting status.
    fn mark_failed(&self, id: &str, error: &str, retryable: bool)
        -> Result<QueueStatus, QueueError>;

    /// Cancel an item. Only pending items can be cancelled; an item
    /// already processing completes its current attempt.
    fn cancel(&self, id: &str) -> Result<(), QueueError>;

    /// Re-queue a terminally failed or cancelled item with a fresh attempt
    /// budget.
    fn retry(&self, id: &str) -> Result<QueueItem, QueueError>;

    /// Delete completed items older than the TTL. Returns how many were
    /// removed.
    fn cleanup_completed(&self, ttl_hours: u32) -> Result<usize, QueueError>;
}
