//! Upload queue: persistence, the retrying worker, and the processing
//! pipeline it drives.

mod sqlite_store;
mod store;
mod types;
mod uploader;
mod worker;

use thiserror::Error;

pub use sqlite_store::SqliteQueueStore;
pub use store::QueueStore;
pub use types::{QueueItem, QueuePriority, QueueStatus};
pub use uploader::{ProcessError, QueueProcessor, ReleaseUploader};
pub use worker::{QueueWorker, WorkerStatus};

/// Error type for queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue item not found: {0}")]
    NotFound(String),

    #[error("Invalid queue state: {0}")]
    InvalidState(String),

    #[error("Database error: {0}")]
    Database(String),
}
