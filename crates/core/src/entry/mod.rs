//! File entries and their persistence.

mod sqlite_store;
mod store;
mod types;

use thiserror::Error;

pub use sqlite_store::SqliteFileEntryStore;
pub use store::FileEntryStore;
pub use types::{EntryStatus, FileEntry, TrackerUploadState};

/// Error type for file entry operations.
#[derive(Debug, Error)]
pub enum FileEntryError {
    #[error("File entry not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}
