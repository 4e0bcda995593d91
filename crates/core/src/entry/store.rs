//! File entry persistence trait.

use super::types::{EntryStatus, FileEntry};
use super::FileEntryError;

/// Persistence boundary for file entries.
pub trait FileEntryStore: Send + Sync {
    fn create(&self, entry: &FileEntry) -> Result<(), FileEntryError>;

    fn get(&self, id: &str) -> Result<Option<FileEntry>, FileEntryError>;

    fn list(&self) -> Result<Vec<FileEntry>, FileEntryError>;

    fn list_by_status(&self, status: EntryStatus) -> Result<Vec<FileEntry>, FileEntryError>;

    /// Persist the entry's full current state.
    fn update(&self, entry: &FileEntry) -> Result<(), FileEntryError>;

    fn set_status(&self, id: &str, status: EntryStatus) -> Result<(), FileEntryError>;

    fn delete(&self, id: &str) -> Result<(), FileEntryError>;
}
