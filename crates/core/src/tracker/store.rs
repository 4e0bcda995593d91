//! Tracker storage trait.

use thiserror::Error;

use super::{CreateTrackerRequest, Tracker};

/// Error type for tracker store operations.
#[derive(Debug, Error)]
pub enum TrackerStoreError {
    #[error("Tracker not found: {0}")]
    NotFound(String),

    #[error("Tracker slug already exists: {0}")]
    DuplicateSlug(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for tracker storage backends.
pub trait TrackerStore: Send + Sync {
    /// Create a new tracker. Fails when the slug is already taken.
    fn create(&self, request: CreateTrackerRequest) -> Result<Tracker, TrackerStoreError>;

    /// Get a tracker by id.
    fn get(&self, id: &str) -> Result<Option<Tracker>, TrackerStoreError>;

    /// Get a tracker by slug.
    fn get_by_slug(&self, slug: &str) -> Result<Option<Tracker>, TrackerStoreError>;

    /// List all trackers ordered by priority (lower first).
    fn list(&self) -> Result<Vec<Tracker>, TrackerStoreError>;

    /// List enabled trackers with uploads enabled, ordered by priority.
    fn list_upload_enabled(&self) -> Result<Vec<Tracker>, TrackerStoreError>;

    /// Replace a tracker's stored fields.
    fn update(&self, tracker: &Tracker) -> Result<Tracker, TrackerStoreError>;

    /// Toggle the enabled flag.
    fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), TrackerStoreError>;

    /// Delete a tracker by id.
    fn delete(&self, id: &str) -> Result<Tracker, TrackerStoreError>;
}
