//! Tracker records and storage.
//!
//! A `Tracker` row describes one private tracker: credentials, adapter kind,
//! piece-size strategy, source flag, and category mapping. The announce URL
//! is always derived from the base URL and passkey, never stored.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTrackerStore;
pub use store::{TrackerStore, TrackerStoreError};
pub use types::*;
