//! Duplicate checking across trackers, with TTL-cached results.

mod aggregator;
mod cache;

pub use aggregator::{DuplicateChecker, DuplicateSummary};
pub use cache::{DuplicateCheckCache, DEFAULT_DUPCHECK_TTL};
