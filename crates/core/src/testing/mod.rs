//! Testing utilities and mock implementations.
//!
//! This module provides a mock tracker adapter and shared fixtures so the
//! queue, duplicate checker, and server surface can be tested without a
//! real tracker behind them.
//!
//! # Example
//!
//! ```rust,ignore
//! use seedrelay_core::testing::{tracker_fixture, MockTrackerAdapter};
//!
//! let adapter = MockTrackerAdapter::new("exm");
//! adapter.set_upload_outcome(UploadOutcome { success: true, ..outcome() }).await;
//!
//! let tracker = tracker_fixture("exm");
//! // Use in an AdapterFactory or DuplicateChecker...
//! ```

mod mock_adapter;

pub use mock_adapter::MockTrackerAdapter;

use chrono::Utc;

use crate::tracker::{AdapterKind, CategoryRule, MediaType, PieceSizeStrategy, Tracker};

/// Create a test tracker with reasonable defaults.
///
/// The id is derived from the slug, so fixtures with distinct slugs get
/// distinct cache keys.
pub fn tracker_fixture(slug: &str) -> Tracker {
    let now = Utc::now();
    Tracker {
        id: format!("t-{slug}"),
        name: format!("Tracker {}", slug.to_uppercase()),
        slug: slug.to_string(),
        base_url: "https://tracker.example.org".to_string(),
        passkey: Some("0123456789abcdef".to_string()),
        api_key: None,
        source_flag: slug.to_uppercase(),
        piece_strategy: PieceSizeStrategy::Auto,
        adapter_kind: AdapterKind::Fallback,
        default_category_id: Some(9),
        default_subcategory_id: None,
        category_mapping: vec![
            CategoryRule {
                media_type: MediaType::Movie,
                resolution: Some("2160p".to_string()),
                category_id: 2,
            },
            CategoryRule {
                media_type: MediaType::Movie,
                resolution: None,
                category_id: 1,
            },
            CategoryRule {
                media_type: MediaType::Tv,
                resolution: None,
                category_id: 5,
            },
        ],
        announce_template: None,
        naming_template: None,
        enabled: true,
        upload_enabled: true,
        priority: 0,
        requires_cloudflare_bypass: false,
        created_at: now,
        updated_at: now,
    }
}
