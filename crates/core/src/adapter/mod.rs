//! Tracker adapters.
//!
//! Each adapter implements the [`TrackerAdapter`] contract for one tracker
//! API family: passkey + Cloudflare bypass, bearer-token JSON APIs, the
//! config-driven generic engine, and a fallback for trackers with no API.
//! The [`AdapterFactory`] resolves a tracker row to a cached instance.

mod bearer;
mod cloudflare;
mod config_driven;
mod factory;
mod fallback;
mod passkey;
mod torznab;
mod traits;
mod types;

pub use bearer::BearerTokenAdapter;
pub use cloudflare::{BypassSession, CloudflareBypassClient};
pub use config_driven::{build_form_parts, path_lookup, ConfigDrivenAdapter, FormPart};
pub use factory::AdapterFactory;
pub use fallback::FallbackAdapter;
pub use passkey::PasskeyCloudflareAdapter;
pub use torznab::parse_torznab_results;
pub use traits::TrackerAdapter;
pub use types::{
    derive_name_query, is_exact_size_match, AdapterInfo, DuplicateQuery, DuplicateResult,
    ExistingTorrent, HealthStatus, SearchMethod, TrackerCategory, TrackerError, TrackerTag,
    UploadOutcome, UploadRequest,
};
