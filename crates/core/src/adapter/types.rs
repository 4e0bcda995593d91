//! Shared adapter types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tracker::AdapterKind;

/// Error type for tracker adapter operations.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Invalid or rejected credentials. Not retryable.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The Cloudflare bypass service failed or is unreachable. Retryable.
    #[error("Cloudflare bypass failed: {0}")]
    CloudflareBypass(String),

    /// Connection-level failure. Retryable.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out. Retryable.
    #[error("Request timed out")]
    Timeout,

    /// Tracker-side rejection or malformed exchange. Not retryable.
    #[error("Tracker API error: {0}")]
    Api(String),

    /// A required upload field had no resolvable value. Not retryable.
    #[error("Missing required upload field: {0}")]
    MissingField(String),

    /// The adapter could not be constructed from its configuration.
    #[error("Invalid adapter configuration: {0}")]
    InvalidConfig(String),
}

impl TrackerError {
    /// Whether the queue worker should count this failure against the
    /// attempt budget and retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackerError::CloudflareBypass(_)
                | TrackerError::ConnectionFailed(_)
                | TrackerError::Timeout
        )
    }

    /// Map a reqwest transport error onto the adapter taxonomy.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TrackerError::Timeout
        } else if e.is_connect() {
            TrackerError::ConnectionFailed(e.to_string())
        } else {
            TrackerError::Api(e.to_string())
        }
    }
}

/// Everything an adapter needs to perform one upload.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub release_name: String,
    pub torrent_bytes: Vec<u8>,
    pub nfo_bytes: Option<Vec<u8>>,
    pub description: Option<String>,
    pub category_id: Option<u32>,
    pub subcategory_id: Option<u32>,
    pub tag_ids: Vec<i64>,
    pub tmdb_id: Option<u32>,
    pub tmdb_type: Option<String>,
    pub cover_url: Option<String>,
    /// Extra named values available to config-driven field sources.
    pub extra: BTreeMap<String, String>,
}

/// Result of one upload attempt against one tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub success: bool,
    pub torrent_id: Option<String>,
    pub torrent_url: Option<String>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

/// A tag as exposed by a tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerTag {
    pub id: i64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A category as exposed by a tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub id: i64,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// What to search for when checking for an existing release.
#[derive(Debug, Clone, Default)]
pub struct DuplicateQuery {
    pub tmdb_id: Option<u32>,
    pub imdb_id: Option<String>,
    pub release_name: Option<String>,
    pub quality: Option<String>,
    pub file_size: Option<u64>,
}

/// Which search strategy produced a duplicate-check result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Tmdb,
    Imdb,
    Name,
    None,
}

impl SearchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMethod::Tmdb => "tmdb",
            SearchMethod::Imdb => "imdb",
            SearchMethod::Name => "name",
            SearchMethod::None => "none",
        }
    }
}

/// One existing torrent found on a tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingTorrent {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Size within the exact-match tolerance of the local file.
    #[serde(default)]
    pub exact_match: bool,
}

/// Per-tracker duplicate-check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateResult {
    pub is_duplicate: bool,
    pub exact_match: bool,
    pub existing_torrents: Vec<ExistingTorrent>,
    pub search_method: SearchMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DuplicateResult {
    /// A result with no hits at all.
    pub fn no_hits(search_method: SearchMethod) -> Self {
        Self {
            is_duplicate: false,
            exact_match: false,
            existing_torrents: vec![],
            search_method,
            message: None,
        }
    }

    /// Build a result from search hits, flagging exact size matches when a
    /// local file size is known.
    pub fn from_hits(
        mut hits: Vec<ExistingTorrent>,
        search_method: SearchMethod,
        local_size: Option<u64>,
    ) -> Self {
        if let Some(local) = local_size {
            for hit in &mut hits {
                hit.exact_match = hit.size.is_some_and(|s| is_exact_size_match(s, local));
            }
        }
        let exact = hits.iter().any(|h| h.exact_match);
        Self {
            is_duplicate: !hits.is_empty(),
            exact_match: exact,
            existing_torrents: hits,
            search_method,
            message: None,
        }
    }
}

/// Whether two sizes are within the exact-match tolerance (1%).
pub fn is_exact_size_match(existing: u64, local: u64) -> bool {
    let tolerance = local / 100;
    existing.abs_diff(local) <= tolerance
}

/// Aggregate tracker health. Never produced by a fallible path; failed
/// probes degrade the booleans instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub tracker_reachable: bool,
    pub credentials_valid: bool,
    /// Bypass service availability, absent when the tracker needs no bypass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bypass_available: Option<bool>,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    pub fn unreachable() -> Self {
        Self {
            tracker_reachable: false,
            credentials_valid: false,
            bypass_available: None,
            checked_at: Utc::now(),
        }
    }

    pub fn healthy(&self) -> bool {
        self.tracker_reachable && self.credentials_valid && self.bypass_available.unwrap_or(true)
    }
}

/// Static description of an adapter instance.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterInfo {
    pub kind: AdapterKind,
    pub tracker_slug: String,
    pub supports_tags: bool,
    pub supports_categories: bool,
    pub supports_search: bool,
}

/// Tokens stripped from a release name when deriving a title search query.
const QUALITY_TOKENS: &[&str] = &[
    "2160p", "1080p", "720p", "480p", "4k", "uhd", "bluray", "blu-ray", "bdrip", "brrip", "remux",
    "web-dl", "webdl", "webrip", "web", "hdtv", "dvdrip", "x264", "x265", "h264", "h265", "hevc",
    "avc", "aac", "ac3", "dts", "ddp5", "atmos", "multi", "vff", "vostfr", "french", "truefrench",
    "english", "light", "hdr", "hdr10", "dv", "10bit",
];

/// Derive a plain title query from a release name: stop at the first
/// quality/codec/year token and join what precedes it with spaces.
pub fn derive_name_query(release_name: &str) -> String {
    let mut title_tokens = Vec::new();
    for token in release_name.split(['.', ' ', '_']) {
        if token.is_empty() {
            continue;
        }
        let lowered = token.to_lowercase();
        let is_year = token.len() == 4 && token.chars().all(|c| c.is_ascii_digit());
        if is_year || QUALITY_TOKENS.contains(&lowered.as_str()) {
            break;
        }
        title_tokens.push(token);
    }
    title_tokens.join(" ")
}
