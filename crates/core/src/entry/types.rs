//! File entries: the work items driven through the release pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::UploadOutcome;
use crate::dupcheck::DuplicateSummary;
use crate::mapper::ReleaseAttributes;

/// Pipeline stage of a file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Discovered on disk, not yet inspected.
    Scanned,
    /// Media attributes extracted.
    Analyzed,
    /// Waiting for a human go-ahead.
    PendingApproval,
    Approved,
    /// Renamed and metadata resolved, ready for upload.
    Prepared,
    Uploading,
    /// At least one tracker accepted the upload.
    Uploaded,
    /// Every enabled tracker failed.
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Scanned => "scanned",
            EntryStatus::Analyzed => "analyzed",
            EntryStatus::PendingApproval => "pending_approval",
            EntryStatus::Approved => "approved",
            EntryStatus::Prepared => "prepared",
            EntryStatus::Uploading => "uploading",
            EntryStatus::Uploaded => "uploaded",
            EntryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scanned" => Some(EntryStatus::Scanned),
            "analyzed" => Some(EntryStatus::Analyzed),
            "pending_approval" => Some(EntryStatus::PendingApproval),
            "approved" => Some(EntryStatus::Approved),
            "prepared" => Some(EntryStatus::Prepared),
            "uploading" => Some(EntryStatus::Uploading),
            "uploaded" => Some(EntryStatus::Uploaded),
            "failed" => Some(EntryStatus::Failed),
            _ => None,
        }
    }
}

/// Per-tracker upload state on a file entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerUploadState {
    Pending,
    Uploaded,
    Failed,
    /// Excluded, e.g. because the tracker already has the release.
    Skipped,
}

/// One media file under processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub id: String,
    pub file_path: String,
    pub release_name: String,
    pub status: EntryStatus,
    /// tracker slug -> generated torrent path.
    #[serde(default)]
    pub torrent_paths: HashMap<String, String>,
    /// tracker slug -> most recent upload attempt's outcome.
    #[serde(default)]
    pub upload_results: HashMap<String, UploadOutcome>,
    /// tracker slug -> current upload state.
    #[serde(default)]
    pub tracker_statuses: HashMap<String, TrackerUploadState>,
    pub tmdb_id: Option<u32>,
    pub tmdb_type: Option<String>,
    pub duplicate_summary: Option<DuplicateSummary>,
    pub category_id: Option<u32>,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
    pub mediainfo: Option<String>,
    #[serde(default)]
    pub attributes: ReleaseAttributes,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileEntry {
    pub fn new(file_path: impl Into<String>, release_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            file_path: file_path.into(),
            release_name: release_name.into(),
            status: EntryStatus::Scanned,
            torrent_paths: HashMap::new(),
            upload_results: HashMap::new(),
            tracker_statuses: HashMap::new(),
            tmdb_id: None,
            tmdb_type: None,
            duplicate_summary: None,
            category_id: None,
            tag_ids: vec![],
            mediainfo: None,
            attributes: ReleaseAttributes::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Record one tracker's upload outcome. The per-tracker maps always
    /// reflect the most recent attempt, independent of other trackers.
    pub fn record_upload_result(&mut self, slug: &str, outcome: UploadOutcome) {
        let state = if outcome.success {
            TrackerUploadState::Uploaded
        } else {
            TrackerUploadState::Failed
        };
        self.tracker_statuses.insert(slug.to_string(), state);
        self.upload_results.insert(slug.to_string(), outcome);
    }

    /// Whether any tracker accepted the upload.
    pub fn any_uploaded(&self) -> bool {
        self.tracker_statuses
            .values()
            .any(|s| *s == TrackerUploadState::Uploaded)
    }

    /// A file is fully failed only when every attempted tracker failed.
    pub fn fully_failed(&self) -> bool {
        !self.tracker_statuses.is_empty()
            && self
                .tracker_statuses
                .values()
                .all(|s| *s == TrackerUploadState::Failed)
    }
}
