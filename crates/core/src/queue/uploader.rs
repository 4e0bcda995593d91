//! The per-item processing pipeline: generate torrents, check duplicates,
//! upload to every enabled tracker.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::adapter::{AdapterFactory, DuplicateQuery, TrackerError, UploadRequest};
use crate::dupcheck::DuplicateChecker;
use crate::entry::{EntryStatus, FileEntry, FileEntryStore, TrackerUploadState};
use crate::mapper::resolve_options;
use crate::metrics::{UPLOAD_ATTEMPTS, UPLOAD_DURATION};
use crate::torrent_gen::TorrentGenerator;
use crate::tracker::{MediaType, Tracker, TrackerStore};

use super::types::QueueItem;

/// How processing one queue item ended.
#[derive(Debug)]
pub struct ProcessError {
    pub message: String,
    pub retryable: bool,
}

impl ProcessError {
    fn terminal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// What the worker invokes per claimed item.
#[async_trait]
pub trait QueueProcessor: Send + Sync {
    async fn process(&self, item: &QueueItem) -> Result<(), ProcessError>;
}

/// Drives one file entry through torrent generation, duplicate checking,
/// and per-tracker upload.
pub struct ReleaseUploader {
    entries: Arc<dyn FileEntryStore>,
    trackers: Arc<dyn TrackerStore>,
    factory: Arc<AdapterFactory>,
    generator: Arc<TorrentGenerator>,
    dupcheck: Arc<DuplicateChecker>,
}

impl ReleaseUploader {
    pub fn new(
        entries: Arc<dyn FileEntryStore>,
        trackers: Arc<dyn TrackerStore>,
        factory: Arc<AdapterFactory>,
        generator: Arc<TorrentGenerator>,
        dupcheck: Arc<DuplicateChecker>,
    ) -> Self {
        Self {
            entries,
            trackers,
            factory,
            generator,
            dupcheck,
        }
    }

    fn upload_request_for(
        entry: &FileEntry,
        tracker: &Tracker,
        torrent_bytes: Vec<u8>,
    ) -> UploadRequest {
        let options = resolve_options(&entry.release_name, &entry.attributes);

        let media_type = if entry.attributes.is_tv {
            MediaType::Tv
        } else {
            MediaType::Movie
        };
        let category_id = entry
            .category_id
            .or_else(|| tracker.category_for(media_type, entry.attributes.resolution.as_deref()));

        let mut request = UploadRequest {
            release_name: entry.release_name.clone(),
            torrent_bytes,
            nfo_bytes: None,
            description: entry.mediainfo.clone(),
            category_id,
            subcategory_id: tracker.default_subcategory_id,
            tag_ids: entry.tag_ids.clone(),
            tmdb_id: entry.tmdb_id,
            tmdb_type: entry.tmdb_type.clone(),
            cover_url: None,
            extra: Default::default(),
        };

        // Resolved option codes ride in the extra context so config-driven
        // mappings can pick them up by name.
        if let Some(resolution) = &entry.attributes.resolution {
            request.extra.insert("resolution".to_string(), resolution.clone());
        }
        if let Some(source) = &entry.attributes.source {
            request.extra.insert("source".to_string(), source.clone());
        }
        request
            .extra
            .insert("quality_code".to_string(), options.quality_code.to_string());
        request.extra.insert(
            "language_codes".to_string(),
            options
                .language_codes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(","),
        );
        if let Some(genre) = options.genre_code {
            request.extra.insert("genre_code".to_string(), genre.to_string());
        }
        if let Some(season) = options.season_code {
            request.extra.insert("season_code".to_string(), season.to_string());
        }
        if let Some(episode) = options.episode_code {
            request.extra.insert("episode_code".to_string(), episode.to_string());
        }

        request
    }

    /// Upload one tracker's torrent. Errors are returned for classification
    /// but already recorded on the entry by the caller.
    async fn upload_to_tracker(
        &self,
        entry: &mut FileEntry,
        tracker: &Tracker,
        torrent_path: &Path,
    ) -> Result<bool, TrackerError> {
        let torrent_bytes = tokio::fs::read(torrent_path)
            .await
            .map_err(|e| TrackerError::Api(format!("{}: {}", torrent_path.display(), e)))?;

        let adapter = self.factory.adapter_for(tracker).await?;
        let request = Self::upload_request_for(entry, tracker, torrent_bytes);

        let started = Instant::now();
        let outcome = adapter.upload_torrent(&request).await;
        UPLOAD_DURATION
            .with_label_values(&[&tracker.slug])
            .observe(started.elapsed().as_secs_f64());

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                UPLOAD_ATTEMPTS
                    .with_label_values(&[&tracker.slug, "error"])
                    .inc();
                return Err(e);
            }
        };

        let success = outcome.success;
        UPLOAD_ATTEMPTS
            .with_label_values(&[&tracker.slug, if success { "success" } else { "rejected" }])
            .inc();
        entry.record_upload_result(&tracker.slug, outcome);
        Ok(success)
    }
}

#[async_trait]
impl QueueProcessor for ReleaseUploader {
    async fn process(&self, item: &QueueItem) -> Result<(), ProcessError> {
        let mut entry = self
            .entries
            .get(&item.file_entry_id)
            .map_err(|e| ProcessError::terminal(e.to_string()))?
            .ok_or_else(|| {
                ProcessError::terminal(format!("File entry {} not found", item.file_entry_id))
            })?;

        if entry.status == EntryStatus::PendingApproval && !item.skip_approval {
            return Err(ProcessError::terminal(format!(
                "Entry {} is awaiting approval",
                entry.id
            )));
        }

        let trackers = self
            .trackers
            .list_upload_enabled()
            .map_err(|e| ProcessError::terminal(e.to_string()))?;
        if trackers.is_empty() {
            return Err(ProcessError::terminal("No upload-enabled trackers"));
        }

        entry.status = EntryStatus::Uploading;
        self.entries
            .update(&entry)
            .map_err(|e| ProcessError::terminal(e.to_string()))?;

        let file_path = Path::new(&entry.file_path).to_path_buf();
        let file_size = tokio::fs::metadata(&file_path).await.ok().map(|m| m.len());

        // Generation failures are isolated per tracker; missing trackers are
        // recorded as failed below.
        let generated = self
            .generator
            .generate_all(&file_path, &trackers, &entry.release_name)
            .await;

        let query = DuplicateQuery {
            tmdb_id: entry.tmdb_id,
            imdb_id: None,
            release_name: Some(entry.release_name.clone()),
            quality: entry.attributes.resolution.clone(),
            file_size,
        };
        let duplicates = self.dupcheck.check_all(&trackers, &query).await;

        let mut any_retryable = false;
        for tracker in &trackers {
            if duplicates
                .per_tracker
                .get(&tracker.id)
                .is_some_and(|r| r.exact_match)
            {
                info!(tracker = %tracker.slug, entry = %entry.id, "Exact duplicate, skipping upload");
                UPLOAD_ATTEMPTS
                    .with_label_values(&[&tracker.slug, "skipped"])
                    .inc();
                entry
                    .tracker_statuses
                    .insert(tracker.slug.clone(), TrackerUploadState::Skipped);
                continue;
            }

            let Some(torrent) = generated.get(&tracker.id) else {
                entry
                    .tracker_statuses
                    .insert(tracker.slug.clone(), TrackerUploadState::Failed);
                continue;
            };

            entry.torrent_paths.insert(
                tracker.slug.clone(),
                torrent.path.to_string_lossy().to_string(),
            );

            match self.upload_to_tracker(&mut entry, tracker, &torrent.path).await {
                Ok(true) => {
                    info!(tracker = %tracker.slug, entry = %entry.id, "Upload succeeded");
                }
                Ok(false) => {
                    warn!(tracker = %tracker.slug, entry = %entry.id, "Tracker rejected upload");
                }
                Err(e) => {
                    warn!(tracker = %tracker.slug, entry = %entry.id, error = %e, "Upload failed");
                    any_retryable |= e.is_retryable();
                    entry
                        .tracker_statuses
                        .insert(tracker.slug.clone(), TrackerUploadState::Failed);
                }
            }
        }

        entry.duplicate_summary = Some(duplicates);
        entry.status = if entry.any_uploaded() {
            EntryStatus::Uploaded
        } else if entry.fully_failed() {
            EntryStatus::Failed
        } else {
            // Everything skipped as an existing duplicate.
            EntryStatus::Uploaded
        };
        self.entries
            .update(&entry)
            .map_err(|e| ProcessError::terminal(e.to_string()))?;

        if entry.status == EntryStatus::Failed {
            return Err(ProcessError {
                message: "All trackers failed".to_string(),
                retryable: any_retryable,
            });
        }
        Ok(())
    }
}
