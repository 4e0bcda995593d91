//! Cross-tracker duplicate-check aggregation.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::adapter::{AdapterFactory, DuplicateQuery, DuplicateResult, SearchMethod};
use crate::metrics::DUPCHECK_RESULTS;
use crate::tracker::Tracker;

use super::cache::DuplicateCheckCache;

/// Aggregated duplicate verdict across every checked tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateSummary {
    /// At least one tracker already has a matching release.
    pub any_duplicate: bool,
    /// At least one tracker has an exact size match.
    pub any_exact_match: bool,
    pub per_tracker: HashMap<String, DuplicateResult>,
    pub checked_at: DateTime<Utc>,
}

impl DuplicateSummary {
    /// Tracker ids with no duplicate, i.e. safe upload targets.
    pub fn clear_tracker_ids(&self) -> Vec<String> {
        self.per_tracker
            .iter()
            .filter(|(_, result)| !result.is_duplicate)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Runs duplicate checks across trackers, caching per-tracker results.
pub struct DuplicateChecker {
    factory: Arc<AdapterFactory>,
    cache: Arc<DuplicateCheckCache>,
}

impl DuplicateChecker {
    pub fn new(factory: Arc<AdapterFactory>, cache: Arc<DuplicateCheckCache>) -> Self {
        Self { factory, cache }
    }

    /// Check one tracker, consulting the cache first.
    pub async fn check_tracker(
        &self,
        tracker: &Tracker,
        query: &DuplicateQuery,
    ) -> DuplicateResult {
        if let Some(cached) = self.cache.get(&tracker.id, query).await {
            return cached;
        }

        let result = match self.factory.adapter_for(tracker).await {
            Ok(adapter) => match adapter.check_duplicate(query).await {
                Ok(result) => {
                    let verdict = if result.exact_match {
                        "exact"
                    } else if result.is_duplicate {
                        "duplicate"
                    } else {
                        "clear"
                    };
                    DUPCHECK_RESULTS
                        .with_label_values(&[&tracker.slug, verdict])
                        .inc();
                    result
                }
                Err(e) => {
                    warn!(tracker = %tracker.slug, error = %e, "Duplicate check failed");
                    DUPCHECK_RESULTS
                        .with_label_values(&[&tracker.slug, "error"])
                        .inc();
                    let mut degraded = DuplicateResult::no_hits(SearchMethod::None);
                    degraded.message = Some(e.to_string());
                    degraded
                }
            },
            Err(e) => {
                warn!(tracker = %tracker.slug, error = %e, "No adapter for duplicate check");
                DUPCHECK_RESULTS
                    .with_label_values(&[&tracker.slug, "error"])
                    .inc();
                let mut degraded = DuplicateResult::no_hits(SearchMethod::None);
                degraded.message = Some(e.to_string());
                degraded
            }
        };

        self.cache.put(&tracker.id, query, result.clone()).await;
        result
    }

    /// Check every tracker and fold the results into a summary.
    ///
    /// A failing tracker degrades to a no-hit result with a message; it
    /// never blocks the other trackers' checks.
    pub async fn check_all(
        &self,
        trackers: &[Tracker],
        query: &DuplicateQuery,
    ) -> DuplicateSummary {
        // Stale results read as misses; reclaim their slots before fanning
        // out so the cache stays bounded over long runs.
        self.cache.evict_expired().await;

        let checks = trackers
            .iter()
            .filter(|t| t.enabled)
            .map(|tracker| async {
                let result = self.check_tracker(tracker, query).await;
                (tracker.id.clone(), result)
            });

        let per_tracker: HashMap<String, DuplicateResult> =
            futures::future::join_all(checks).await.into_iter().collect();

        DuplicateSummary {
            any_duplicate: per_tracker.values().any(|r| r.is_duplicate),
            any_exact_match: per_tracker.values().any(|r| r.exact_match),
            per_tracker,
            checked_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::ExistingTorrent;
    use crate::config::HttpConfig;
    use crate::tracker_config::TrackerConfigLoader;
    use std::time::Duration;
    use tempfile::TempDir;

    fn hit_result(exact: bool) -> DuplicateResult {
        DuplicateResult {
            is_duplicate: true,
            exact_match: exact,
            existing_torrents: vec![ExistingTorrent {
                title: "Movie".to_string(),
                link: None,
                guid: None,
                size: None,
                exact_match: exact,
            }],
            search_method: SearchMethod::Tmdb,
            message: None,
        }
    }

    #[test]
    fn test_summary_flags() {
        let mut per_tracker = HashMap::new();
        per_tracker.insert("t1".to_string(), hit_result(false));
        per_tracker.insert("t2".to_string(), DuplicateResult::no_hits(SearchMethod::None));

        let summary = DuplicateSummary {
            any_duplicate: per_tracker.values().any(|r| r.is_duplicate),
            any_exact_match: per_tracker.values().any(|r| r.exact_match),
            per_tracker,
            checked_at: Utc::now(),
        };

        assert!(summary.any_duplicate);
        assert!(!summary.any_exact_match);
        assert_eq!(summary.clear_tracker_ids(), vec!["t2".to_string()]);
    }

    #[tokio::test]
    async fn test_check_all_evicts_stale_cache_entries() {
        let dir = TempDir::new().unwrap();
        let factory = Arc::new(AdapterFactory::new(
            HttpConfig::default(),
            None,
            Arc::new(TrackerConfigLoader::new(dir.path(), Duration::from_secs(60))),
        ));
        let cache = Arc::new(DuplicateCheckCache::new(Duration::from_millis(0)));

        let query = DuplicateQuery {
            release_name: Some("Movie.2024".to_string()),
            ..Default::default()
        };
        cache
            .put("t1", &query, DuplicateResult::no_hits(SearchMethod::Name))
            .await;
        assert_eq!(cache.entry_count().await, 1);

        let checker = DuplicateChecker::new(factory, Arc::clone(&cache));
        checker.check_all(&[], &query).await;
        assert_eq!(cache.entry_count().await, 0);
    }

    #[test]
    fn test_summary_serializes() {
        let summary = DuplicateSummary {
            any_duplicate: false,
            any_exact_match: false,
            per_tracker: HashMap::new(),
            checked_at: Utc::now(),
        };
        let json = serde_json::to_string(&summary).unwrap();
        let back: DuplicateSummary = serde_json::from_str(&json).unwrap();
        assert!(!back.any_duplicate);
    }
}
