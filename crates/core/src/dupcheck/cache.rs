//! TTL cache for per-tracker duplicate-check results.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;

use crate::adapter::{DuplicateQuery, DuplicateResult};
use crate::metrics::DUPCHECK_CACHE;

/// Default time a duplicate-check result stays fresh.
pub const DEFAULT_DUPCHECK_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    tracker_id: String,
    tmdb_id: Option<u32>,
    imdb_id: Option<String>,
    release_name: Option<String>,
}

impl CacheKey {
    fn new(tracker_id: &str, query: &DuplicateQuery) -> Self {
        Self {
            tracker_id: tracker_id.to_string(),
            tmdb_id: query.tmdb_id,
            imdb_id: query.imdb_id.clone(),
            release_name: query.release_name.clone(),
        }
    }
}

struct CachedResult {
    result: DuplicateResult,
    stored_at: Instant,
}

/// Caches duplicate-check results keyed by (tracker, query identity).
/// Concurrent population races are tolerated; last writer wins.
pub struct DuplicateCheckCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CachedResult>>,
}

impl DuplicateCheckCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, tracker_id: &str, query: &DuplicateQuery) -> Option<DuplicateResult> {
        let key = CacheKey::new(tracker_id, query);
        let entries = self.entries.read().await;
        // An expired entry counts as a miss; eviction happens separately.
        let hit = entries
            .get(&key)
            .filter(|cached| cached.stored_at.elapsed() < self.ttl)
            .map(|cached| cached.result.clone());
        DUPCHECK_CACHE
            .with_label_values(&[if hit.is_some() { "hit" } else { "miss" }])
            .inc();
        hit
    }

    pub async fn put(&self, tracker_id: &str, query: &DuplicateQuery, result: DuplicateResult) {
        let key = CacheKey::new(tracker_id, query);
        let mut entries = self.entries.write().await;
        entries.insert(
            key,
            CachedResult {
                result,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every cached result for one tracker.
    pub async fn invalidate_tracker(&self, tracker_id: &str) {
        let mut entries = self.entries.write().await;
        entries.retain(|key, _| key.tracker_id != tracker_id);
    }

    /// Drop expired entries. `get` already treats them as misses; this
    /// reclaims the map slots they hold.
    pub async fn evict_expired(&self) {
        let mut entries = self.entries.write().await;
        entries.retain(|_, cached| cached.stored_at.elapsed() < self.ttl);
    }

    /// Number of cached results, expired entries included.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for DuplicateCheckCache {
    fn default() -> Self {
        Self::new(DEFAULT_DUPCHECK_TTL)
    }
}
