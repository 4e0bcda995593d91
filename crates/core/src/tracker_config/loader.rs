//! Keyed tracker-config document store with TTL caching.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use super::types::TrackerConfig;
use super::{validate_tracker_config, TrackerConfigError};

/// Parse a tracker config from a YAML (or JSON, which YAML subsumes) string
/// and validate it. Invalid documents are rejected with the full violation
/// list, never partially accepted.
pub fn load_tracker_config_from_str(raw: &str) -> Result<TrackerConfig, TrackerConfigError> {
    let config: TrackerConfig =
        serde_yaml::from_str(raw).map_err(|e| TrackerConfigError::Parse(e.to_string()))?;

    let violations = validate_tracker_config(&config);
    if !violations.is_empty() {
        return Err(TrackerConfigError::Invalid(violations));
    }

    Ok(config)
}

struct CachedConfig {
    config: Arc<TrackerConfig>,
    loaded_at: Instant,
}

/// Loads tracker config documents from a directory of `{slug}.yaml` /
/// `{slug}.yml` / `{slug}.json` files, caching parsed documents with a TTL.
///
/// The cache is owned by this object and shared by reference; writes go
/// through [`TrackerConfigLoader::save`], which invalidates the cached copy.
pub struct TrackerConfigLoader {
    dir: PathBuf,
    ttl: Duration,
    cache: RwLock<HashMap<String, CachedConfig>>,
}

impl TrackerConfigLoader {
    /// Create a loader rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn candidate_paths(&self, slug: &str) -> [PathBuf; 3] {
        [
            self.dir.join(format!("{}.yaml", slug)),
            self.dir.join(format!("{}.yml", slug)),
            self.dir.join(format!("{}.json", slug)),
        ]
    }

    fn find_document(&self, slug: &str) -> Option<PathBuf> {
        self.candidate_paths(slug).into_iter().find(|p| p.exists())
    }

    /// Load the config for a tracker slug, using the cache when fresh.
    pub async fn load(&self, slug: &str) -> Result<Arc<TrackerConfig>, TrackerConfigError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.get(slug) {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&cached.config));
                }
            }
        }

        let path = self
            .find_document(slug)
            .ok_or_else(|| TrackerConfigError::NotFound(slug.to_string()))?;

        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| TrackerConfigError::Io(format!("{}: {}", path.display(), e)))?;

        let config = Arc::new(load_tracker_config_from_str(&raw)?);
        debug!(slug = slug, path = %path.display(), "Loaded tracker config");

        // Concurrent loads may race here; last writer wins and both copies
        // are identical recomputations.
        let mut cache = self.cache.write().await;
        cache.insert(
            slug.to_string(),
            CachedConfig {
                config: Arc::clone(&config),
                loaded_at: Instant::now(),
            },
        );

        Ok(config)
    }

    /// Drop a cached document so the next load re-reads it.
    pub async fn invalidate(&self, slug: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(slug);
    }

    /// Persist a config document as YAML and invalidate its cache entry.
    /// The document is validated before anything is written.
    pub async fn save(&self, config: &TrackerConfig) -> Result<PathBuf, TrackerConfigError> {
        let violations = validate_tracker_config(config);
        if !violations.is_empty() {
            return Err(TrackerConfigError::Invalid(violations));
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| TrackerConfigError::Io(e.to_string()))?;

        let path = self.dir.join(format!("{}.yaml", config.tracker.slug));
        let raw = serde_yaml::to_string(config)
            .map_err(|e| TrackerConfigError::Parse(e.to_string()))?;
        tokio::fs::write(&path, raw)
            .await
            .map_err(|e| TrackerConfigError::Io(format!("{}: {}", path.display(), e)))?;

        self.invalidate(&config.tracker.slug).await;
        Ok(path)
    }

    /// List slugs with a config document on disk.
    pub fn list_slugs(&self) -> Result<Vec<String>, TrackerConfigError> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut slugs = Vec::new();
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| TrackerConfigError::Io(e.to_string()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if matches!(ext, Some("yaml") | Some("yml") | Some("json")) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    slugs.push(stem.to_string());
                }
            }
        }
        slugs.sort();
        slugs.dedup();
        Ok(slugs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC: &str = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    torrent:
      type: file
      required: true
"#;

    #[tokio::test]
    async fn test_load_from_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("exm.yaml"), DOC).unwrap();

        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        let config = loader.load("exm").await.unwrap();
        assert_eq!(config.tracker.slug, "exm");
    }

    #[tokio::test]
    async fn test_load_missing_slug() {
        let dir = TempDir::new().unwrap();
        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        let result = loader.load("nope").await;
        assert!(matches!(result, Err(TrackerConfigError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_invalid_document_rejected_with_violations() {
        let dir = TempDir::new().unwrap();
        let doc = r#"
tracker:
  name: Example
  slug: exm
auth:
  type: bearer
endpoints:
  upload: /api/torrents/upload
upload:
  fields:
    title:
      type: string
"#;
        std::fs::write(dir.path().join("exm.yaml"), doc).unwrap();

        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        match loader.load("exm").await {
            Err(TrackerConfigError::Invalid(violations)) => {
                assert!(violations.iter().any(|v| v.contains("torrent")));
            }
            other => panic!("Expected Invalid, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_cache_serves_second_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exm.yaml");
        std::fs::write(&path, DOC).unwrap();

        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        let first = loader.load("exm").await.unwrap();

        // Delete the file; the cached copy must still be served.
        std::fs::remove_file(&path).unwrap();
        let second = loader.load("exm").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("exm.yaml");
        std::fs::write(&path, DOC).unwrap();

        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        loader.load("exm").await.unwrap();

        std::fs::remove_file(&path).unwrap();
        loader.invalidate("exm").await;
        assert!(loader.load("exm").await.is_err());
    }

    #[tokio::test]
    async fn test_save_writes_and_reloads() {
        let dir = TempDir::new().unwrap();
        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));

        let config = load_tracker_config_from_str(DOC).unwrap();
        loader.save(&config).await.unwrap();

        let reloaded = loader.load("exm").await.unwrap();
        assert_eq!(*reloaded, config);
        assert_eq!(loader.list_slugs().unwrap(), vec!["exm".to_string()]);
    }

    #[tokio::test]
    async fn test_load_json_document() {
        let dir = TempDir::new().unwrap();
        let json = serde_json::to_string(&load_tracker_config_from_str(DOC).unwrap()).unwrap();
        std::fs::write(dir.path().join("exm.json"), json).unwrap();

        let loader = TrackerConfigLoader::new(dir.path(), Duration::from_secs(60));
        let config = loader.load("exm").await.unwrap();
        assert_eq!(config.tracker.name, "Example");
    }
}
