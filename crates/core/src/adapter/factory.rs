//! Adapter factory with per-tracker instance caching.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::config::HttpConfig;
use crate::tracker::{AdapterKind, Tracker};
use crate::tracker_config::{TrackerConfigError, TrackerConfigLoader};

use super::bearer::BearerTokenAdapter;
use super::cloudflare::CloudflareBypassClient;
use super::config_driven::ConfigDrivenAdapter;
use super::fallback::FallbackAdapter;
use super::passkey::PasskeyCloudflareAdapter;
use super::types::TrackerError;
use super::TrackerAdapter;

/// Builds and caches one adapter instance per tracker id. Cached instances
/// keep their session state (bypass cookies, auth probes) across calls;
/// callers never reach into adapter internals.
pub struct AdapterFactory {
    http: HttpConfig,
    bypass: Option<Arc<CloudflareBypassClient>>,
    config_loader: Arc<TrackerConfigLoader>,
    cache: RwLock<HashMap<String, Arc<dyn TrackerAdapter>>>,
}

impl AdapterFactory {
    pub fn new(
        http: HttpConfig,
        bypass: Option<Arc<CloudflareBypassClient>>,
        config_loader: Arc<TrackerConfigLoader>,
    ) -> Self {
        Self {
            http,
            bypass,
            config_loader,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Get the adapter for a tracker, building and caching it on first use.
    pub async fn adapter_for(
        &self,
        tracker: &Tracker,
    ) -> Result<Arc<dyn TrackerAdapter>, TrackerError> {
        {
            let cache = self.cache.read().await;
            if let Some(adapter) = cache.get(&tracker.id) {
                return Ok(Arc::clone(adapter));
            }
        }

        let adapter = self.build(tracker).await?;
        debug!(tracker = %tracker.slug, kind = tracker.adapter_kind.as_str(), "Built adapter");

        let mut cache = self.cache.write().await;
        cache.insert(tracker.id.clone(), Arc::clone(&adapter));
        Ok(adapter)
    }

    /// Drop a cached adapter, e.g. after the tracker's credentials changed.
    pub async fn invalidate(&self, tracker_id: &str) {
        let mut cache = self.cache.write().await;
        cache.remove(tracker_id);
    }

    fn bypass_for(&self, tracker: &Tracker) -> Result<Option<Arc<CloudflareBypassClient>>, TrackerError> {
        if !tracker.requires_cloudflare_bypass {
            return Ok(None);
        }
        match &self.bypass {
            Some(bypass) => Ok(Some(Arc::clone(bypass))),
            None => Err(TrackerError::InvalidConfig(format!(
                "Tracker '{}' requires Cloudflare bypass but no bypass service is configured",
                tracker.slug
            ))),
        }
    }

    async fn build(&self, tracker: &Tracker) -> Result<Arc<dyn TrackerAdapter>, TrackerError> {
        let adapter: Arc<dyn TrackerAdapter> = match tracker.adapter_kind {
            AdapterKind::PasskeyCloudflare => Arc::new(PasskeyCloudflareAdapter::new(
                tracker.clone(),
                &self.http,
                self.bypass_for(tracker)?,
            )),
            AdapterKind::BearerToken => {
                Arc::new(BearerTokenAdapter::new(tracker.clone(), &self.http))
            }
            AdapterKind::ConfigDriven => {
                let config = self
                    .config_loader
                    .load(&tracker.slug)
                    .await
                    .map_err(|e| match e {
                        TrackerConfigError::Invalid(violations) => TrackerError::InvalidConfig(
                            format!("Config for '{}' is invalid: {}", tracker.slug, violations.join("; ")),
                        ),
                        other => TrackerError::InvalidConfig(other.to_string()),
                    })?;

                let bypass = if config.cloudflare.enabled || tracker.requires_cloudflare_bypass {
                    match &self.bypass {
                        Some(bypass) => Some(Arc::clone(bypass)),
                        None => {
                            return Err(TrackerError::InvalidConfig(format!(
                                "Tracker '{}' requires Cloudflare bypass but no bypass service is configured",
                                tracker.slug
                            )));
                        }
                    }
                } else {
                    None
                };

                Arc::new(ConfigDrivenAdapter::new(
                    tracker.clone(),
                    config,
                    &self.http,
                    bypass,
                ))
            }
            AdapterKind::Fallback => Arc::new(FallbackAdapter::new(tracker.clone(), &self.http)),
        };

        Ok(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tracker_fixture;
    use std::time::Duration;
    use tempfile::TempDir;

    fn factory(dir: &TempDir) -> AdapterFactory {
        AdapterFactory::new(
            HttpConfig::default(),
            None,
            Arc::new(TrackerConfigLoader::new(dir.path(), Duration::from_secs(60))),
        )
    }

    #[tokio::test]
    async fn test_builds_each_kind() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);

        let mut tracker = tracker_fixture("flb");
        tracker.adapter_kind = AdapterKind::Fallback;
        let adapter = factory.adapter_for(&tracker).await.unwrap();
        assert_eq!(adapter.adapter_info().kind, AdapterKind::Fallback);

        let mut tracker = tracker_fixture("btk");
        tracker.id = "t-bearer".to_string();
        tracker.adapter_kind = AdapterKind::BearerToken;
        let adapter = factory.adapter_for(&tracker).await.unwrap();
        assert_eq!(adapter.adapter_info().kind, AdapterKind::BearerToken);
    }

    #[tokio::test]
    async fn test_cache_returns_same_instance() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);
        let mut tracker = tracker_fixture("flb");
        tracker.adapter_kind = AdapterKind::Fallback;

        let first = factory.adapter_for(&tracker).await.unwrap();
        let second = factory.adapter_for(&tracker).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_invalidate_rebuilds() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);
        let mut tracker = tracker_fixture("flb");
        tracker.adapter_kind = AdapterKind::Fallback;

        let first = factory.adapter_for(&tracker).await.unwrap();
        factory.invalidate(&tracker.id).await;
        let second = factory.adapter_for(&tracker).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_config_driven_without_document_fails() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);
        let mut tracker = tracker_fixture("noconf");
        tracker.adapter_kind = AdapterKind::ConfigDriven;

        let result = factory.adapter_for(&tracker).await;
        assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_bypass_required_but_unconfigured_fails() {
        let dir = TempDir::new().unwrap();
        let factory = factory(&dir);
        let mut tracker = tracker_fixture("pcf");
        tracker.adapter_kind = AdapterKind::PasskeyCloudflare;
        tracker.requires_cloudflare_bypass = true;

        let result = factory.adapter_for(&tracker).await;
        assert!(matches!(result, Err(TrackerError::InvalidConfig(_))));
    }
}
