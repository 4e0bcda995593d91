use std::sync::Arc;

use seedrelay_core::adapter::AdapterFactory;
use seedrelay_core::config::{Config, SanitizedConfig};
use seedrelay_core::dupcheck::DuplicateChecker;
use seedrelay_core::entry::FileEntryStore;
use seedrelay_core::queue::{QueueStore, QueueWorker};
use seedrelay_core::tracker::TrackerStore;

/// Shared application state
pub struct AppState {
    config: Config,
    tracker_store: Arc<dyn TrackerStore>,
    entry_store: Arc<dyn FileEntryStore>,
    queue_store: Arc<dyn QueueStore>,
    factory: Arc<AdapterFactory>,
    dupcheck: Arc<DuplicateChecker>,
    worker: Arc<QueueWorker>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        tracker_store: Arc<dyn TrackerStore>,
        entry_store: Arc<dyn FileEntryStore>,
        queue_store: Arc<dyn QueueStore>,
        factory: Arc<AdapterFactory>,
        dupcheck: Arc<DuplicateChecker>,
        worker: Arc<QueueWorker>,
    ) -> Self {
        Self {
            config,
            tracker_store,
            entry_store,
            queue_store,
            factory,
            dupcheck,
            worker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn tracker_store(&self) -> &dyn TrackerStore {
        self.tracker_store.as_ref()
    }

    pub fn entry_store(&self) -> &dyn FileEntryStore {
        self.entry_store.as_ref()
    }

    pub fn queue_store(&self) -> &dyn QueueStore {
        self.queue_store.as_ref()
    }

    pub fn factory(&self) -> &AdapterFactory {
        self.factory.as_ref()
    }

    pub fn dupcheck(&self) -> &DuplicateChecker {
        self.dupcheck.as_ref()
    }

    pub fn worker(&self) -> &QueueWorker {
        self.worker.as_ref()
    }
}
