mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seedrelay_core::adapter::{AdapterFactory, CloudflareBypassClient};
use seedrelay_core::dupcheck::{DuplicateCheckCache, DuplicateChecker, DEFAULT_DUPCHECK_TTL};
use seedrelay_core::entry::{FileEntryStore, SqliteFileEntryStore};
use seedrelay_core::queue::{QueueStore, QueueWorker, ReleaseUploader, SqliteQueueStore};
use seedrelay_core::torrent_gen::TorrentGenerator;
use seedrelay_core::tracker::SqliteTrackerStore;
use seedrelay_core::tracker_config::TrackerConfigLoader;
use seedrelay_core::{load_config, validate_config, TrackerStore};

use api::create_router;
use state::AppState;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("SEEDRELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Database path: {:?}", config.database.path);
    info!("Torrent output dir: {:?}", config.torrents.output_dir);

    // Create SQLite stores
    let tracker_store: Arc<dyn TrackerStore> = Arc::new(
        SqliteTrackerStore::new(&config.database.path)
            .context("Failed to create tracker store")?,
    );
    let entry_store: Arc<dyn FileEntryStore> = Arc::new(
        SqliteFileEntryStore::new(&config.database.path)
            .context("Failed to create file entry store")?,
    );
    let queue_store: Arc<dyn QueueStore> = Arc::new(
        SqliteQueueStore::new(&config.database.path).context("Failed to create queue store")?,
    );
    info!("SQLite stores initialized");

    // Tracker upload-config documents (YAML/JSON) with a TTL cache
    let config_loader = Arc::new(TrackerConfigLoader::new(
        &config.tracker_configs.dir,
        Duration::from_secs(config.tracker_configs.cache_ttl_secs),
    ));

    // Cloudflare bypass service client, when configured
    let bypass = config.cloudflare.clone().map(|cf_config| {
        info!("Cloudflare bypass service at {}", cf_config.service_url);
        Arc::new(CloudflareBypassClient::new(cf_config))
    });
    if bypass.is_none() {
        info!("No Cloudflare bypass service configured");
    }

    let factory = Arc::new(AdapterFactory::new(
        config.http.clone(),
        bypass,
        Arc::clone(&config_loader),
    ));

    let generator = Arc::new(TorrentGenerator::new(&config.torrents.output_dir));

    let dupcheck = Arc::new(DuplicateChecker::new(
        Arc::clone(&factory),
        Arc::new(DuplicateCheckCache::new(DEFAULT_DUPCHECK_TTL)),
    ));

    // The upload pipeline the worker drives per claimed item
    let uploader = Arc::new(ReleaseUploader::new(
        Arc::clone(&entry_store),
        Arc::clone(&tracker_store),
        Arc::clone(&factory),
        generator,
        Arc::clone(&dupcheck),
    ));

    let worker = Arc::new(QueueWorker::new(
        config.queue.clone(),
        Arc::clone(&queue_store),
        uploader,
    ));
    worker.start();
    info!("Queue worker started");

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        tracker_store,
        entry_store,
        queue_store,
        factory,
        dupcheck,
        Arc::clone(&worker),
    ));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // Stop the worker, waiting for in-flight uploads to finish
    info!("Server shutting down...");
    worker.stop().await;
    info!("Queue worker stopped");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
