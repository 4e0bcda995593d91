pub mod adapter;
pub mod config;
pub mod dupcheck;
pub mod entry;
pub mod mapper;
pub mod metrics;
pub mod queue;
pub mod testing;
pub mod torrent_gen;
pub mod tracker;
pub mod tracker_config;

pub use config::{load_config, validate_config, Config, ConfigError};
pub use tracker::{Tracker, TrackerStore};
