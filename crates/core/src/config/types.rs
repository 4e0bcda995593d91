use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tracker_configs: TrackerConfigsConfig,
    #[serde(default)]
    pub torrents: TorrentOutputConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub cloudflare: Option<CloudflareBypassConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("seedrelay.db")
}

/// Where per-tracker upload-config documents live and how long parsed
/// documents stay cached.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackerConfigsConfig {
    #[serde(default = "default_tracker_config_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_config_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for TrackerConfigsConfig {
    fn default() -> Self {
        Self {
            dir: default_tracker_config_dir(),
            cache_ttl_secs: default_config_cache_ttl(),
        }
    }
}

fn default_tracker_config_dir() -> PathBuf {
    PathBuf::from("tracker-configs")
}

fn default_config_cache_ttl() -> u64 {
    300
}

/// Generated .torrent output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TorrentOutputConfig {
    #[serde(default = "default_torrent_dir")]
    pub output_dir: PathBuf,
}

impl Default for TorrentOutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_torrent_dir(),
        }
    }
}

fn default_torrent_dir() -> PathBuf {
    PathBuf::from("torrents")
}

/// Queue worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// How often the worker polls for pending items.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Maximum number of items processed simultaneously.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Default maximum attempts per queue item.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Completed items older than this are deleted.
    #[serde(default = "default_completed_ttl")]
    pub completed_ttl_hours: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_concurrent: default_max_concurrent(),
            max_attempts: default_max_attempts(),
            completed_ttl_hours: default_completed_ttl(),
        }
    }
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_max_concurrent() -> usize {
    2
}

fn default_max_attempts() -> u32 {
    3
}

fn default_completed_ttl() -> u32 {
    24
}

/// Outbound HTTP configuration shared by all adapters
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_http_timeout() -> u32 {
    30
}

/// Cloudflare bypass service (FlareSolverr-compatible) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CloudflareBypassConfig {
    /// Bypass service URL (e.g., "http://localhost:8191")
    pub service_url: String,
    /// Maximum time the service may spend solving a challenge.
    #[serde(default = "default_bypass_timeout")]
    pub timeout_secs: u32,
    /// How long an obtained session is reused before re-solving.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_bypass_timeout() -> u32 {
    60
}

fn default_session_ttl() -> u64 {
    1800
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tracker_configs: TrackerConfigsConfig,
    pub torrents: TorrentOutputConfig,
    pub queue: QueueConfig,
    pub http: HttpConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloudflare: Option<SanitizedCloudflareConfig>,
}

/// Sanitized Cloudflare bypass config (service URL hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCloudflareConfig {
    pub service_configured: bool,
    pub timeout_secs: u32,
    pub session_ttl_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            tracker_configs: config.tracker_configs.clone(),
            torrents: config.torrents.clone(),
            queue: config.queue.clone(),
            http: config.http.clone(),
            cloudflare: config.cloudflare.as_ref().map(|c| SanitizedCloudflareConfig {
                service_configured: !c.service_url.is_empty(),
                timeout_secs: c.timeout_secs,
                session_ttl_secs: c.session_ttl_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "seedrelay.db");
        assert_eq!(config.queue.max_concurrent, 2);
        assert_eq!(config.queue.max_attempts, 3);
        assert!(config.cloudflare.is_none());
    }

    #[test]
    fn test_deserialize_custom_queue_settings() {
        let toml = r#"
[queue]
poll_interval_ms = 500
max_concurrent = 4
max_attempts = 5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.queue.poll_interval_ms, 500);
        assert_eq!(config.queue.max_concurrent, 4);
        assert_eq!(config.queue.max_attempts, 5);
        assert_eq!(config.queue.completed_ttl_hours, 24); // default
    }

    #[test]
    fn test_deserialize_cloudflare_config() {
        let toml = r#"
[cloudflare]
service_url = "http://localhost:8191"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let cf = config.cloudflare.as_ref().unwrap();
        assert_eq!(cf.service_url, "http://localhost:8191");
        assert_eq!(cf.timeout_secs, 60);
        assert_eq!(cf.session_ttl_secs, 1800);
    }

    #[test]
    fn test_sanitized_config_redacts_bypass_url() {
        let toml = r#"
[cloudflare]
service_url = "http://localhost:8191"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        let cf = sanitized.cloudflare.as_ref().unwrap();
        assert!(cf.service_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("8191"));
    }
}
