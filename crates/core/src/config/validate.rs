use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Queue concurrency and poll interval are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.queue.max_concurrent == 0 {
        return Err(ConfigError::ValidationError(
            "queue.max_concurrent must be at least 1".to_string(),
        ));
    }

    if config.queue.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "queue.poll_interval_ms must be greater than 0".to_string(),
        ));
    }

    if config.queue.max_attempts == 0 {
        return Err(ConfigError::ValidationError(
            "queue.max_attempts must be at least 1".to_string(),
        ));
    }

    if let Some(ref cf) = config.cloudflare {
        if cf.service_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "cloudflare.service_url cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ServerConfig};
    use std::net::IpAddr;

    #[test]
    fn test_validate_default_config() {
        let config: Config = toml::from_str("").unwrap();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config: Config = toml::from_str("").unwrap();
        config.server = ServerConfig {
            host: "0.0.0.0".parse::<IpAddr>().unwrap(),
            port: 0,
        };
        let result = validate_config(&config);
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_concurrency_fails() {
        let mut config: Config = toml::from_str("").unwrap();
        config.queue.max_concurrent = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_bypass_url_fails() {
        let config: Config = toml::from_str(
            r#"
[cloudflare]
service_url = ""
"#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }
}
