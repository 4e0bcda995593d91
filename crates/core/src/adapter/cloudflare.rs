//! Cloudflare bypass client (FlareSolverr-compatible service).
//!
//! Some trackers sit behind a Cloudflare challenge that plain HTTP clients
//! cannot pass. An external solver service fetches the page in a real
//! browser and hands back the clearance cookies plus the user agent they
//! were issued for; both must be replayed together on every subsequent
//! request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::CloudflareBypassConfig;
use crate::metrics::BYPASS_REQUESTS;

use super::types::TrackerError;

/// A solved challenge session for one site.
#[derive(Debug, Clone)]
pub struct BypassSession {
    /// Ready-to-send `Cookie` header value.
    pub cookie_header: String,
    /// User agent the cookies were issued for.
    pub user_agent: String,
    obtained_at: Instant,
}

#[derive(Debug, Deserialize)]
struct SolverResponse {
    status: String,
    #[serde(default)]
    message: String,
    solution: Option<SolverSolution>,
}

#[derive(Debug, Deserialize)]
struct SolverSolution {
    #[serde(default)]
    cookies: Vec<SolverCookie>,
    #[serde(rename = "userAgent", default)]
    user_agent: String,
}

#[derive(Debug, Deserialize)]
struct SolverCookie {
    name: String,
    value: String,
}

fn format_cookie_header(cookies: &[SolverCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client for the bypass service, caching one session per site URL.
pub struct CloudflareBypassClient {
    client: Client,
    config: CloudflareBypassConfig,
    session_ttl: Duration,
    sessions: RwLock<HashMap<String, BypassSession>>,
}

impl CloudflareBypassClient {
    pub fn new(config: CloudflareBypassConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            session_ttl: Duration::from_secs(config.session_ttl_secs as u64),
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Get a clearance session for a site, solving a fresh challenge only
    /// when no cached session is still within its TTL.
    pub async fn session_for(&self, site_url: &str) -> Result<BypassSession, TrackerError> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(site_url) {
                if session.obtained_at.elapsed() < self.session_ttl {
                    return Ok(session.clone());
                }
            }
        }

        let session = match self.solve(site_url).await {
            Ok(session) => {
                BYPASS_REQUESTS.with_label_values(&["success"]).inc();
                session
            }
            Err(e) => {
                BYPASS_REQUESTS.with_label_values(&["error"]).inc();
                return Err(e);
            }
        };

        // Concurrent solves race here; last writer wins.
        let mut sessions = self.sessions.write().await;
        sessions.insert(site_url.to_string(), session.clone());
        Ok(session)
    }

    /// Drop a cached session so the next request solves again.
    pub async fn invalidate(&self, site_url: &str) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(site_url);
    }

    /// Probe the solver service itself.
    pub async fn is_available(&self) -> bool {
        let url = self.config.service_url.trim_end_matches('/').to_string();
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Bypass service unreachable");
                false
            }
        }
    }

    async fn solve(&self, site_url: &str) -> Result<BypassSession, TrackerError> {
        let endpoint = format!("{}/v1", self.config.service_url.trim_end_matches('/'));
        let payload = json!({
            "cmd": "request.get",
            "url": site_url,
            "maxTimeout": self.config.timeout_secs * 1000,
        });

        let response = self
            .client
            .post(&endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TrackerError::CloudflareBypass(e.to_string()))?;

        if !response.status().is_success() {
            return Err(TrackerError::CloudflareBypass(format!(
                "Solver returned HTTP {}",
                response.status()
            )));
        }

        let parsed: SolverResponse = response
            .json()
            .await
            .map_err(|e| TrackerError::CloudflareBypass(format!("Bad solver response: {}", e)))?;

        if parsed.status != "ok" {
            return Err(TrackerError::CloudflareBypass(format!(
                "Challenge not solved: {}",
                parsed.message
            )));
        }

        let solution = parsed.solution.ok_or_else(|| {
            TrackerError::CloudflareBypass("Solver response missing solution".to_string())
        })?;

        debug!(site = site_url, cookies = solution.cookies.len(), "Challenge solved");

        Ok(BypassSession {
            cookie_header: format_cookie_header(&solution.cookies),
            user_agent: solution.user_agent,
            obtained_at: Instant::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cookie_header() {
        let cookies = vec![
            SolverCookie {
                name: "cf_clearance".to_string(),
                value: "abc123".to_string(),
            },
            SolverCookie {
                name: "session".to_string(),
                value: "xyz".to_string(),
            },
        ];
        assert_eq!(format_cookie_header(&cookies), "cf_clearance=abc123; session=xyz");
    }

    #[test]
    fn test_format_cookie_header_empty() {
        assert_eq!(format_cookie_header(&[]), "");
    }

    #[test]
    fn test_solver_response_parse() {
        let raw = r#"{
            "status": "ok",
            "message": "",
            "solution": {
                "cookies": [{"name": "cf_clearance", "value": "tok"}],
                "userAgent": "Mozilla/5.0"
            }
        }"#;
        let parsed: SolverResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "ok");
        let solution = parsed.solution.unwrap();
        assert_eq!(solution.user_agent, "Mozilla/5.0");
        assert_eq!(solution.cookies.len(), 1);
    }

    #[test]
    fn test_solver_error_response_parse() {
        let raw = r#"{"status": "error", "message": "Challenge failed"}"#;
        let parsed: SolverResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.status, "error");
        assert!(parsed.solution.is_none());
    }
}
