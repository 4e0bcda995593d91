//! Core tracker data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which adapter implementation talks to this tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Passkey auth behind a Cloudflare challenge.
    PasskeyCloudflare,
    /// Bearer-token JSON API.
    BearerToken,
    /// Fully config-driven generic adapter.
    ConfigDriven,
    /// No-op adapter for trackers without a working integration.
    Fallback,
}

impl AdapterKind {
    /// Returns the string representation for API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdapterKind::PasskeyCloudflare => "passkey_cloudflare",
            AdapterKind::BearerToken => "bearer_token",
            AdapterKind::ConfigDriven => "config_driven",
            AdapterKind::Fallback => "fallback",
        }
    }
}

/// Piece-size selection strategy used when generating this tracker's torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceSizeStrategy {
    /// Let the torrent generator pick based on file size.
    Auto,
    /// Provider-specific table (stricter piece-count limits).
    Provider,
    /// Standard size table.
    Standard,
}

/// Media type used in category mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Movie,
    Tv,
}

/// One category-mapping rule: (media type, optional resolution) -> category id.
///
/// Rules with a resolution are more specific and win over rules without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub media_type: MediaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
    pub category_id: u32,
}

/// One private-tracker configuration row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tracker {
    pub id: String,
    pub name: String,
    /// Globally unique short identifier, used as map key everywhere.
    pub slug: String,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passkey: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Source flag embedded in generated torrents. Empty means none.
    #[serde(default)]
    pub source_flag: String,
    pub piece_strategy: PieceSizeStrategy,
    pub adapter_kind: AdapterKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_category_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_subcategory_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category_mapping: Vec<CategoryRule>,
    /// Announce URL template with a `{passkey}` placeholder. When absent the
    /// default `{base_url}/announce/{passkey}` form is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announce_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming_template: Option<String>,
    pub enabled: bool,
    pub upload_enabled: bool,
    /// Lower uploads first.
    pub priority: u16,
    #[serde(default)]
    pub requires_cloudflare_bypass: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tracker {
    /// Derive the announce URL from the base URL and passkey.
    ///
    /// The announce URL is never stored; it always reflects the current
    /// passkey. Returns `None` when no passkey is configured.
    pub fn announce_url(&self) -> Option<String> {
        let passkey = self.passkey.as_deref()?;
        if passkey.is_empty() {
            return None;
        }

        match &self.announce_template {
            Some(template) => Some(template.replace("{passkey}", passkey)),
            None => Some(format!(
                "{}/announce/{}",
                self.base_url.trim_end_matches('/'),
                passkey
            )),
        }
    }

    /// Filename suffix distinguishing this tracker's .torrent output.
    pub fn torrent_suffix(&self) -> String {
        self.slug.to_uppercase()
    }

    /// Resolve a category id for the given media type and resolution.
    ///
    /// Resolution-specific rules win over media-type-only rules; falls back
    /// to the tracker's default category.
    pub fn category_for(&self, media_type: MediaType, resolution: Option<&str>) -> Option<u32> {
        if let Some(res) = resolution {
            let specific = self.category_mapping.iter().find(|r| {
                r.media_type == media_type
                    && r.resolution.as_deref().is_some_and(|m| m.eq_ignore_ascii_case(res))
            });
            if let Some(rule) = specific {
                return Some(rule.category_id);
            }
        }

        self.category_mapping
            .iter()
            .find(|r| r.media_type == media_type && r.resolution.is_none())
            .map(|r| r.category_id)
            .or(self.default_category_id)
    }
}

/// Request to create a new tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTrackerRequest {
    pub name: String,
    pub slug: String,
    pub base_url: String,
    #[serde(default)]
    pub passkey: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub source_flag: String,
    pub piece_strategy: PieceSizeStrategy,
    pub adapter_kind: AdapterKind,
    #[serde(default)]
    pub default_category_id: Option<u32>,
    #[serde(default)]
    pub default_subcategory_id: Option<u32>,
    #[serde(default)]
    pub category_mapping: Vec<CategoryRule>,
    #[serde(default)]
    pub announce_template: Option<String>,
    #[serde(default)]
    pub naming_template: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub upload_enabled: bool,
    #[serde(default)]
    pub priority: u16,
    #[serde(default)]
    pub requires_cloudflare_bypass: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> Tracker {
        Tracker {
            id: "t1".to_string(),
            name: "Example".to_string(),
            slug: "exm".to_string(),
            base_url: "https://tracker.example.org/".to_string(),
            passkey: Some("abcdef1234567890".to_string()),
            api_key: None,
            source_flag: "EXM".to_string(),
            piece_strategy: PieceSizeStrategy::Auto,
            adapter_kind: AdapterKind::ConfigDriven,
            default_category_id: Some(9),
            default_subcategory_id: None,
            category_mapping: vec![
                CategoryRule {
                    media_type: MediaType::Movie,
                    resolution: Some("2160p".to_string()),
                    category_id: 2,
                },
                CategoryRule {
                    media_type: MediaType::Movie,
                    resolution: None,
                    category_id: 1,
                },
            ],
            announce_template: None,
            naming_template: None,
            enabled: true,
            upload_enabled: true,
            priority: 0,
            requires_cloudflare_bypass: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_announce_url_default_form() {
        let t = tracker();
        assert_eq!(
            t.announce_url().unwrap(),
            "https://tracker.example.org/announce/abcdef1234567890"
        );
    }

    #[test]
    fn test_announce_url_template() {
        let mut t = tracker();
        t.announce_template =
            Some("https://announce.example.org/{passkey}/announce".to_string());
        assert_eq!(
            t.announce_url().unwrap(),
            "https://announce.example.org/abcdef1234567890/announce"
        );
    }

    #[test]
    fn test_announce_url_missing_passkey() {
        let mut t = tracker();
        t.passkey = None;
        assert!(t.announce_url().is_none());
        t.passkey = Some(String::new());
        assert!(t.announce_url().is_none());
    }

    #[test]
    fn test_category_resolution_specific_wins() {
        let t = tracker();
        assert_eq!(t.category_for(MediaType::Movie, Some("2160p")), Some(2));
        assert_eq!(t.category_for(MediaType::Movie, Some("1080p")), Some(1));
        assert_eq!(t.category_for(MediaType::Movie, None), Some(1));
    }

    #[test]
    fn test_category_falls_back_to_default() {
        let t = tracker();
        assert_eq!(t.category_for(MediaType::Tv, Some("1080p")), Some(9));
    }

    #[test]
    fn test_adapter_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&AdapterKind::PasskeyCloudflare).unwrap(),
            "\"passkey_cloudflare\""
        );
        assert_eq!(
            serde_json::to_string(&PieceSizeStrategy::Provider).unwrap(),
            "\"provider\""
        );
    }
}
