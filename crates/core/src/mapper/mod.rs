//! Release attribute to tracker option-code mapping.
//!
//! Each tracker models languages, quality, genre, and season as numeric
//! dropdown codes. This module owns the built-in tables and the detection
//! fallbacks used when a release's attributes are not supplied explicitly.

mod detect;
mod genre;
mod language;
mod quality;
mod season;

pub use detect::{detect_episode, detect_language_tokens, detect_season};
pub use genre::map_genre;
pub use language::{map_languages, LANG_ENGLISH, LANG_FRENCH, LANG_MULTI, LANG_VOSTFR};
pub use quality::{
    map_quality, QUALITY_DEFAULT, QUALITY_LIGHT, QUALITY_REMUX_1080, QUALITY_REMUX_2160,
};
pub use season::{
    map_episode, map_season, EPISODE_BASE, EPISODE_COMPLETE, MAX_EPISODE, MAX_SEASON, SEASON_BASE,
    SEASON_COMPLETE,
};

use serde::{Deserialize, Serialize};

/// Attributes of a release, as supplied by the caller. Missing values are
/// filled by release-name detection where possible.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReleaseAttributes {
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<u32>,
    #[serde(default)]
    pub tmdb_genre_ids: Vec<u32>,
    #[serde(default)]
    pub genre_name: Option<String>,
    /// Whether the release is episodic at all; season/episode codes are only
    /// emitted for TV content.
    #[serde(default)]
    pub is_tv: bool,
}

/// Fully resolved tracker option codes for one release.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedOptions {
    pub language_codes: Vec<i64>,
    pub quality_code: i64,
    pub genre_code: Option<i64>,
    pub season_code: Option<i64>,
    pub episode_code: Option<i64>,
}

/// Resolve every option code for a release.
///
/// Explicit attribute values always win; detection only fills what is
/// absent. Season and episode codes are only produced for TV releases.
pub fn resolve_options(release_name: &str, attrs: &ReleaseAttributes) -> ResolvedOptions {
    let language_tokens = if attrs.languages.is_empty() {
        detect_language_tokens(release_name)
    } else {
        attrs.languages.clone()
    };

    let (season_code, episode_code) = if attrs.is_tv {
        let season = attrs.season.or_else(|| detect_season(release_name));
        let episode = attrs.episode.or_else(|| detect_episode(release_name));
        (Some(map_season(season)), Some(map_episode(episode)))
    } else {
        (None, None)
    };

    ResolvedOptions {
        language_codes: map_languages(&language_tokens),
        quality_code: map_quality(
            attrs.resolution.as_deref(),
            attrs.source.as_deref(),
            release_name,
        ),
        genre_code: map_genre(&attrs.tmdb_genre_ids, attrs.genre_name.as_deref()),
        season_code,
        episode_code,
    }
}
