//! Release-name detection for attributes the caller did not supply.
//!
//! Detection never overrides an explicit value; it only fills gaps.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static SEASON_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})[\s._-]?E(\d{1,3})\b").unwrap());

static SEASON_ONLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bS(\d{1,2})\b").unwrap());

static SEASON_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bsaison[\s._-]?(\d{1,2})\b|\bseason[\s._-]?(\d{1,2})\b").unwrap());

static COMPLETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(integrale|int[eé]grale|complete)\b").unwrap());

fn first_capture(re: &Regex, name: &str) -> Option<u32> {
    re.captures(name).and_then(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .and_then(|m| m.as_str().parse().ok())
    })
}

/// Detect a season number from a release name.
///
/// Returns `Some(0)` for complete-series markers, `None` when nothing
/// season-shaped is present.
pub fn detect_season(release_name: &str) -> Option<u32> {
    if let Some(caps) = SEASON_EPISODE_RE.captures(release_name) {
        return caps.get(1).and_then(|m| m.as_str().parse().ok());
    }
    if let Some(n) = first_capture(&SEASON_ONLY_RE, release_name) {
        return Some(n);
    }
    if let Some(n) = first_capture(&SEASON_WORD_RE, release_name) {
        return Some(n);
    }
    if COMPLETE_RE.is_match(release_name) {
        return Some(0);
    }
    None
}

/// Detect an episode number from a release name (SxxEyy form only).
pub fn detect_episode(release_name: &str) -> Option<u32> {
    SEASON_EPISODE_RE
        .captures(release_name)
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract language-looking tokens from a release name.
pub fn detect_language_tokens(release_name: &str) -> Vec<String> {
    const KNOWN: &[&str] = &[
        "multi",
        "vostfr",
        "truefrench",
        "french",
        "english",
        "vff",
        "vfq",
        "vfi",
        "vf",
        "vo",
    ];

    release_name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| {
            let lowered = tok.to_lowercase();
            KNOWN.contains(&lowered.as_str())
        })
        .map(|tok| tok.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_sxxeyy() {
        assert_eq!(detect_season("Show.S02E05.1080p.WEB"), Some(2));
        assert_eq!(detect_episode("Show.S02E05.1080p.WEB"), Some(5));
    }

    #[test]
    fn test_detect_season_pack() {
        assert_eq!(detect_season("Show.S03.1080p.WEB"), Some(3));
        assert_eq!(detect_episode("Show.S03.1080p.WEB"), None);
    }

    #[test]
    fn test_detect_season_word() {
        assert_eq!(detect_season("Show Season 4 1080p"), Some(4));
        assert_eq!(detect_season("Show.Saison.2.FRENCH"), Some(2));
    }

    #[test]
    fn test_detect_complete_series() {
        assert_eq!(detect_season("Show.INTEGRALE.FRENCH.1080p"), Some(0));
        assert_eq!(detect_season("Show.COMPLETE.1080p.WEB"), Some(0));
    }

    #[test]
    fn test_nothing_detected() {
        assert_eq!(detect_season("Movie.2024.1080p.WEB"), None);
        assert_eq!(detect_episode("Movie.2024.1080p.WEB"), None);
    }

    #[test]
    fn test_sxxeyy_wins_over_complete_marker() {
        assert_eq!(detect_season("Show.S01E01.Complete.Edition"), Some(1));
    }

    #[test]
    fn test_detect_language_tokens() {
        assert_eq!(
            detect_language_tokens("Movie.2024.MULTi.VFF.1080p"),
            vec!["MULTi".to_string(), "VFF".to_string()]
        );
        assert!(detect_language_tokens("Movie.2024.1080p").is_empty());
    }
}
