//! Quality code mapping.
//!
//! Resolution and source tokens resolve against an ordered rule list;
//! earlier rules win. "Light" encodes and remuxes take precedence over
//! the resolution/source grid.

/// Re-encoded lightweight release, any resolution.
pub const QUALITY_LIGHT: i64 = 18;
/// 2160p remux.
pub const QUALITY_REMUX_2160: i64 = 13;
/// 1080p remux (also the remux fallback).
pub const QUALITY_REMUX_1080: i64 = 12;
/// Default when nothing at all is recognized.
pub const QUALITY_DEFAULT: i64 = 9;

/// Normalized source token for rule matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Bluray,
    Web,
    Hdtv,
    Dvd,
}

fn normalize_source(raw: &str) -> Option<Source> {
    let lowered = raw.to_lowercase();
    if lowered.contains("blu") || lowered.contains("bd") {
        Some(Source::Bluray)
    } else if lowered.contains("web") {
        Some(Source::Web)
    } else if lowered.contains("hdtv") || lowered.contains("tv") {
        Some(Source::Hdtv)
    } else if lowered.contains("dvd") {
        Some(Source::Dvd)
    } else {
        None
    }
}

fn normalize_resolution(raw: &str) -> Option<&'static str> {
    let lowered = raw.to_lowercase();
    for res in ["2160p", "1080p", "720p", "480p"] {
        if lowered.contains(res) {
            return Some(res);
        }
    }
    if lowered.contains("4k") || lowered.contains("uhd") {
        return Some("2160p");
    }
    None
}

/// Ordered resolution-and-source rules, most specific first.
const RES_SOURCE_RULES: &[(&str, Source, i64)] = &[
    ("2160p", Source::Bluray, 16),
    ("2160p", Source::Web, 15),
    ("2160p", Source::Hdtv, 14),
    ("1080p", Source::Bluray, 10),
    ("1080p", Source::Web, 9),
    ("1080p", Source::Hdtv, 8),
    ("720p", Source::Bluray, 7),
    ("720p", Source::Web, 6),
    ("720p", Source::Hdtv, 5),
    ("480p", Source::Dvd, 4),
];

/// Resolution-only fallback rules.
const RES_ONLY_RULES: &[(&str, i64)] = &[
    ("2160p", 15),
    ("1080p", 9),
    ("720p", 6),
    ("480p", 4),
];

fn is_light(release_name: &str) -> bool {
    release_name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|tok| tok == "light")
}

fn is_remux(release_name: &str, source: Option<&str>) -> bool {
    if release_name.to_lowercase().contains("remux") {
        return true;
    }
    source.is_some_and(|s| s.to_lowercase().contains("remux"))
}

/// Resolve the quality code for a release.
///
/// Precedence: light, then remux (split by resolution), then the
/// resolution/source grid, then resolution alone, then the default.
pub fn map_quality(resolution: Option<&str>, source: Option<&str>, release_name: &str) -> i64 {
    if is_light(release_name) {
        return QUALITY_LIGHT;
    }

    let res = resolution
        .and_then(normalize_resolution)
        .or_else(|| normalize_resolution(release_name));

    if is_remux(release_name, source) {
        return match res {
            Some("2160p") => QUALITY_REMUX_2160,
            _ => QUALITY_REMUX_1080,
        };
    }

    let src = source.and_then(normalize_source);

    if let (Some(res), Some(src)) = (res, src) {
        for (rule_res, rule_src, code) in RES_SOURCE_RULES {
            if *rule_res == res && *rule_src == src {
                return *code;
            }
        }
    }

    if let Some(res) = res {
        for (rule_res, code) in RES_ONLY_RULES {
            if *rule_res == res {
                return *code;
            }
        }
    }

    QUALITY_DEFAULT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_and_source_grid() {
        assert_eq!(
            map_quality(Some("1080p"), Some("BluRay"), "Movie.2024.1080p.BluRay.x264"),
            10
        );
        assert_eq!(
            map_quality(Some("2160p"), Some("WEB-DL"), "Movie.2024.2160p.WEB-DL"),
            15
        );
        assert_eq!(map_quality(Some("720p"), Some("HDTV"), "Show.S01E01.720p.HDTV"), 5);
    }

    #[test]
    fn test_resolution_only_fallback() {
        assert_eq!(map_quality(Some("1080p"), None, "Movie.2024.1080p.x264"), 9);
        assert_eq!(map_quality(Some("2160p"), Some("laserdisc"), "Movie"), 15);
    }

    #[test]
    fn test_light_wins_over_everything() {
        assert_eq!(
            map_quality(Some("1080p"), Some("BluRay"), "Movie.2024.1080p.BluRay.Light.x265"),
            QUALITY_LIGHT
        );
    }

    #[test]
    fn test_remux_split_by_resolution() {
        assert_eq!(
            map_quality(Some("2160p"), Some("BluRay"), "Movie.2024.2160p.BluRay.REMUX"),
            QUALITY_REMUX_2160
        );
        assert_eq!(
            map_quality(Some("1080p"), Some("BluRay"), "Movie.2024.1080p.BluRay.Remux"),
            QUALITY_REMUX_1080
        );
        // Unknown resolution falls back to the 1080p remux code.
        assert_eq!(map_quality(None, Some("remux"), "Movie.2024"), QUALITY_REMUX_1080);
    }

    #[test]
    fn test_resolution_extracted_from_release_name() {
        assert_eq!(map_quality(None, Some("WEB-DL"), "Movie.2024.1080p.WEB-DL"), 9);
    }

    #[test]
    fn test_nothing_recognized_uses_default() {
        assert_eq!(map_quality(None, None, "Some Obscure Release"), QUALITY_DEFAULT);
    }

    #[test]
    fn test_4k_alias() {
        assert_eq!(map_quality(Some("4K"), Some("BluRay"), "Movie.4K.BluRay"), 16);
    }

    #[test]
    fn test_light_requires_word_boundary() {
        // "Highlights" must not trigger the light code.
        assert_eq!(map_quality(Some("1080p"), Some("WEB"), "Highlights.1080p.WEB"), 9);
    }
}
