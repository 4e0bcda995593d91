//! Language token mapping.

/// Synthesized code for multi-language releases.
pub const LANG_MULTI: i64 = 1;
/// French audio.
pub const LANG_FRENCH: i64 = 2;
/// English / original audio.
pub const LANG_ENGLISH: i64 = 3;
/// Original audio with French subtitles.
pub const LANG_VOSTFR: i64 = 4;

/// Direct token table. Matched exactly first, then by substring.
const LANGUAGE_TABLE: &[(&str, i64)] = &[
    ("multi", LANG_MULTI),
    ("french", LANG_FRENCH),
    ("truefrench", LANG_FRENCH),
    ("vff", LANG_FRENCH),
    ("vfq", LANG_FRENCH),
    ("vfi", LANG_FRENCH),
    ("vf", LANG_FRENCH),
    ("english", LANG_ENGLISH),
    ("eng", LANG_ENGLISH),
    ("vo", LANG_ENGLISH),
    ("vostfr", LANG_VOSTFR),
];

fn code_for_token(token: &str) -> Option<i64> {
    let lowered = token.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }

    for (key, code) in LANGUAGE_TABLE {
        if lowered == *key {
            return Some(*code);
        }
    }
    for (key, code) in LANGUAGE_TABLE {
        // Short keys like "vo"/"vf" only match exactly, substring matching
        // would fire on almost any word.
        if key.len() >= 3 && lowered.contains(key) {
            return Some(*code);
        }
    }
    None
}

/// Map free-text language tokens to tracker language codes.
///
/// When both a French and an English code are resolved, the Multi code is
/// additionally appended (trackers that treat Multi as a derived tag).
/// No detected language at all defaults to Multi.
pub fn map_languages(tokens: &[String]) -> Vec<i64> {
    let mut codes: Vec<i64> = Vec::new();
    for token in tokens {
        if let Some(code) = code_for_token(token) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }

    if codes.contains(&LANG_FRENCH) && codes.contains(&LANG_ENGLISH) && !codes.contains(&LANG_MULTI)
    {
        codes.push(LANG_MULTI);
    }

    if codes.is_empty() {
        codes.push(LANG_MULTI);
    }

    codes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_direct_match() {
        assert_eq!(map_languages(&toks(&["French"])), vec![LANG_FRENCH]);
        assert_eq!(map_languages(&toks(&["VOSTFR"])), vec![LANG_VOSTFR]);
    }

    #[test]
    fn test_partial_match() {
        assert_eq!(map_languages(&toks(&["TrueFrench 5.1"])), vec![LANG_FRENCH]);
    }

    #[test]
    fn test_french_plus_english_synthesizes_multi() {
        let codes = map_languages(&toks(&["VFF", "English"]));
        assert!(codes.contains(&LANG_FRENCH));
        assert!(codes.contains(&LANG_ENGLISH));
        assert!(codes.contains(&LANG_MULTI));
    }

    #[test]
    fn test_explicit_multi_not_duplicated() {
        let codes = map_languages(&toks(&["Multi", "French", "English"]));
        assert_eq!(codes.iter().filter(|c| **c == LANG_MULTI).count(), 1);
    }

    #[test]
    fn test_no_language_defaults_to_multi() {
        assert_eq!(map_languages(&[]), vec![LANG_MULTI]);
        assert_eq!(map_languages(&toks(&["klingon"])), vec![LANG_MULTI]);
    }

    #[test]
    fn test_short_tokens_require_exact_match() {
        // "vo" must not fire inside unrelated words.
        assert_eq!(map_languages(&toks(&["avoid"])), vec![LANG_MULTI]);
        assert_eq!(map_languages(&toks(&["VO"])), vec![LANG_ENGLISH]);
    }
}
