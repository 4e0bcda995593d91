//! Season and episode code tables.
//!
//! Trackers expose seasons and episodes as dense dropdown code ranges with
//! a sentinel entry for "complete". Codes are base + N, clamped to the
//! largest entry the dropdown actually has.

/// Code for "complete series" (no specific season).
pub const SEASON_COMPLETE: i64 = 100;
/// Season N maps to `SEASON_BASE + N`.
pub const SEASON_BASE: i64 = 100;
/// Largest season the dropdown has an entry for.
pub const MAX_SEASON: u32 = 30;

/// Code for "complete season" (no specific episode).
pub const EPISODE_COMPLETE: i64 = 200;
/// Episode N maps to `EPISODE_BASE + N`.
pub const EPISODE_BASE: i64 = 200;
/// Largest episode the dropdown has an entry for.
pub const MAX_EPISODE: u32 = 60;

/// Map a season number to its tracker code.
///
/// `None` and `0` both mean the complete series.
pub fn map_season(season: Option<u32>) -> i64 {
    match season {
        None | Some(0) => SEASON_COMPLETE,
        Some(n) => SEASON_BASE + i64::from(n.min(MAX_SEASON)),
    }
}

/// Map an episode number to its tracker code.
///
/// `None` and `0` both mean the complete season.
pub fn map_episode(episode: Option<u32>) -> i64 {
    match episode {
        None | Some(0) => EPISODE_COMPLETE,
        Some(n) => EPISODE_BASE + i64::from(n.min(MAX_EPISODE)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_offset() {
        assert_eq!(map_season(Some(1)), SEASON_BASE + 1);
        assert_eq!(map_season(Some(5)), SEASON_BASE + 5);
    }

    #[test]
    fn test_complete_series_sentinel() {
        assert_eq!(map_season(None), SEASON_COMPLETE);
        assert_eq!(map_season(Some(0)), SEASON_COMPLETE);
    }

    #[test]
    fn test_season_clamped_to_table_max() {
        assert_eq!(map_season(Some(31)), SEASON_BASE + i64::from(MAX_SEASON));
        assert_eq!(map_season(Some(999)), map_season(Some(MAX_SEASON)));
    }

    #[test]
    fn test_episode_offset_and_sentinel() {
        assert_eq!(map_episode(Some(7)), EPISODE_BASE + 7);
        assert_eq!(map_episode(None), EPISODE_COMPLETE);
        assert_eq!(map_episode(Some(0)), EPISODE_COMPLETE);
        assert_eq!(map_episode(Some(200)), map_episode(Some(MAX_EPISODE)));
    }
}
