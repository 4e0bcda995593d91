//! Genre mapping from TMDB ids or genre names.

/// TMDB genre id to tracker genre code.
const GENRE_ID_TABLE: &[(u32, i64)] = &[
    (28, 1),    // Action
    (12, 2),    // Adventure
    (16, 3),    // Animation
    (35, 4),    // Comedy
    (80, 5),    // Crime
    (99, 6),    // Documentary
    (18, 7),    // Drama
    (10751, 8), // Family
    (14, 9),    // Fantasy
    (36, 10),   // History
    (27, 11),   // Horror
    (10402, 12), // Music
    (9648, 13), // Mystery
    (10749, 14), // Romance
    (878, 15),  // Science Fiction
    (53, 16),   // Thriller
    (10752, 17), // War
    (37, 18),   // Western
    // TV-specific TMDB ids folded into the closest movie genre.
    (10759, 1),  // Action & Adventure
    (10765, 15), // Sci-Fi & Fantasy
    (10768, 17), // War & Politics
];

/// Genre name (lowercased) to tracker genre code.
const GENRE_NAME_TABLE: &[(&str, i64)] = &[
    ("action", 1),
    ("adventure", 2),
    ("animation", 3),
    ("comedy", 4),
    ("crime", 5),
    ("documentary", 6),
    ("drama", 7),
    ("family", 8),
    ("fantasy", 9),
    ("history", 10),
    ("horror", 11),
    ("music", 12),
    ("mystery", 13),
    ("romance", 14),
    ("science fiction", 15),
    ("sci-fi", 15),
    ("thriller", 16),
    ("war", 17),
    ("western", 18),
];

/// Map a genre to a tracker code. TMDB ids are tried in order and win over
/// the name; an unrecognized genre maps to nothing rather than a guess.
pub fn map_genre(tmdb_genre_ids: &[u32], genre_name: Option<&str>) -> Option<i64> {
    for id in tmdb_genre_ids {
        for (table_id, code) in GENRE_ID_TABLE {
            if table_id == id {
                return Some(*code);
            }
        }
    }

    let name = genre_name?.trim().to_lowercase();
    for (table_name, code) in GENRE_NAME_TABLE {
        if name == *table_name {
            return Some(*code);
        }
    }
    for (table_name, code) in GENRE_NAME_TABLE {
        if name.contains(table_name) {
            return Some(*code);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmdb_id_lookup() {
        assert_eq!(map_genre(&[27], None), Some(11));
        assert_eq!(map_genre(&[878], None), Some(15));
    }

    #[test]
    fn test_first_known_id_wins() {
        // 99999 is unknown, 35 is Comedy.
        assert_eq!(map_genre(&[99999, 35, 18], None), Some(4));
    }

    #[test]
    fn test_id_wins_over_name() {
        assert_eq!(map_genre(&[18], Some("Horror")), Some(7));
    }

    #[test]
    fn test_name_lookup_case_insensitive() {
        assert_eq!(map_genre(&[], Some("Thriller")), Some(16));
        assert_eq!(map_genre(&[], Some("science fiction")), Some(15));
    }

    #[test]
    fn test_name_substring() {
        assert_eq!(map_genre(&[], Some("Action & Adventure")), Some(1));
    }

    #[test]
    fn test_unknown_maps_to_nothing() {
        assert_eq!(map_genre(&[], Some("telenovela")), None);
        assert_eq!(map_genre(&[424242], None), None);
        assert_eq!(map_genre(&[], None), None);
    }

    #[test]
    fn test_tv_genre_ids_folded() {
        assert_eq!(map_genre(&[10765], None), Some(15));
    }
}
