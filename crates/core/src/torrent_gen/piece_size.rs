//! Piece size selection.

use crate::tracker::PieceSizeStrategy;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// Ordered (upper size bound, piece size) pairs; the first bound the file
/// fits under wins, the last entry's piece size is the overflow default.
const STANDARD_TABLE: &[(u64, u64)] = &[
    (50 * MIB, 32 * KIB),
    (150 * MIB, 64 * KIB),
    (350 * MIB, 128 * KIB),
    (512 * MIB, 256 * KIB),
    (GIB, 512 * KIB),
    (2 * GIB, MIB),
];
const STANDARD_MAX: u64 = 2 * MIB;

/// Provider table, tuned for large releases: caps piece count lower by
/// allowing bigger pieces.
const PROVIDER_TABLE: &[(u64, u64)] = &[
    (64 * MIB, 64 * KIB),
    (128 * MIB, 128 * KIB),
    (256 * MIB, 256 * KIB),
    (512 * MIB, 512 * KIB),
    (GIB, MIB),
    (2 * GIB, 2 * MIB),
    (4 * GIB, 4 * MIB),
];
const PROVIDER_MAX: u64 = 8 * MIB;

fn from_table(file_size: u64, table: &[(u64, u64)], overflow: u64) -> u64 {
    for (bound, piece) in table {
        if file_size < *bound {
            return *piece;
        }
    }
    overflow
}

/// Auto strategy: smallest power of two that keeps the piece count around
/// 1500, clamped to [16 KiB, 16 MiB].
fn auto_piece_size(file_size: u64) -> u64 {
    const TARGET_PIECES: u64 = 1500;
    const MIN_PIECE: u64 = 16 * KIB;
    const MAX_PIECE: u64 = 16 * MIB;

    let mut piece = MIN_PIECE;
    while piece < MAX_PIECE && file_size / piece > TARGET_PIECES {
        piece *= 2;
    }
    piece
}

/// Select the piece size for a file under the given strategy.
pub fn piece_size(file_size: u64, strategy: PieceSizeStrategy) -> u64 {
    match strategy {
        PieceSizeStrategy::Auto => auto_piece_size(file_size),
        PieceSizeStrategy::Provider => from_table(file_size, PROVIDER_TABLE, PROVIDER_MAX),
        PieceSizeStrategy::Standard => from_table(file_size, STANDARD_TABLE, STANDARD_MAX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_thresholds() {
        assert_eq!(piece_size(10 * MIB, PieceSizeStrategy::Standard), 32 * KIB);
        assert_eq!(piece_size(100 * MIB, PieceSizeStrategy::Standard), 64 * KIB);
        assert_eq!(piece_size(600 * MIB, PieceSizeStrategy::Standard), 512 * KIB);
        // Past every bound: overflow default.
        assert_eq!(piece_size(50 * GIB, PieceSizeStrategy::Standard), 2 * MIB);
    }

    #[test]
    fn test_provider_table_thresholds() {
        assert_eq!(piece_size(10 * MIB, PieceSizeStrategy::Provider), 64 * KIB);
        assert_eq!(piece_size(3 * GIB, PieceSizeStrategy::Provider), 4 * MIB);
        assert_eq!(piece_size(100 * GIB, PieceSizeStrategy::Provider), 8 * MIB);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        // Exactly on a bound falls to the next row.
        assert_eq!(piece_size(50 * MIB, PieceSizeStrategy::Standard), 64 * KIB);
    }

    #[test]
    fn test_auto_is_power_of_two_and_clamped() {
        for size in [MIB, 100 * MIB, GIB, 10 * GIB, 200 * GIB] {
            let piece = piece_size(size, PieceSizeStrategy::Auto);
            assert!(piece.is_power_of_two());
            assert!((16 * KIB..=16 * MIB).contains(&piece));
        }
    }

    #[test]
    fn test_auto_targets_piece_count() {
        let piece = piece_size(GIB, PieceSizeStrategy::Auto);
        let pieces = GIB / piece;
        assert!(pieces <= 1500, "got {} pieces", pieces);
    }
}
