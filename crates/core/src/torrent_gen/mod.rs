//! Torrent generation: bencode, piece-size strategies, per-tracker output.

mod bencode;
mod generator;
mod piece_size;

use thiserror::Error;

pub use bencode::{BencodeValue, DictBuilder};
pub use generator::{GeneratedTorrent, TorrentGenerator};
pub use piece_size::piece_size;

/// Error type for torrent generation.
#[derive(Debug, Error)]
pub enum TorrentGenError {
    /// The tracker has no derivable announce URL (missing passkey).
    #[error("Tracker '{0}' has no announce URL")]
    NoAnnounceUrl(String),

    #[error("IO error: {0}")]
    Io(String),
}
