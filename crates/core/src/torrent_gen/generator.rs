//! Per-tracker torrent generation.
//!
//! Each tracker gets its own private torrent for the same payload: its
//! announce URL, its source flag, and its piece-size strategy. Distinct
//! source flags produce distinct infohashes, which is what makes
//! cross-seeding the same file on several trackers possible.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};
use tracing::{debug, warn};

use crate::metrics::{TORRENTS_GENERATED, TORRENT_HASH_DURATION};
use crate::tracker::Tracker;

use super::bencode::{BencodeValue, DictBuilder};
use super::piece_size::piece_size;
use super::TorrentGenError;

/// A generated torrent file.
#[derive(Debug, Clone)]
pub struct GeneratedTorrent {
    pub path: PathBuf,
    pub info_hash: String,
    pub piece_size: u64,
    pub file_size: u64,
}

pub struct TorrentGenerator {
    output_dir: PathBuf,
}

impl TorrentGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Generate the torrent for one tracker.
    ///
    /// Writes `{release_name}_{SUFFIX}.torrent` into the output directory
    /// and returns the path together with the infohash.
    pub async fn generate_for_tracker(
        &self,
        file_path: &Path,
        tracker: &Tracker,
        release_name: &str,
    ) -> Result<GeneratedTorrent, TorrentGenError> {
        let announce = tracker
            .announce_url()
            .ok_or_else(|| TorrentGenError::NoAnnounceUrl(tracker.slug.clone()))?;

        let file_size = tokio::fs::metadata(file_path)
            .await
            .map_err(|e| TorrentGenError::Io(format!("{}: {}", file_path.display(), e)))?
            .len();

        let piece_len = piece_size(file_size, tracker.piece_strategy);

        // Hashing is CPU-bound; keep it off the async executor.
        let hash_path = file_path.to_path_buf();
        let hash_timer = TORRENT_HASH_DURATION.start_timer();
        let pieces = tokio::task::spawn_blocking(move || hash_pieces(&hash_path, piece_len))
            .await
            .map_err(|e| TorrentGenError::Io(e.to_string()))??;
        hash_timer.observe_duration();

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TorrentGenError::Io(format!("Bad file name: {}", file_path.display())))?;

        let mut info = DictBuilder::new()
            .insert_int("length", file_size as i64)
            .insert_str("name", file_name)
            .insert_int("piece length", piece_len as i64)
            .insert("pieces", BencodeValue::Bytes(pieces))
            .insert_int("private", 1);

        // An empty source flag is never written; its absence is meaningful.
        let source = tracker.source_flag.trim();
        if !source.is_empty() {
            info = info.insert_str("source", source);
        }
        let info = info.build();

        let info_hash = hex::encode(Sha1::digest(info.to_bytes()));

        let metainfo = DictBuilder::new()
            .insert_str("announce", &announce)
            .insert_str("created by", concat!("seedrelay ", env!("CARGO_PKG_VERSION")))
            .insert_int("creation date", chrono::Utc::now().timestamp())
            .insert("info", info)
            .build();

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| TorrentGenError::Io(e.to_string()))?;

        let out_path = self
            .output_dir
            .join(format!("{}_{}.torrent", release_name, tracker.torrent_suffix()));
        tokio::fs::write(&out_path, metainfo.to_bytes())
            .await
            .map_err(|e| TorrentGenError::Io(format!("{}: {}", out_path.display(), e)))?;

        debug!(
            tracker = %tracker.slug,
            path = %out_path.display(),
            piece_size = piece_len,
            "Generated torrent"
        );

        Ok(GeneratedTorrent {
            path: out_path,
            info_hash,
            piece_size: piece_len,
            file_size,
        })
    }

    /// Generate torrents for every enabled tracker.
    ///
    /// Failures are isolated per tracker: a failing tracker is logged and
    /// omitted from the result map, the rest proceed.
    pub async fn generate_all(
        &self,
        file_path: &Path,
        trackers: &[Tracker],
        release_name: &str,
    ) -> HashMap<String, GeneratedTorrent> {
        let mut results = HashMap::new();
        for tracker in trackers.iter().filter(|t| t.enabled) {
            match self.generate_for_tracker(file_path, tracker, release_name).await {
                Ok(generated) => {
                    TORRENTS_GENERATED.with_label_values(&["success"]).inc();
                    results.insert(tracker.id.clone(), generated);
                }
                Err(e) => {
                    warn!(tracker = %tracker.slug, error = %e, "Torrent generation failed");
                    TORRENTS_GENERATED.with_label_values(&["failed"]).inc();
                }
            }
        }
        results
    }
}

fn hash_pieces(path: &Path, piece_len: u64) -> Result<Vec<u8>, TorrentGenError> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| TorrentGenError::Io(format!("{}: {}", path.display(), e)))?;

    let mut pieces = Vec::new();
    let mut buf = vec![0u8; piece_len as usize];
    loop {
        let mut filled = 0;
        while filled < buf.len() {
            let read = file
                .read(&mut buf[filled..])
                .map_err(|e| TorrentGenError::Io(e.to_string()))?;
            if read == 0 {
                break;
            }
            filled += read;
        }
        if filled == 0 {
            break;
        }
        pieces.extend_from_slice(&Sha1::digest(&buf[..filled]));
        if filled < buf.len() {
            break;
        }
    }
    Ok(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tracker_fixture;
    use tempfile::TempDir;

    async fn payload_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, vec![0xAB; size]).await.unwrap();
        path
    }

    fn tracker_with_passkey(slug: &str, source_flag: &str) -> Tracker {
        let mut tracker = tracker_fixture(slug);
        tracker.passkey = Some("0123456789abcdef".to_string());
        tracker.source_flag = source_flag.to_string();
        tracker
    }

    #[tokio::test]
    async fn test_generate_writes_suffixed_file() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 100_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));
        let tracker = tracker_with_passkey("exm", "EXM");

        let generated = generator
            .generate_for_tracker(&payload, &tracker, "Movie.2024.1080p-GRP")
            .await
            .unwrap();

        assert!(generated.path.ends_with("Movie.2024.1080p-GRP_EXM.torrent"));
        assert!(generated.path.exists());
        assert_eq!(generated.file_size, 100_000);
        assert_eq!(generated.info_hash.len(), 40);
    }

    #[tokio::test]
    async fn test_torrent_is_private_with_source_flag() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 10_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));
        let tracker = tracker_with_passkey("exm", "EXM");

        let generated = generator
            .generate_for_tracker(&payload, &tracker, "Rel")
            .await
            .unwrap();
        let raw = tokio::fs::read(&generated.path).await.unwrap();
        let text = String::from_utf8_lossy(&raw);
        assert!(text.contains("7:privatei1e"));
        assert!(text.contains("6:source3:EXM"));
    }

    #[tokio::test]
    async fn test_empty_source_flag_omitted() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 10_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));
        let tracker = tracker_with_passkey("exm", "");

        let generated = generator
            .generate_for_tracker(&payload, &tracker, "Rel")
            .await
            .unwrap();
        let raw = tokio::fs::read(&generated.path).await.unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("6:source"));
    }

    #[tokio::test]
    async fn test_distinct_source_flags_distinct_infohashes() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 50_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));

        let a = generator
            .generate_for_tracker(&payload, &tracker_with_passkey("aaa", "AAA"), "Rel")
            .await
            .unwrap();
        let b = generator
            .generate_for_tracker(&payload, &tracker_with_passkey("bbb", "BBB"), "Rel")
            .await
            .unwrap();
        assert_ne!(a.info_hash, b.info_hash);
    }

    #[tokio::test]
    async fn test_missing_passkey_fails() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 10_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));
        let mut tracker = tracker_fixture("exm");
        tracker.passkey = None;

        let result = generator.generate_for_tracker(&payload, &tracker, "Rel").await;
        assert!(matches!(result, Err(TorrentGenError::NoAnnounceUrl(_))));
    }

    #[tokio::test]
    async fn test_generate_all_isolates_failures() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 10_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));

        let a = tracker_with_passkey("aaa", "AAA");
        // No passkey: generation for this tracker fails.
        let mut b = tracker_fixture("bbb");
        b.id = "t-bbb".to_string();
        b.passkey = None;
        let mut c = tracker_with_passkey("ccc", "CCC");
        c.id = "t-ccc".to_string();

        let results = generator
            .generate_all(&payload, &[a.clone(), b.clone(), c.clone()], "Rel")
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.contains_key(&a.id));
        assert!(!results.contains_key(&b.id));
        assert!(results.contains_key(&c.id));
    }

    #[tokio::test]
    async fn test_generate_all_skips_disabled() {
        let dir = TempDir::new().unwrap();
        let payload = payload_file(&dir, "release.mkv", 10_000).await;
        let generator = TorrentGenerator::new(dir.path().join("out"));

        let mut tracker = tracker_with_passkey("off", "OFF");
        tracker.enabled = false;
        let results = generator.generate_all(&payload, &[tracker], "Rel").await;
        assert!(results.is_empty());
    }

    #[test]
    fn test_hash_pieces_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        // 2.5 pieces at 16 KiB.
        std::fs::write(&path, vec![1u8; 40 * 1024]).unwrap();
        let pieces = hash_pieces(&path, 16 * 1024).unwrap();
        assert_eq!(pieces.len(), 3 * 20);
    }
}
