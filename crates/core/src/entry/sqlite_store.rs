//! SQLite-backed file entry store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::types::{EntryStatus, FileEntry};
use super::{FileEntryError, FileEntryStore};

/// SQLite-backed file entry store. Structured fields (per-tracker maps,
/// duplicate summary, attributes) are JSON columns.
pub struct SqliteFileEntryStore {
    conn: Mutex<Connection>,
}

impl SqliteFileEntryStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, FileEntryError> {
        let conn = Connection::open(path).map_err(|e| FileEntryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, FileEntryError> {
        let conn =
            Connection::open_in_memory().map_err(|e| FileEntryError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), FileEntryError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS file_entries (
                id TEXT PRIMARY KEY,
                file_path TEXT NOT NULL,
                release_name TEXT NOT NULL,
                status TEXT NOT NULL,
                torrent_paths TEXT NOT NULL DEFAULT '{}',
                upload_results TEXT NOT NULL DEFAULT '{}',
                tracker_statuses TEXT NOT NULL DEFAULT '{}',
                tmdb_id INTEGER,
                tmdb_type TEXT,
                duplicate_summary TEXT,
                category_id INTEGER,
                tag_ids TEXT NOT NULL DEFAULT '[]',
                mediainfo TEXT,
                attributes TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_file_entries_status ON file_entries(status);
            "#,
        )
        .map_err(|e| FileEntryError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<FileEntry> {
        let id: String = row.get(0)?;
        let file_path: String = row.get(1)?;
        let release_name: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let torrent_paths_json: String = row.get(4)?;
        let upload_results_json: String = row.get(5)?;
        let tracker_statuses_json: String = row.get(6)?;
        let tmdb_id: Option<u32> = row.get(7)?;
        let tmdb_type: Option<String> = row.get(8)?;
        let duplicate_summary_json: Option<String> = row.get(9)?;
        let category_id: Option<u32> = row.get(10)?;
        let tag_ids_json: String = row.get(11)?;
        let mediainfo: Option<String> = row.get(12)?;
        let attributes_json: String = row.get(13)?;
        let created_at_str: String = row.get(14)?;
        let updated_at_str: String = row.get(15)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(FileEntry {
            id,
            file_path,
            release_name,
            status: EntryStatus::parse(&status_str).unwrap_or(EntryStatus::Scanned),
            torrent_paths: serde_json::from_str(&torrent_paths_json).unwrap_or_default(),
            upload_results: serde_json::from_str(&upload_results_json).unwrap_or_default(),
            tracker_statuses: serde_json::from_str(&tracker_statuses_json).unwrap_or_default(),
            tmdb_id,
            tmdb_type,
            duplicate_summary: duplicate_summary_json
                .and_then(|json| serde_json::from_str(&json).ok()),
            category_id,
            tag_ids: serde_json::from_str(&tag_ids_json).unwrap_or_default(),
            mediainfo,
            attributes: serde_json::from_str(&attributes_json).unwrap_or_default(),
            created_at,
            updated_at,
        })
    }

    fn json_fields(
        entry: &FileEntry,
    ) -> Result<(String, String, String, Option<String>, String, String), FileEntryError> {
        let err = |e: serde_json::Error| FileEntryError::Database(e.to_string());
        Ok((
            serde_json::to_string(&entry.torrent_paths).map_err(err)?,
            serde_json::to_string(&entry.upload_results).map_err(err)?,
            serde_json::to_string(&entry.tracker_statuses).map_err(err)?,
            entry
                .duplicate_summary
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(err)?,
            serde_json::to_string(&entry.tag_ids).map_err(err)?,
            serde_json::to_string(&entry.attributes).map_err(err)?,
        ))
    }
}

const SELECT_COLUMNS: &str = "id, file_path, release_name, status, torrent_paths, \
     upload_results, tracker_statuses, tmdb_id, tmdb_type, duplicate_summary, category_id, \
     tag_ids, mediainfo, attributes, created_at, updated_at";

impl FileEntryStore for SqliteFileEntryStore {
    fn create(&self, entry: &FileEntry) -> Result<(), FileEntryError> {
        let (torrent_paths, upload_results, tracker_statuses, duplicate_summary, tag_ids, attributes) =
            Self::json_fields(entry)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO file_entries (id, file_path, release_name, status, torrent_paths, \
             upload_results, tracker_statuses, tmdb_id, tmdb_type, duplicate_summary, \
             category_id, tag_ids, mediainfo, attributes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.id,
                entry.file_path,
                entry.release_name,
                entry.status.as_str(),
                torrent_paths,
                upload_results,
                tracker_statuses,
                entry.tmdb_id,
                entry.tmdb_type,
                duplicate_summary,
                entry.category_id,
                tag_ids,
                entry.mediainfo,
                attributes,
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
            ],
        )
        .map_err(|e| FileEntryError::Database(e.to_string()))?;

        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<FileEntry>, FileEntryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM file_entries WHERE id = ?", SELECT_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![id], Self::row_to_entry)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        match rows.next() {
            Some(Ok(entry)) => Ok(Some(entry)),
            Some(Err(e)) => Err(FileEntryError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<FileEntry>, FileEntryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM file_entries ORDER BY created_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_entry)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| FileEntryError::Database(e.to_string()))
    }

    fn list_by_status(&self, status: EntryStatus) -> Result<Vec<FileEntry>, FileEntryError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM file_entries WHERE status = ? ORDER BY created_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_entry)
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| FileEntryError::Database(e.to_string()))
    }

    fn update(&self, entry: &FileEntry) -> Result<(), FileEntryError> {
        let (torrent_paths, upload_results, tracker_statuses, duplicate_summary, tag_ids, attributes) =
            Self::json_fields(entry)?;

        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE file_entries SET file_path = ?, release_name = ?, status = ?, \
                 torrent_paths = ?, upload_results = ?, tracker_statuses = ?, tmdb_id = ?, \
                 tmdb_type = ?, duplicate_summary = ?, category_id = ?, tag_ids = ?, \
                 mediainfo = ?, attributes = ?, updated_at = ? WHERE id = ?",
                params![
                    entry.file_path,
                    entry.release_name,
                    entry.status.as_str(),
                    torrent_paths,
                    upload_results,
                    tracker_statuses,
                    entry.tmdb_id,
                    entry.tmdb_type,
                    duplicate_summary,
                    entry.category_id,
                    tag_ids,
                    entry.mediainfo,
                    attributes,
                    Utc::now().to_rfc3339(),
                    entry.id,
                ],
            )
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FileEntryError::NotFound(entry.id.clone()));
        }
        Ok(())
    }

    fn set_status(&self, id: &str, status: EntryStatus) -> Result<(), FileEntryError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE file_entries SET status = ?, updated_at = ? WHERE id = ?",
                params![status.as_str(), Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FileEntryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), FileEntryError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM file_entries WHERE id = ?", params![id])
            .map_err(|e| FileEntryError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(FileEntryError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::UploadOutcome;

    fn entry(name: &str) -> FileEntry {
        FileEntry::new(format!("/data/{}.mkv", name), name)
    }

    #[test]
    fn test_create_and_get() {
        let store = SqliteFileEntryStore::in_memory().unwrap();
        let created = entry("Movie.2024.1080p");
        store.create(&created).unwrap();

        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.release_name, "Movie.2024.1080p");
        assert_eq!(fetched.status, EntryStatus::Scanned);
    }

    #[test]
    fn test_update_roundtrips_per_tracker_maps() {
        let store = SqliteFileEntryStore::in_memory().unwrap();
        let mut e = entry("Movie.2024.1080p");
        store.create(&e).unwrap();

        e.torrent_paths
            .insert("exm".to_string(), "/torrents/Movie_EXM.torrent".to_string());
        e.record_upload_result(
            "exm",
            UploadOutcome {
                success: true,
                torrent_id: Some("42".to_string()),
                torrent_url: None,
                message: None,
                raw_response: None,
            },
        );
        store.update(&e).unwrap();

        let fetched = store.get(&e.id).unwrap().unwrap();
        assert_eq!(
            fetched.torrent_paths["exm"],
            "/torrents/Movie_EXM.torrent"
        );
        assert!(fetched.upload_results["exm"].success);
        assert!(fetched.any_uploaded());
    }

    #[test]
    fn test_list_by_status() {
        let store = SqliteFileEntryStore::in_memory().unwrap();
        let a = entry("A");
        let b = entry("B");
        store.create(&a).unwrap();
        store.create(&b).unwrap();

        store.set_status(&a.id, EntryStatus::Prepared).unwrap();

        let prepared = store.list_by_status(EntryStatus::Prepared).unwrap();
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].id, a.id);
    }

    #[test]
    fn test_update_missing_returns_not_found() {
        let store = SqliteFileEntryStore::in_memory().unwrap();
        let result = store.update(&entry("ghost"));
        assert!(matches!(result, Err(FileEntryError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let store = SqliteFileEntryStore::in_memory().unwrap();
        let e = entry("Movie");
        store.create(&e).unwrap();
        store.delete(&e.id).unwrap();
        assert!(store.get(&e.id).unwrap().is_none());
    }
}
