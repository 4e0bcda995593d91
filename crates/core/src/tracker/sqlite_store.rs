//! SQLite-backed tracker store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{CreateTrackerRequest, Tracker, TrackerStore, TrackerStoreError};

/// SQLite-backed tracker store.
pub struct SqliteTrackerStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackerStore {
    /// Create a new SQLite tracker store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TrackerStoreError> {
        let conn =
            Connection::open(path).map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite tracker store (useful for testing).
    pub fn in_memory() -> Result<Self, TrackerStoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TrackerStoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS trackers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                base_url TEXT NOT NULL,
                passkey TEXT,
                api_key TEXT,
                source_flag TEXT NOT NULL DEFAULT '',
                piece_strategy TEXT NOT NULL,
                adapter_kind TEXT NOT NULL,
                default_category_id INTEGER,
                default_subcategory_id INTEGER,
                category_mapping TEXT NOT NULL DEFAULT '[]',
                announce_template TEXT,
                naming_template TEXT,
                enabled INTEGER NOT NULL DEFAULT 1,
                upload_enabled INTEGER NOT NULL DEFAULT 1,
                priority INTEGER NOT NULL DEFAULT 0,
                requires_cloudflare_bypass INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_trackers_priority ON trackers(priority);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_trackers_slug ON trackers(slug);
            "#,
        )
        .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_tracker(row: &rusqlite::Row) -> rusqlite::Result<Tracker> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let slug: String = row.get(2)?;
        let base_url: String = row.get(3)?;
        let passkey: Option<String> = row.get(4)?;
        let api_key: Option<String> = row.get(5)?;
        let source_flag: String = row.get(6)?;
        let piece_strategy_json: String = row.get(7)?;
        let adapter_kind_json: String = row.get(8)?;
        let default_category_id: Option<u32> = row.get(9)?;
        let default_subcategory_id: Option<u32> = row.get(10)?;
        let category_mapping_json: String = row.get(11)?;
        let announce_template: Option<String> = row.get(12)?;
        let naming_template: Option<String> = row.get(13)?;
        let enabled: bool = row.get(14)?;
        let upload_enabled: bool = row.get(15)?;
        let priority: u16 = row.get(16)?;
        let requires_cloudflare_bypass: bool = row.get(17)?;
        let created_at_str: String = row.get(18)?;
        let updated_at_str: String = row.get(19)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let piece_strategy = serde_json::from_str(&piece_strategy_json)
            .unwrap_or(super::PieceSizeStrategy::Auto);
        let adapter_kind =
            serde_json::from_str(&adapter_kind_json).unwrap_or(super::AdapterKind::Fallback);
        let category_mapping =
            serde_json::from_str(&category_mapping_json).unwrap_or_default();

        Ok(Tracker {
            id,
            name,
            slug,
            base_url,
            passkey,
            api_key,
            source_flag,
            piece_strategy,
            adapter_kind,
            default_category_id,
            default_subcategory_id,
            category_mapping,
            announce_template,
            naming_template,
            enabled,
            upload_enabled,
            priority,
            requires_cloudflare_bypass,
            created_at,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, name, slug, base_url, passkey, api_key, source_flag, \
     piece_strategy, adapter_kind, default_category_id, default_subcategory_id, \
     category_mapping, announce_template, naming_template, enabled, upload_enabled, \
     priority, requires_cloudflare_bypass, created_at, updated_at";

impl TrackerStore for SqliteTrackerStore {
    fn create(&self, request: CreateTrackerRequest) -> Result<Tracker, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let piece_strategy_json = serde_json::to_string(&request.piece_strategy)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        let adapter_kind_json = serde_json::to_string(&request.adapter_kind)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        let category_mapping_json = serde_json::to_string(&request.category_mapping)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let result = conn.execute(
            "INSERT INTO trackers (id, name, slug, base_url, passkey, api_key, source_flag, \
             piece_strategy, adapter_kind, default_category_id, default_subcategory_id, \
             category_mapping, announce_template, naming_template, enabled, upload_enabled, \
             priority, requires_cloudflare_bypass, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id,
                request.name,
                request.slug,
                request.base_url,
                request.passkey,
                request.api_key,
                request.source_flag,
                piece_strategy_json,
                adapter_kind_json,
                request.default_category_id,
                request.default_subcategory_id,
                category_mapping_json,
                request.announce_template,
                request.naming_template,
                request.enabled,
                request.upload_enabled,
                request.priority,
                request.requires_cloudflare_bypass,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(TrackerStoreError::DuplicateSlug(request.slug));
            }
            Err(e) => return Err(TrackerStoreError::Database(e.to_string())),
        }

        Ok(Tracker {
            id,
            name: request.name,
            slug: request.slug,
            base_url: request.base_url,
            passkey: request.passkey,
            api_key: request.api_key,
            source_flag: request.source_flag,
            piece_strategy: request.piece_strategy,
            adapter_kind: request.adapter_kind,
            default_category_id: request.default_category_id,
            default_subcategory_id: request.default_subcategory_id,
            category_mapping: request.category_mapping,
            announce_template: request.announce_template,
            naming_template: request.naming_template,
            enabled: request.enabled,
            upload_enabled: request.upload_enabled,
            priority: request.priority,
            requires_cloudflare_bypass: request.requires_cloudflare_bypass,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Tracker>, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM trackers WHERE id = ?", SELECT_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![id], Self::row_to_tracker)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        match rows.next() {
            Some(Ok(tracker)) => Ok(Some(tracker)),
            Some(Err(e)) => Err(TrackerStoreError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    fn get_by_slug(&self, slug: &str) -> Result<Option<Tracker>, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM trackers WHERE slug = ?", SELECT_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![slug], Self::row_to_tracker)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        match rows.next() {
            Some(Ok(tracker)) => Ok(Some(tracker)),
            Some(Err(e)) => Err(TrackerStoreError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Tracker>, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM trackers ORDER BY priority ASC, slug ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_tracker)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| TrackerStoreError::Database(e.to_string()))
    }

    fn list_upload_enabled(&self) -> Result<Vec<Tracker>, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM trackers WHERE enabled = 1 AND upload_enabled = 1 \
             ORDER BY priority ASC, slug ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_tracker)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| TrackerStoreError::Database(e.to_string()))
    }

    fn update(&self, tracker: &Tracker) -> Result<Tracker, TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let piece_strategy_json = serde_json::to_string(&tracker.piece_strategy)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        let adapter_kind_json = serde_json::to_string(&tracker.adapter_kind)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;
        let category_mapping_json = serde_json::to_string(&tracker.category_mapping)
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        let changed = conn
            .execute(
                "UPDATE trackers SET name = ?, base_url = ?, passkey = ?, api_key = ?, \
                 source_flag = ?, piece_strategy = ?, adapter_kind = ?, \
                 default_category_id = ?, default_subcategory_id = ?, category_mapping = ?, \
                 announce_template = ?, naming_template = ?, enabled = ?, upload_enabled = ?, \
                 priority = ?, requires_cloudflare_bypass = ?, updated_at = ? WHERE id = ?",
                params![
                    tracker.name,
                    tracker.base_url,
                    tracker.passkey,
                    tracker.api_key,
                    tracker.source_flag,
                    piece_strategy_json,
                    adapter_kind_json,
                    tracker.default_category_id,
                    tracker.default_subcategory_id,
                    category_mapping_json,
                    tracker.announce_template,
                    tracker.naming_template,
                    tracker.enabled,
                    tracker.upload_enabled,
                    tracker.priority,
                    tracker.requires_cloudflare_bypass,
                    now.to_rfc3339(),
                    tracker.id,
                ],
            )
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TrackerStoreError::NotFound(tracker.id.clone()));
        }

        let mut updated = tracker.clone();
        updated.updated_at = now;
        Ok(updated)
    }

    fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), TrackerStoreError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE trackers SET enabled = ?, updated_at = ? WHERE id = ?",
                params![enabled, Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(TrackerStoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<Tracker, TrackerStoreError> {
        let tracker = self
            .get(id)?
            .ok_or_else(|| TrackerStoreError::NotFound(id.to_string()))?;

        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM trackers WHERE id = ?", params![id])
            .map_err(|e| TrackerStoreError::Database(e.to_string()))?;

        Ok(tracker)
    }
}
