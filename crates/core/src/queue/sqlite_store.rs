//! SQLite-backed queue store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection};

use super::types::{QueueItem, QueuePriority, QueueStatus};
use super::{QueueError, QueueStore};

/// Longest error text persisted on a queue item.
const MAX_ERROR_LEN: usize = 500;

/// SQLite-backed queue store.
pub struct SqliteQueueStore {
    conn: Mutex<Connection>,
}

impl SqliteQueueStore {
    /// Create a new store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        let conn = Connection::open(path).map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS queue_items (
                id TEXT PRIMARY KEY,
                file_entry_id TEXT NOT NULL,
                priority TEXT NOT NULL DEFAULT 'normal',
                priority_key INTEGER NOT NULL DEFAULT 1,
                status TEXT NOT NULL DEFAULT 'pending',
                attempts INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL DEFAULT 3,
                last_error TEXT,
                skip_approval INTEGER NOT NULL DEFAULT 0,
                enqueued_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_queue_status ON queue_items(status);
            CREATE INDEX IF NOT EXISTS idx_queue_dispatch
                ON queue_items(status, priority_key, enqueued_at);
            "#,
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_item(row: &rusqlite::Row) -> rusqlite::Result<QueueItem> {
        let id: String = row.get(0)?;
        let file_entry_id: String = row.get(1)?;
        let priority_str: String = row.get(2)?;
        let status_str: String = row.get(3)?;
        let attempts: u32 = row.get(4)?;
        let max_attempts: u32 = row.get(5)?;
        let last_error: Option<String> = row.get(6)?;
        let skip_approval: bool = row.get(7)?;
        let enqueued_at_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;

        let enqueued_at = DateTime::parse_from_rfc3339(&enqueued_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        let updated_at = DateTime::parse_from_rfc3339(&updated_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(QueueItem {
            id,
            file_entry_id,
            priority: QueuePriority::parse(&priority_str).unwrap_or(QueuePriority::Normal),
            status: QueueStatus::parse(&status_str).unwrap_or(QueueStatus::Pending),
            attempts,
            max_attempts,
            last_error,
            skip_approval,
            enqueued_at,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, file_entry_id, priority, status, attempts, max_attempts, \
     last_error, skip_approval, enqueued_at, updated_at";

impl QueueStore for SqliteQueueStore {
    fn enqueue(
        &self,
        file_entry_id: &str,
        priority: QueuePriority,
        skip_approval: bool,
        max_attempts: u32,
    ) -> Result<QueueItem, QueueError> {
        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO queue_items (id, file_entry_id, priority, priority_key, status, \
             attempts, max_attempts, skip_approval, enqueued_at, updated_at) \
             VALUES (?, ?, ?, ?, 'pending', 0, ?, ?, ?, ?)",
            params![
                id,
                file_entry_id,
                priority.as_str(),
                priority.sort_key(),
                max_attempts,
                skip_approval,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(QueueItem {
            id,
            file_entry_id: file_entry_id.to_string(),
            priority,
            status: QueueStatus::Pending,
            attempts: 0,
            max_attempts,
            last_error: None,
            skip_approval,
            enqueued_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: &str) -> Result<Option<QueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM queue_items WHERE id = ?", SELECT_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let mut rows = stmt
            .query_map(params![id], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        match rows.next() {
            Some(Ok(item)) => Ok(Some(item)),
            Some(Err(e)) => Err(QueueError::Database(e.to_string())),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<QueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM queue_items ORDER BY priority_key ASC, enqueued_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn list_by_status(&self, status: QueueStatus) -> Result<Vec<QueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM queue_items WHERE status = ? \
             ORDER BY priority_key ASC, enqueued_at ASC",
            SELECT_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![status.as_str()], Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn fetch_pending(
        &self,
        limit: usize,
        exclude: &[String],
    ) -> Result<Vec<QueueItem>, QueueError> {
        let conn = self.conn.lock().unwrap();

        // Exclusion list is small (bounded by max_concurrent), inline it.
        let placeholders = exclude.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let sql = if exclude.is_empty() {
            format!(
                "SELECT {} FROM queue_items WHERE status = 'pending' \
                 ORDER BY priority_key ASC, enqueued_at ASC LIMIT ?",
                SELECT_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM queue_items WHERE status = 'pending' AND id NOT IN ({}) \
                 ORDER BY priority_key ASC, enqueued_at ASC LIMIT ?",
                SELECT_COLUMNS, placeholders
            )
        };

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        let mut bound: Vec<&dyn rusqlite::ToSql> = Vec::new();
        for id in exclude {
            bound.push(id);
        }
        let limit = limit as i64;
        bound.push(&limit);

        let rows = stmt
            .query_map(bound.as_slice(), Self::row_to_item)
            .map_err(|e| QueueError::Database(e.to_string()))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| QueueError::Database(e.to_string()))
    }

    fn claim(&self, id: &str) -> Result<bool, QueueError> {
        let conn = self.conn.lock().unwrap();
        // The status guard makes the pending re-check and the transition one
        // atomic statement, closing the race with a concurrent cancel.
        let changed = conn
            .execute(
                "UPDATE queue_items SET status = 'processing', attempts = attempts + 1, \
                 updated_at = ? WHERE id = ? AND status = 'pending'",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(changed == 1)
    }

    fn mark_completed(&self, id: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE queue_items SET status = 'completed', last_error = NULL, \
                 updated_at = ? WHERE id = ? AND status = 'processing'",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if changed == 0 {
            return Err(QueueError::InvalidState(format!(
                "Item {} is not processing",
                id
            )));
        }
        Ok(())
    }

    fn mark_failed(
        &self,
        id: &str,
        error: &str,
        retryable: bool,
    ) -> Result<QueueStatus, QueueError> {
        let truncated: String = error.chars().take(MAX_ERROR_LEN).collect();

        let conn = self.conn.lock().unwrap();
        let (attempts, max_attempts): (u32, u32) = conn
            .query_row(
                "SELECT attempts, max_attempts FROM queue_items WHERE id = ? \
                 AND status = 'processing'",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    QueueError::InvalidState(format!("Item {} is not processing", id))
                }
                other => QueueError::Database(other.to_string()),
            })?;

        let next = if retryable && attempts < max_attempts {
            QueueStatus::Pending
        } else {
            QueueStatus::Failed
        };

        conn.execute(
            "UPDATE queue_items SET status = ?, last_error = ?, updated_at = ? WHERE id = ?",
            params![next.as_str(), truncated, Utc::now().to_rfc3339(), id],
        )
        .map_err(|e| QueueError::Database(e.to_string()))?;

        Ok(next)
    }

    fn cancel(&self, id: &str) -> Result<(), QueueError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE queue_items SET status = 'cancelled', updated_at = ? \
                 WHERE id = ? AND status = 'pending'",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;

        if changed == 0 {
            let exists = self.get_exists(&conn, id)?;
            return if exists {
                Err(QueueError::InvalidState(format!(
                    "Item {} is not pending; only pending items can be cancelled",
                    id
                )))
            } else {
                Err(QueueError::NotFound(id.to_string()))
            };
        }
        Ok(())
    }

    fn retry(&self, id: &str) -> Result<QueueItem, QueueError> {
        {
            let conn = self.conn.lock().unwrap();
            let changed = conn
                .execute(
                    "UPDATE queue_items SET status = 'pending', attempts = 0, \
                     last_error = NULL, updated_at = ? \
                     WHERE id = ? AND status IN ('failed', 'cancelled')",
                    params![Utc::now().to_rfc3339(), id],
                )
                .map_err(|e| QueueError::Database(e.to_string()))?;

            if changed == 0 {
                let exists = self.get_exists(&conn, id)?;
                return if exists {
                    Err(QueueError::InvalidState(format!(
                        "Item {} is not failed or cancelled",
                        id
                    )))
                } else {
                    Err(QueueError::NotFound(id.to_string()))
                };
            }
        }

        self.get(id)?
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    fn cleanup_completed(&self, ttl_hours: u32) -> Result<usize, QueueError> {
        let cutoff = Utc::now() - Duration::hours(i64::from(ttl_hours));
        let conn = self.conn.lock().unwrap();
        let deleted = conn
            .execute(
                "DELETE FROM queue_items WHERE status = 'completed' AND updated_at < ?",
                params![cutoff.to_rfc3339()],
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;
        Ok(deleted)
    }
}

impl SqliteQueueStore {
    fn get_exists(&self, conn: &Connection, id: &str) -> Result<bool, QueueError> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM queue_items WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| QueueError::Database(e.to_string()))?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteQueueStore {
        SqliteQueueStore::in_memory().unwrap()
    }

    #[test]
    fn test_enqueue_starts_pending_with_zero_attempts() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.attempts, 0);
    }

    #[test]
    fn test_dispatch_order_priority_then_fifo() {
        let store = store();
        let low = store.enqueue("f-low", QueuePriority::Low, false, 3).unwrap();
        let n1 = store.enqueue("f-n1", QueuePriority::Normal, false, 3).unwrap();
        let high = store.enqueue("f-high", QueuePriority::High, false, 3).unwrap();
        let n2 = store.enqueue("f-n2", QueuePriority::Normal, false, 3).unwrap();

        let fetched = store.fetch_pending(10, &[]).unwrap();
        let ids: Vec<&str> = fetched.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec![&high.id, &n1.id, &n2.id, &low.id]);
    }

    #[test]
    fn test_fetch_pending_excludes_active_set() {
        let store = store();
        let a = store.enqueue("fa", QueuePriority::Normal, false, 3).unwrap();
        let b = store.enqueue("fb", QueuePriority::Normal, false, 3).unwrap();

        let fetched = store.fetch_pending(10, &[a.id.clone()]).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, b.id);
    }

    #[test]
    fn test_claim_increments_attempts_exactly_once() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();

        assert!(store.claim(&item.id).unwrap());
        let claimed = store.get(&item.id).unwrap().unwrap();
        assert_eq!(claimed.status, QueueStatus::Processing);
        assert_eq!(claimed.attempts, 1);

        // A second claim on a processing item is a no-op.
        assert!(!store.claim(&item.id).unwrap());
        assert_eq!(store.get(&item.id).unwrap().unwrap().attempts, 1);
    }

    #[test]
    fn test_three_retryable_failures_end_terminally_failed() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();

        for attempt in 1..=3u32 {
            assert!(store.claim(&item.id).unwrap());
            let status = store.mark_failed(&item.id, "timeout", true).unwrap();
            if attempt < 3 {
                assert_eq!(status, QueueStatus::Pending);
            } else {
                assert_eq!(status, QueueStatus::Failed);
            }
        }

        let final_item = store.get(&item.id).unwrap().unwrap();
        assert_eq!(final_item.status, QueueStatus::Failed);
        assert_eq!(final_item.attempts, 3);
        assert_eq!(final_item.last_error.as_deref(), Some("timeout"));

        // Terminally failed: never fetched again.
        assert!(store.fetch_pending(10, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_two_failures_then_success_completes_with_three_attempts() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();

        for _ in 0..2 {
            assert!(store.claim(&item.id).unwrap());
            assert_eq!(
                store.mark_failed(&item.id, "timeout", true).unwrap(),
                QueueStatus::Pending
            );
        }

        assert!(store.claim(&item.id).unwrap());
        store.mark_completed(&item.id).unwrap();

        let final_item = store.get(&item.id).unwrap().unwrap();
        assert_eq!(final_item.status, QueueStatus::Completed);
        assert_eq!(final_item.attempts, 3);
        assert!(final_item.last_error.is_none());
    }

    #[test]
    fn test_non_retryable_failure_is_immediately_terminal() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();

        assert!(store.claim(&item.id).unwrap());
        let status = store.mark_failed(&item.id, "rejected by tracker", false).unwrap();
        assert_eq!(status, QueueStatus::Failed);
        assert_eq!(store.get(&item.id).unwrap().unwrap().attempts, 1);
    }

    #[test]
    fn test_cancel_only_while_pending() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        store.cancel(&item.id).unwrap();
        assert_eq!(
            store.get(&item.id).unwrap().unwrap().status,
            QueueStatus::Cancelled
        );

        let processing = store.enqueue("f2", QueuePriority::Normal, false, 3).unwrap();
        assert!(store.claim(&processing.id).unwrap());
        let result = store.cancel(&processing.id);
        assert!(matches!(result, Err(QueueError::InvalidState(_))));
    }

    #[test]
    fn test_cancelled_item_cannot_be_claimed() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        store.cancel(&item.id).unwrap();
        assert!(!store.claim(&item.id).unwrap());
    }

    #[test]
    fn test_retry_resets_failed_item() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 1).unwrap();
        assert!(store.claim(&item.id).unwrap());
        store.mark_failed(&item.id, "boom", true).unwrap();

        let retried = store.retry(&item.id).unwrap();
        assert_eq!(retried.status, QueueStatus::Pending);
        assert_eq!(retried.attempts, 0);
        assert!(retried.last_error.is_none());
    }

    #[test]
    fn test_retry_rejects_active_item() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        assert!(matches!(
            store.retry(&item.id),
            Err(QueueError::InvalidState(_))
        ));
    }

    #[test]
    fn test_cleanup_completed_respects_ttl() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        assert!(store.claim(&item.id).unwrap());
        store.mark_completed(&item.id).unwrap();

        // Fresh item is inside any reasonable TTL.
        assert_eq!(store.cleanup_completed(1).unwrap(), 0);
        // TTL of zero hours sweeps everything completed.
        assert_eq!(store.cleanup_completed(0).unwrap(), 1);
        assert!(store.get(&item.id).unwrap().is_none());
    }

    #[test]
    fn test_error_text_truncated() {
        let store = store();
        let item = store.enqueue("f1", QueuePriority::Normal, false, 3).unwrap();
        assert!(store.claim(&item.id).unwrap());

        let long_error = "x".repeat(2000);
        store.mark_failed(&item.id, &long_error, false).unwrap();
        let stored = store.get(&item.id).unwrap().unwrap();
        assert_eq!(stored.last_error.unwrap().len(), 500);
    }
}
