//! Queue item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dispatch priority. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueuePriority {
    High,
    Normal,
    Low,
}

impl QueuePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueuePriority::High => "high",
            QueuePriority::Normal => "normal",
            QueuePriority::Low => "low",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(QueuePriority::High),
            "normal" => Some(QueuePriority::Normal),
            "low" => Some(QueuePriority::Low),
            _ => None,
        }
    }

    /// Numeric sort key, ascending dispatch order.
    pub fn sort_key(&self) -> i64 {
        match self {
            QueuePriority::High => 0,
            QueuePriority::Normal => 1,
            QueuePriority::Low => 2,
        }
    }
}

/// Queue item state. Transitions only
/// pending -> processing -> {completed | pending (retry) | failed},
/// plus pending -> cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Processing => "processing",
            QueueStatus::Completed => "completed",
            QueueStatus::Failed => "failed",
            QueueStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(QueueStatus::Pending),
            "processing" => Some(QueueStatus::Processing),
            "completed" => Some(QueueStatus::Completed),
            "failed" => Some(QueueStatus::Failed),
            "cancelled" => Some(QueueStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Completed | QueueStatus::Failed | QueueStatus::Cancelled
        )
    }
}

/// One queued unit of work, wrapping a file entry reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub file_entry_id: String,
    pub priority: QueuePriority,
    pub status: QueueStatus,
    /// Incremented exactly once per dispatch, at claim time.
    pub attempts: u32,
    pub max_attempts: u32,
    pub last_error: Option<String>,
    pub skip_approval: bool,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_sort_order() {
        assert!(QueuePriority::High.sort_key() < QueuePriority::Normal.sort_key());
        assert!(QueuePriority::Normal.sort_key() < QueuePriority::Low.sort_key());
    }

    #[test]
    fn test_status_roundtrip() {
        for status in [
            QueueStatus::Pending,
            QueueStatus::Processing,
            QueueStatus::Completed,
            QueueStatus::Failed,
            QueueStatus::Cancelled,
        ] {
            assert_eq!(QueueStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_terminal_states() {
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(!QueueStatus::Processing.is_terminal());
        assert!(QueueStatus::Completed.is_terminal());
        assert!(QueueStatus::Failed.is_terminal());
        assert!(QueueStatus::Cancelled.is_terminal());
    }
}
