//! Durable embedded-DB queue with retry counters and a dead-letter sink
//! (spec.md §4.5).

use crate::error::QueueError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

/// A row dequeued from `pending`, ready to be retried against the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedItem {
    pub id: i64,
    pub record: Value,
    pub producer_id: String,
    pub file_path: String,
    pub retry_count: i64,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// A row that exceeded `max_retries` and was moved to `dead_letter`.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterItem {
    pub id: i64,
    pub record: Value,
    pub producer_id: String,
    pub file_path: String,
    pub retry_count: i64,
    pub error_reason: String,
    pub created_at: DateTime<Utc>,
}

/// Aggregate counters surfaced through the health interface (spec.md §6).
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineQueueStats {
    pub pending_total: i64,
    pub dead_letter_total: i64,
    pub utilisation: f64,
    pub per_producer: HashMap<String, i64>,
}

/// Durable queue backed by a single embedded-database file on local disk.
pub struct OfflineQueue {
    conn: Mutex<Connection>,
    max_size: i64,
    max_retries: i64,
}

impl OfflineQueue {
    /// Opens (creating if absent) the queue file, its schema, and indices.
    /// Sets WAL journal mode (crash-resilient, low-latency writes) and a
    /// busy timeout so concurrent readers/writers do not fail immediately.
    pub fn open(path: &Path, max_size: i64, max_retries: i64) -> Result<Self, QueueError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS pending (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_json TEXT NOT NULL,
                producer_id TEXT NOT NULL,
                file_path TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_pending_retry_count ON pending(retry_count);
            CREATE INDEX IF NOT EXISTS idx_pending_producer_id ON pending(producer_id);
            CREATE TABLE IF NOT EXISTS dead_letter (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_json TEXT NOT NULL,
                producer_id TEXT NOT NULL,
                file_path TEXT NOT NULL,
                retry_count INTEGER NOT NULL,
                error_reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_dead_letter_producer_id ON dead_letter(producer_id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_size,
            max_retries,
        })
    }

    pub fn open_in_memory(max_size: i64, max_retries: i64) -> Result<Self, QueueError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE pending (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_json TEXT NOT NULL,
                producer_id TEXT NOT NULL,
                file_path TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                last_error TEXT
            );
            CREATE INDEX idx_pending_retry_count ON pending(retry_count);
            CREATE INDEX idx_pending_producer_id ON pending(producer_id);
            CREATE TABLE dead_letter (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                record_json TEXT NOT NULL,
                producer_id TEXT NOT NULL,
                file_path TEXT NOT NULL,
                retry_count INTEGER NOT NULL,
                error_reason TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX idx_dead_letter_producer_id ON dead_letter(producer_id);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_size,
            max_retries,
        })
    }

    /// Serialises `record` and appends it. If the row count would reach
    /// `max_size`, evicts the oldest rows (by `created_at`, ascending) down
    /// to `max_size - 1` first, logging the evicted producers.
    pub fn enqueue(&self, record: &Value, producer_id: &str, file_path: &str) -> Result<i64, QueueError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?;
        if count + 1 > self.max_size {
            let evict_n = count + 1 - self.max_size;
            let mut stmt = conn.prepare(
                "SELECT id, producer_id FROM pending ORDER BY created_at ASC, id ASC LIMIT ?1",
            )?;
            let evicted: Vec<(i64, String)> = stmt
                .query_map(params![evict_n], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<_, _>>()?;
            for (id, producer) in &evicted {
                conn.execute("DELETE FROM pending WHERE id = ?1", params![id])?;
                warn!(producer = %producer, row_id = id, "evicted oldest row to respect offline queue max_size");
            }
        }

        let record_json = serde_json::to_string(record)?;
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO pending (record_json, producer_id, file_path, retry_count, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![record_json, producer_id, file_path, created_at],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Returns up to `limit` rows ordered lowest-retry-first, then FIFO.
    pub fn dequeue_batch(&self, limit: i64) -> Result<Vec<QueuedItem>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, record_json, producer_id, file_path, retry_count, created_at, last_error \
             FROM pending ORDER BY retry_count ASC, id ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let record_json: String = row.get(1)?;
                let created_at: String = row.get(5)?;
                Ok((row.get::<_, i64>(0)?, record_json, row.get::<_, String>(2)?, row.get::<_, String>(3)?, row.get::<_, i64>(4)?, created_at, row.get::<_, Option<String>>(6)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, record_json, producer_id, file_path, retry_count, created_at, last_error)| {
                Ok(QueuedItem {
                    id,
                    record: serde_json::from_str(&record_json)?,
                    producer_id,
                    file_path,
                    retry_count,
                    created_at: parse_timestamp(&created_at),
                    last_error,
                })
            })
            .collect()
    }

    pub fn mark_completed(&self, ids: &[i64]) -> Result<(), QueueError> {
        let conn = self.conn.lock();
        for id in ids {
            conn.execute("DELETE FROM pending WHERE id = ?1", params![id])?;
        }
        Ok(())
    }

    /// If `retry_count >= max_retries - 1`, moves the row to `dead_letter`
    /// with the incremented count and returns `moved = true`; otherwise
    /// increments the counter and records `last_error`, returning `false`.
    pub fn mark_failed(&self, id: i64, error: &str) -> Result<bool, QueueError> {
        let conn = self.conn.lock();
        let row: Option<(String, String, String, i64, String)> = conn
            .query_row(
                "SELECT record_json, producer_id, file_path, retry_count, created_at FROM pending WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;
        let Some((record_json, producer_id, file_path, retry_count, created_at)) = row else {
            return Err(QueueError::PendingRowNotFound(id));
        };

        let new_retry_count = retry_count + 1;
        if retry_count >= self.max_retries - 1 {
            conn.execute(
                "INSERT INTO dead_letter (record_json, producer_id, file_path, retry_count, error_reason, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![record_json, producer_id, file_path, new_retry_count, error, created_at],
            )?;
            conn.execute("DELETE FROM pending WHERE id = ?1", params![id])?;
            Ok(true)
        } else {
            conn.execute(
                "UPDATE pending SET retry_count = ?1, last_error = ?2 WHERE id = ?3",
                params![new_retry_count, error, id],
            )?;
            Ok(false)
        }
    }

    pub fn count(&self) -> Result<i64, QueueError> {
        let conn = self.conn.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?)
    }

    pub fn dead_letter_count(&self) -> Result<i64, QueueError> {
        let conn = self.conn.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM dead_letter", [], |row| row.get(0))?)
    }

    pub fn get_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetterItem>, QueueError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, record_json, producer_id, file_path, retry_count, error_reason, created_at \
             FROM dead_letter ORDER BY id ASC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, record_json, producer_id, file_path, retry_count, error_reason, created_at)| {
                Ok(DeadLetterItem {
                    id,
                    record: serde_json::from_str(&record_json)?,
                    producer_id,
                    file_path,
                    retry_count,
                    error_reason,
                    created_at: parse_timestamp(&created_at),
                })
            })
            .collect()
    }

    /// Re-inserts a dead-lettered row into `pending` with `retry_count = 0`.
    pub fn retry_dead_letter(&self, id: i64) -> Result<(), QueueError> {
        let conn = self.conn.lock();
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT record_json, producer_id, file_path FROM dead_letter WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((record_json, producer_id, file_path)) = row else {
            return Err(QueueError::DeadLetterRowNotFound(id));
        };
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO pending (record_json, producer_id, file_path, retry_count, created_at) \
             VALUES (?1, ?2, ?3, 0, ?4)",
            params![record_json, producer_id, file_path, created_at],
        )?;
        conn.execute("DELETE FROM dead_letter WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn stats(&self) -> Result<OfflineQueueStats, QueueError> {
        let conn = self.conn.lock();
        let pending_total: i64 = conn.query_row("SELECT COUNT(*) FROM pending", [], |row| row.get(0))?;
        let dead_letter_total: i64 =
            conn.query_row("SELECT COUNT(*) FROM dead_letter", [], |row| row.get(0))?;

        let mut stmt = conn.prepare("SELECT producer_id, COUNT(*) FROM pending GROUP BY producer_id")?;
        let per_producer: HashMap<String, i64> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<_, _>>()?;

        let utilisation = if self.max_size > 0 {
            pending_total as f64 / self.max_size as f64
        } else {
            0.0
        };

        Ok(OfflineQueueStats {
            pending_total,
            dead_letter_total,
            utilisation,
            per_producer,
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn queue(max_size: i64, max_retries: i64) -> OfflineQueue {
        OfflineQueue::open_in_memory(max_size, max_retries).unwrap()
    }

    #[test]
    fn enqueue_and_dequeue_round_trip() {
        let q = queue(100, 3);
        let id = q.enqueue(&json!({"session_id": "1"}), "PC01", "/a.json").unwrap();
        assert_eq!(q.count().unwrap(), 1);
        let batch = q.dequeue_batch(50).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, id);
        assert_eq!(batch[0].producer_id, "PC01");
        assert_eq!(batch[0].retry_count, 0);
    }

    #[test]
    fn mark_completed_deletes_rows() {
        let q = queue(100, 3);
        let id = q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        q.mark_completed(&[id]).unwrap();
        assert_eq!(q.count().unwrap(), 0);
    }

    #[test]
    fn dequeue_orders_by_retry_count_then_fifo() {
        let q = queue(100, 5);
        let a = q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        let b = q.enqueue(&json!(2), "PC01", "/b.json").unwrap();
        q.mark_failed(a, "boom").unwrap();
        let batch = q.dequeue_batch(50).unwrap();
        assert_eq!(batch[0].id, b);
        assert_eq!(batch[1].id, a);
    }

    #[test]
    fn mark_failed_increments_until_ceiling_then_dead_letters() {
        let q = queue(100, 3);
        let id = q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        assert!(!q.mark_failed(id, "err1").unwrap());
        assert!(!q.mark_failed(id, "err2").unwrap());
        let moved = q.mark_failed(id, "err3").unwrap();
        assert!(moved);
        assert_eq!(q.count().unwrap(), 0);
        assert_eq!(q.dead_letter_count().unwrap(), 1);
        let dead = q.get_dead_letters(10).unwrap();
        assert_eq!(dead[0].retry_count, 3);
        assert_eq!(dead[0].error_reason, "err3");
    }

    #[test]
    fn retry_dead_letter_reinstates_with_zero_retries() {
        let q = queue(100, 1);
        let id = q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        q.mark_failed(id, "boom").unwrap();
        assert_eq!(q.dead_letter_count().unwrap(), 1);
        let dead_id = q.get_dead_letters(10).unwrap()[0].id;
        q.retry_dead_letter(dead_id).unwrap();
        assert_eq!(q.dead_letter_count().unwrap(), 0);
        assert_eq!(q.count().unwrap(), 1);
        assert_eq!(q.dequeue_batch(10).unwrap()[0].retry_count, 0);
    }

    #[test]
    fn enqueue_evicts_oldest_row_when_over_capacity() {
        let q = queue(2, 5);
        let first = q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        q.enqueue(&json!(2), "PC01", "/b.json").unwrap();
        q.enqueue(&json!(3), "PC01", "/c.json").unwrap();
        assert_eq!(q.count().unwrap(), 2);
        let remaining_ids: Vec<i64> = q.dequeue_batch(10).unwrap().into_iter().map(|i| i.id).collect();
        assert!(!remaining_ids.contains(&first));
    }

    #[test]
    fn stats_report_per_producer_counts() {
        let q = queue(100, 3);
        q.enqueue(&json!(1), "PC01", "/a.json").unwrap();
        q.enqueue(&json!(2), "PC02", "/b.json").unwrap();
        let stats = q.stats().unwrap();
        assert_eq!(stats.pending_total, 2);
        assert_eq!(stats.per_producer.get("PC01"), Some(&1));
        assert_eq!(stats.per_producer.get("PC02"), Some(&1));
    }
}
