//! Database repository layer
//!
//! SQLite implementation of [`LogRepository`] plus the insight ledger.

use super::{BucketEdit, LogRepository};
use crate::datekey::DateKey;
use crate::error::{Error, Result};
use crate::types::{Insight, InsightKind, LogCategory, LogEntry};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// An insight as remembered by the ledger, with its read state.
#[derive(Debug, Clone, Serialize)]
pub struct InsightRecord {
    pub insight: Insight,
    /// When the insight was first produced
    pub first_seen_at: DateTime<Utc>,
    /// When the user marked it read, if ever
    pub read_at: Option<DateTime<Utc>>,
}

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA busy_timeout = 5000;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock()?;
        super::schema::run_migrations(&conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("database connection lock poisoned".to_string()))
    }

    fn decode_bucket(category: LogCategory, date: DateKey, raw: &str) -> Result<Vec<LogEntry>> {
        serde_json::from_str(raw).map_err(|e| {
            Error::Storage(format!(
                "corrupt bucket for {} {}: {}",
                category, date, e
            ))
        })
    }

    fn read_bucket(conn: &Connection, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT entries FROM log_days WHERE category = ?1 AND date = ?2",
                params![category.as_str(), date.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Self::decode_bucket(category, date, &raw),
            None => Ok(Vec::new()),
        }
    }

    // ============================================
    // Insight ledger
    // ============================================

    /// Remember a batch of generated insights.
    ///
    /// Upserts by id. Because ids are content-derived, regenerating the
    /// same insight refreshes `last_seen_at` and keeps its read state.
    pub fn record_insights(&self, insights: &[Insight]) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for insight in insights {
            tx.execute(
                r#"
                INSERT INTO insights (id, kind, title, content, priority, analyzer, signal_date, first_seen_at, last_seen_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                ON CONFLICT(id) DO UPDATE SET
                    priority = excluded.priority,
                    signal_date = excluded.signal_date,
                    last_seen_at = excluded.last_seen_at
                "#,
                params![
                    insight.id,
                    insight.kind.as_str(),
                    insight.title,
                    insight.content,
                    insight.priority,
                    insight.analyzer,
                    insight.signal_date.map(|d| d.to_string()),
                    insight.created_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Mark an insight read. Returns `false` if the ledger has no such id.
    pub fn mark_insight_read(&self, id: &str, at: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE insights SET read_at = COALESCE(read_at, ?2) WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )?;
        Ok(changed > 0)
    }

    /// List remembered insights, most recently seen first.
    pub fn list_insights(&self, unread_only: bool) -> Result<Vec<InsightRecord>> {
        let conn = self.lock()?;
        let sql = if unread_only {
            r#"
            SELECT id, kind, title, content, priority, analyzer, signal_date, first_seen_at, last_seen_at, read_at
            FROM insights
            WHERE read_at IS NULL
            ORDER BY last_seen_at DESC, priority DESC
            "#
        } else {
            r#"
            SELECT id, kind, title, content, priority, analyzer, signal_date, first_seen_at, last_seen_at, read_at
            FROM insights
            ORDER BY last_seen_at DESC, priority DESC
            "#
        };

        let mut stmt = conn.prepare(sql)?;
        let records = stmt
            .query_map([], Self::row_to_insight_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn row_to_insight_record(row: &Row) -> rusqlite::Result<InsightRecord> {
        let kind_str: String = row.get(1)?;
        let signal_date: Option<String> = row.get(6)?;
        let first_seen_str: String = row.get(7)?;
        let last_seen_str: String = row.get(8)?;
        let read_at: Option<String> = row.get(9)?;

        Ok(InsightRecord {
            insight: Insight {
                id: row.get(0)?,
                kind: kind_str.parse().unwrap_or(InsightKind::General),
                title: row.get(2)?,
                content: row.get(3)?,
                priority: row.get(4)?,
                analyzer: row.get(5)?,
                signal_date: signal_date.and_then(|d| d.parse().ok()),
                created_at: parse_ts(&last_seen_str),
            },
            first_seen_at: parse_ts(&first_seen_str),
            read_at: read_at.as_deref().map(parse_ts),
        })
    }
}

fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl LogRepository for Database {
    fn load_day(&self, category: LogCategory, date: DateKey) -> Result<Vec<LogEntry>> {
        let conn = self.lock()?;
        Self::read_bucket(&conn, category, date)
    }

    fn modify_day(
        &self,
        category: LogCategory,
        date: DateKey,
        edit: &mut BucketEdit<'_>,
    ) -> Result<Vec<LogEntry>> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front so a second process
        // cannot interleave between our read and write of the same key.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut entries = Self::read_bucket(&tx, category, date)?;
        // An error here drops `tx`, which rolls back
        edit(&mut entries)?;

        if entries.is_empty() {
            tx.execute(
                "DELETE FROM log_days WHERE category = ?1 AND date = ?2",
                params![category.as_str(), date.to_string()],
            )?;
        } else {
            tx.execute(
                r#"
                INSERT INTO log_days (category, date, entries, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(category, date) DO UPDATE SET
                    entries = excluded.entries,
                    updated_at = excluded.updated_at
                "#,
                params![
                    category.as_str(),
                    date.to_string(),
                    serde_json::to_string(&entries)?,
                    Utc::now().to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(entries)
    }

    fn load_range(
        &self,
        category: LogCategory,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<(DateKey, Vec<LogEntry>)>> {
        if start > end {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        // Keys are canonical YYYY-MM-DD, so text order is date order
        let mut stmt = conn.prepare(
            r#"
            SELECT date, entries
            FROM log_days
            WHERE category = ?1 AND date BETWEEN ?2 AND ?3
            ORDER BY date ASC
            "#,
        )?;

        let rows = stmt
            .query_map(
                params![category.as_str(), start.to_string(), end.to_string()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(date_str, raw)| {
                let date: DateKey = date_str.parse()?;
                Ok((date, Self::decode_bucket(category, date, &raw)?))
            })
            .collect()
    }

    fn earliest_date(&self) -> Result<Option<DateKey>> {
        let conn = self.lock()?;
        let earliest: Option<String> =
            conn.query_row("SELECT MIN(date) FROM log_days", [], |row| row.get(0))?;
        earliest.map(|d| d.parse()).transpose()
    }
}
