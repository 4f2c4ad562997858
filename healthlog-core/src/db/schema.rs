//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: day buckets
    r#"
    -- One row per (category, calendar day). `entries` holds the day's
    -- bucket as a JSON array: a single element for singleton categories,
    -- the ordered list for append categories.
    CREATE TABLE IF NOT EXISTS log_days (
        category         TEXT NOT NULL,
        date             TEXT NOT NULL,
        entries          JSON NOT NULL,
        updated_at       DATETIME NOT NULL,
        PRIMARY KEY (category, date)
    );

    CREATE INDEX IF NOT EXISTS idx_log_days_date ON log_days(date);
    "#,
    // Version 2: insight ledger for read/unread state
    r#"
    CREATE TABLE IF NOT EXISTS insights (
        id               TEXT PRIMARY KEY,
        kind             TEXT NOT NULL,
        title            TEXT NOT NULL,
        content          TEXT NOT NULL,
        priority         INTEGER NOT NULL,
        analyzer         TEXT NOT NULL,
        signal_date      TEXT,
        first_seen_at    DATETIME NOT NULL,
        last_seen_at     DATETIME NOT NULL,
        read_at          DATETIME
    );

    CREATE INDEX IF NOT EXISTS idx_insights_unread ON insights(last_seen_at) WHERE read_at IS NULL;
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["log_days", "insights"] {
            let exists: i32 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(exists, 1, "Table {} should exist", table);
        }
    }
}
