//! Relay schema for SQLite, versioned through `schema_migrations`.
//!
//! [`migrate`] runs once when a store is opened; steps already recorded in
//! `schema_migrations` are skipped.

use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Brings `conn` up to [`CURRENT_VERSION`].
///
/// Idempotent, and safe to run from several processes sharing one file:
/// the version is re-read under an immediate transaction.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current: u32 = tx.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_secs()],
            )?;
            tracing::info!(version, "applied schema migration");
        }
    }

    tx.commit()?;
    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: events, tag index, access lists.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per stored event
        CREATE TABLE event (
            id TEXT PRIMARY KEY,              -- 64 hex chars
            pubkey TEXT NOT NULL,             -- author, 64 hex chars
            created_at INTEGER NOT NULL,      -- seconds
            kind INTEGER NOT NULL,
            tags TEXT NOT NULL,               -- JSON array of arrays
            content TEXT NOT NULL,
            sig TEXT NOT NULL,
            d_tag TEXT NOT NULL DEFAULT ''    -- first d tag value, '' when absent
        );

        -- First value of every tag, for tag lookups
        CREATE TABLE event_tag (
            event_id TEXT NOT NULL REFERENCES event(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            name TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (event_id, position)
        );

        -- Access lists; may already exist when managed by external tooling
        CREATE TABLE IF NOT EXISTS allowlist (pubkey TEXT NOT NULL);
        CREATE TABLE IF NOT EXISTS blocklist (pubkey TEXT NOT NULL);

        CREATE INDEX idx_event_slot ON event(pubkey, kind, d_tag);
        CREATE INDEX idx_event_created_at ON event(created_at);
        CREATE INDEX idx_event_tag_lookup ON event_tag(name, value);
        "#,
    )?;

    Ok(())
}

fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables = table_names(&conn);
        for expected in ["event", "event_tag", "allowlist", "blocklist", "schema_migrations"] {
            assert!(tables.contains(&expected.to_string()), "missing {}", expected);
        }
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: u32 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_existing_access_tables_are_kept() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE blocklist (pubkey text NOT NULL);
             INSERT INTO blocklist (pubkey) VALUES ('abc');",
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM blocklist", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
