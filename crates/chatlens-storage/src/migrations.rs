//! Database schema migrations.
//!
//! Applies the initial schema: users, conversation_turns, attachments and
//! the schema_migrations bookkeeping table. No foreign keys are declared;
//! the pipeline creates a user before writing records that reference it.

use rusqlite::Connection;
use tracing::info;

use chatlens_core::error::ChatlensError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ChatlensError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ChatlensError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ChatlensError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ChatlensError> {
    conn.execute_batch(
        "
        BEGIN;

        CREATE TABLE IF NOT EXISTS users (
            conversation_key TEXT PRIMARY KEY NOT NULL,
            display_name     TEXT,
            handle           TEXT,
            phone_number     TEXT,
            registered_at    INTEGER NOT NULL
        );

        -- sentiment is nullable only so aggregation can tolerate rows written
        -- by older tooling; the pipeline always sets it.
        CREATE TABLE IF NOT EXISTS conversation_turns (
            id               TEXT PRIMARY KEY NOT NULL,
            conversation_key TEXT NOT NULL,
            inbound_text     TEXT NOT NULL DEFAULT '',
            reply_text       TEXT NOT NULL DEFAULT '',
            sentiment        TEXT,
            timestamp        INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_turns_conversation
            ON conversation_turns (conversation_key, timestamp ASC);

        CREATE INDEX IF NOT EXISTS idx_turns_timestamp
            ON conversation_turns (timestamp ASC);

        CREATE TABLE IF NOT EXISTS attachments (
            id               TEXT PRIMARY KEY NOT NULL,
            conversation_key TEXT NOT NULL,
            file_ref         TEXT NOT NULL,
            media_type       TEXT NOT NULL DEFAULT 'application/octet-stream',
            description      TEXT NOT NULL DEFAULT '',
            timestamp        INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_attachments_conversation
            ON attachments (conversation_key, timestamp ASC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');

        COMMIT;
        ",
    )
    .map_err(|e| ChatlensError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c == 1)
        .unwrap_or(false)
    }

    #[test]
    fn test_migrations_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        for table in ["users", "conversation_turns", "attachments", "schema_migrations"] {
            assert!(table_exists(&conn, table), "missing table {}", table);
        }
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }

    #[test]
    fn test_user_key_is_unique() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (conversation_key, registered_at) VALUES ('1', 0)",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO users (conversation_key, registered_at) VALUES ('1', 0)",
            [],
        );
        assert!(dup.is_err());
    }
}
