//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current, CURRENT_VERSION
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, medchain_core::now_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Transactions: content-addressed, write-once
        CREATE TABLE transactions (
            tx_id TEXT PRIMARY KEY,           -- 64 hex chars, derived from signature
            tx_type TEXT NOT NULL,            -- content variant tag
            pub_key TEXT NOT NULL,            -- 64 hex chars, Ed25519 public key
            signature TEXT NOT NULL,          -- 128 hex chars, Ed25519 signature
            timestamp INTEGER NOT NULL,       -- creation time (Unix ms)
            content TEXT NOT NULL,            -- JSON of the tagged content
            stored_at INTEGER NOT NULL        -- local time of the write
        );

        -- Blocks: write-once, chained through pre_id
        CREATE TABLE blocks (
            block_id TEXT PRIMARY KEY,        -- 64 hex chars
            pre_id TEXT NOT NULL,             -- predecessor, all zeros for genesis
            tx_list BLOB NOT NULL,            -- CBOR array of tx ids, in order
            stored_at INTEGER NOT NULL
        );

        -- Chain tip: single row, the only value ever overwritten
        CREATE TABLE chain_tip (
            slot INTEGER PRIMARY KEY CHECK (slot = 0),
            block_id TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_transactions_type ON transactions(tx_type);
        CREATE INDEX idx_blocks_pre_id ON blocks(pre_id);
        "#,
    )?;

    Ok(())
}
