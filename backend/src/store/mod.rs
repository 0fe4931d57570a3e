//! SQLite-backed campaign store.
//!
//! Holds the persisted entity graph (campaigns → ad groups → keywords / ads),
//! the append-only snapshot table and the import audit records.
//!
//! All reads and writes go through a [`Repository`] borrowing an explicit
//! connection handle. [`Store::in_transaction`] is the transaction primitive:
//! the closure's repository is bound to one SQLite transaction which commits
//! on `Ok` and rolls back on `Err`.

pub mod repository;

use rusqlite::Connection;
use std::path::Path;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};

pub use repository::Repository;

/// Schema, applied idempotently on open.
const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS campaigns (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE,
    status       TEXT NOT NULL,
    daily_budget REAL NOT NULL,
    final_url    TEXT NOT NULL DEFAULT '',
    path1        TEXT NOT NULL DEFAULT '',
    path2        TEXT NOT NULL DEFAULT '',
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ad_groups (
    id          TEXT PRIMARY KEY,
    campaign_id TEXT NOT NULL REFERENCES campaigns(id),
    name        TEXT NOT NULL,
    status      TEXT NOT NULL,
    max_cpc     REAL NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    UNIQUE (campaign_id, name)
);

CREATE TABLE IF NOT EXISTS keywords (
    id          TEXT PRIMARY KEY,
    ad_group_id TEXT NOT NULL REFERENCES ad_groups(id),
    text        TEXT NOT NULL,
    match_type  TEXT NOT NULL,
    max_cpc     REAL,
    created_at  TEXT NOT NULL,
    UNIQUE (ad_group_id, text)
);

CREATE TABLE IF NOT EXISTS ads (
    id           TEXT PRIMARY KEY,
    ad_group_id  TEXT NOT NULL REFERENCES ad_groups(id),
    dedup_key    TEXT NOT NULL,
    headlines    TEXT NOT NULL,
    descriptions TEXT NOT NULL,
    final_url    TEXT NOT NULL DEFAULT '',
    path1        TEXT NOT NULL DEFAULT '',
    path2        TEXT NOT NULL DEFAULT '',
    status       TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL,
    UNIQUE (ad_group_id, dedup_key)
);

CREATE TABLE IF NOT EXISTS snapshots (
    id            TEXT PRIMARY KEY,
    campaign_id   TEXT NOT NULL,
    snapshot_type TEXT NOT NULL,
    description   TEXT NOT NULL,
    data          TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_campaign ON snapshots (campaign_id);

CREATE TRIGGER IF NOT EXISTS snapshots_no_update BEFORE UPDATE ON snapshots
BEGIN
    SELECT RAISE(ABORT, 'snapshots are append-only');
END;

CREATE TRIGGER IF NOT EXISTS snapshots_no_delete BEFORE DELETE ON snapshots
BEGIN
    SELECT RAISE(ABORT, 'snapshots are append-only');
END;

CREATE TABLE IF NOT EXISTS import_records (
    id           TEXT PRIMARY KEY,
    source_name  TEXT NOT NULL,
    source_kind  TEXT NOT NULL,
    byte_size    INTEGER NOT NULL,
    status       TEXT NOT NULL,
    entity_count INTEGER NOT NULL DEFAULT 0,
    errors       TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL,
    completed_at TEXT
);

CREATE TRIGGER IF NOT EXISTS import_records_finalised BEFORE UPDATE ON import_records
WHEN OLD.status <> 'processing'
BEGIN
    SELECT RAISE(ABORT, 'import record already finalised');
END;
"#;

/// Generate a unique string id for a new entity.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Owner of the SQLite connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a file-backed store, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Unavailable(format!("cannot create '{}': {}", parent.display(), e))
                })?;
            }
        }

        Self::from_connection(Connection::open(path)?)
    }

    /// Open a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Repository in autocommit mode (each statement commits on its own).
    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.conn)
    }

    /// Raw connection access, for maintenance and tests.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside one SQLite transaction.
    ///
    /// Commits when `f` returns `Ok`. Any `Err` (from `f` or from the commit
    /// itself) leaves the store exactly as it was before the call.
    pub fn in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Repository<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let tx = self.conn.transaction().map_err(StoreError::from)?;

        // Dropping `tx` without commit rolls back
        let value = {
            let repo = Repository::new(&tx);
            f(&repo)?
        };

        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}
