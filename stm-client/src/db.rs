//! Durable local store backing offline work: the write queue, plus a mirror
//! of the last entries and customers seen from the server.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, DatabaseName, OptionalExtension};
use thiserror::Error;

use crate::domain::{Customer, TimeEntry};

pub const CURRENT_SCHEMA_VERSION: i64 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("offline queue is full: {0}")]
    QueueFull(String),
    #[error("local store error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("cached payload error: {0}")]
    Serde(#[from] serde_json::Error),
}

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 1] = [Migration {
    version: 1,
    name: "baseline_offline_store_v1",
    sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    method TEXT NOT NULL,
    path TEXT NOT NULL,
    body TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS entry_cache (
    position INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL UNIQUE,
    payload TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS customer_cache (
    position INTEGER PRIMARY KEY AUTOINCREMENT,
    id INTEGER NOT NULL UNIQUE,
    payload TEXT NOT NULL
);
"#,
}];

pub fn open_connection(path: &str) -> Result<Connection, StoreError> {
    let mut conn = Connection::open(path)?;
    configure_for_durability(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

// Queued writes must survive power loss, so synchronous stays at FULL even
// though WAL would tolerate NORMAL for the caches.
fn configure_for_durability(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "FULL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<(), StoreError> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()?;
    Ok(())
}

fn now_utc_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// One pending offline write, in the order the user issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedOp {
    pub id: i64,
    pub method: String,
    pub path: String,
    pub body: Option<String>,
    pub created_at: String,
}

/// Durably appends a write to the queue, returning its assigned id.
///
/// The only anticipated failure is storage exhaustion, reported as
/// [`StoreError::QueueFull`].
pub fn enqueue(
    conn: &Connection,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> Result<i64, StoreError> {
    conn.execute(
        "INSERT INTO queue (method, path, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![method, path, body, now_utc_rfc3339()],
    )
    .map_err(|err| match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::DiskFull =>
        {
            StoreError::QueueFull(err.to_string())
        }
        _ => StoreError::Database(err),
    })?;
    Ok(conn.last_insert_rowid())
}

/// Snapshot of every queued write in ascending id order. Removes nothing;
/// callers drop ids one by one as the server accepts them.
pub fn pending_in_order(conn: &Connection) -> Result<Vec<QueuedOp>, StoreError> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, method, path, body, created_at
FROM queue
ORDER BY id ASC
"#,
    )?;

    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        result.push(QueuedOp {
            id: row.get(0)?,
            method: row.get(1)?,
            path: row.get(2)?,
            body: row.get(3)?,
            created_at: row.get(4)?,
        });
    }

    Ok(result)
}

pub fn queue_len(conn: &Connection) -> Result<i64, StoreError> {
    let count = conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))?;
    Ok(count)
}

/// Removes one queued write by id. A miss is a no-op so a replay pass can be
/// retried without bookkeeping.
pub fn remove_op(conn: &Connection, id: i64) -> Result<(), StoreError> {
    conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
    Ok(())
}

/// Replaces the entry mirror wholesale with the server's latest answer.
pub fn replace_entries(conn: &mut Connection, entries: &[TimeEntry]) -> Result<(), StoreError> {
    let rows = entries
        .iter()
        .map(|entry| Ok((entry.id, serde_json::to_string(entry)?)))
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM entry_cache", [])?;
    for (id, payload) in rows {
        tx.execute(
            "INSERT INTO entry_cache (id, payload) VALUES (?1, ?2)",
            params![id, payload],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn cached_entries(conn: &Connection) -> Result<Vec<TimeEntry>, StoreError> {
    read_cache(conn, "SELECT payload FROM entry_cache ORDER BY position ASC")
}

pub fn replace_customers(conn: &mut Connection, customers: &[Customer]) -> Result<(), StoreError> {
    let rows = customers
        .iter()
        .map(|customer| Ok((customer.id, serde_json::to_string(customer)?)))
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    let tx = conn.transaction()?;
    tx.execute("DELETE FROM customer_cache", [])?;
    for (id, payload) in rows {
        tx.execute(
            "INSERT INTO customer_cache (id, payload) VALUES (?1, ?2)",
            params![id, payload],
        )?;
    }
    tx.commit()?;
    Ok(())
}

pub fn cached_customers(conn: &Connection) -> Result<Vec<Customer>, StoreError> {
    read_cache(
        conn,
        "SELECT payload FROM customer_cache ORDER BY position ASC",
    )
}

fn read_cache<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    sql: &str,
) -> Result<Vec<T>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([])?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let payload: String = row.get(0)?;
        result.push(serde_json::from_str(&payload)?);
    }
    Ok(result)
}

pub fn get_meta(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let value = conn
        .query_row(
            "SELECT value FROM meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn set_meta(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        r#"
INSERT INTO meta (key, value)
VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![key, value],
    )?;
    Ok(())
}
