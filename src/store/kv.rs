//! Point operations over the key-value table.
//!
//! These are deliberately the only primitives the engine builds on: point
//! read, point write, partial patch, existence check and prefix list. There
//! is no transaction wrapping anywhere in this module — `patch` is a plain
//! read-merge-write, so a concurrent writer can be lost. Callers that need a
//! counter to be exact verify after writing and retry (see `engine::retry`).

use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Fetch a raw JSON document by key.
pub fn get_raw(conn: &Connection, key: &str) -> Result<Option<Value>> {
    let text: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    match text {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Fetch and deserialize a record by key.
pub fn get<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    match get_raw(conn, key)? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Write (or replace) a record.
pub fn put<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, text],
    )?;
    Ok(())
}

/// Merge top-level fields into an existing record.
///
/// Returns false if the key does not exist. Read and write are two separate
/// statements; a concurrent patch between them wins silently.
pub fn patch(
    conn: &Connection,
    key: &str,
    fields: serde_json::Map<String, Value>,
) -> Result<bool> {
    let Some(mut value) = get_raw(conn, key)? else {
        return Ok(false);
    };
    let Value::Object(map) = &mut value else {
        return Err(AppError::Internal(format!(
            "Record {} is not a JSON object",
            key
        )));
    };
    for (name, field) in fields {
        map.insert(name, field);
    }
    let text = serde_json::to_string(&value)?;
    let affected = conn.execute(
        "UPDATE kv SET value = ?2 WHERE key = ?1",
        params![key, text],
    )?;
    Ok(affected > 0)
}

/// Create a record only if the key is absent. Returns whether this call
/// created it. Unlike `patch`, this is a single statement and therefore
/// atomic — the one arbitration primitive the claim protocol leans on.
pub fn put_if_absent<T: Serialize>(conn: &Connection, key: &str, value: &T) -> Result<bool> {
    let text = serde_json::to_string(value)?;
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, text],
    )?;
    Ok(inserted > 0)
}

pub fn exists(conn: &Connection, key: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(affected > 0)
}

/// List all records whose key starts with `prefix`, in key order.
pub fn list_prefix(conn: &Connection, prefix: &str) -> Result<Vec<(String, Value)>> {
    let mut stmt =
        conn.prepare("SELECT key, value FROM kv WHERE key LIKE ?1 || '%' ORDER BY key")?;
    let rows = stmt
        .query_map(params![prefix], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (key, text) in rows {
        out.push((key, serde_json::from_str(&text)?));
    }
    Ok(out)
}
