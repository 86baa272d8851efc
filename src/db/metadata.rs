//! Per-task key/value metadata.

use super::{now_ms, task_exists, Database};
use crate::error::{TaskError, TaskResult};
use crate::types::{MetadataEntry, MAX_META_KEY_LEN, MAX_META_VALUE_LEN};
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

fn parse_entry_row(row: &Row) -> rusqlite::Result<MetadataEntry> {
    Ok(MetadataEntry {
        task_id: row.get(0)?,
        key: row.get(1)?,
        value: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn validate_entry(key: &str, value: &str) -> TaskResult<()> {
    if key.trim().is_empty() {
        return Err(TaskError::validation("key", "metadata key must not be empty"));
    }
    let key_len = key.chars().count();
    if key_len > MAX_META_KEY_LEN {
        return Err(TaskError::validation(
            "key",
            format!("must be at most {} characters (got {})", MAX_META_KEY_LEN, key_len),
        ));
    }
    let value_len = value.chars().count();
    if value_len > MAX_META_VALUE_LEN {
        return Err(TaskError::validation(
            "value",
            format!("must be at most {} characters (got {})", MAX_META_VALUE_LEN, value_len),
        ));
    }
    Ok(())
}

/// Key/value store scoped to one task at a time.
pub struct MetadataStore<'db> {
    db: &'db Database,
}

impl<'db> MetadataStore<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Insert or replace the value stored under `key` for a task.
    pub fn set(&self, task_id: i64, key: &str, value: &str) -> TaskResult<MetadataEntry> {
        validate_entry(key, value)?;
        let now = now_ms();

        self.db.with_tx(|conn| {
            if !task_exists(conn, task_id)? {
                return Err(TaskError::task_not_found(task_id));
            }

            let entry = conn.query_row(
                "INSERT INTO task_metadata (task_id, key, value, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (task_id, key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                 RETURNING task_id, key, value, created_at, updated_at",
                params![task_id, key, value, now],
                parse_entry_row,
            )?;
            debug!(task_id, key, "Set metadata");
            Ok(entry)
        })
    }

    pub fn get(&self, task_id: i64, key: &str) -> TaskResult<Option<MetadataEntry>> {
        self.db.with_conn(|conn| {
            let entry = conn
                .query_row(
                    "SELECT task_id, key, value, created_at, updated_at FROM task_metadata
                     WHERE task_id = ?1 AND key = ?2",
                    params![task_id, key],
                    parse_entry_row,
                )
                .optional()?;
            Ok(entry)
        })
    }

    /// All entries for a task, by key.
    pub fn list(&self, task_id: i64) -> TaskResult<Vec<MetadataEntry>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT task_id, key, value, created_at, updated_at FROM task_metadata
                 WHERE task_id = ?1 ORDER BY key",
            )?;
            let entries = stmt
                .query_map(params![task_id], parse_entry_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Delete one key. Returns `false` if it was not set.
    pub fn delete(&self, task_id: i64, key: &str) -> TaskResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM task_metadata WHERE task_id = ?1 AND key = ?2",
                params![task_id, key],
            )?;
            Ok(removed > 0)
        })
    }
}
