//! Tags and task-tag associations.

use super::tasks::{query_tasks, TASK_COLUMNS};
use super::{now_ms, task_exists, Database};
use crate::error::{is_unique_violation, TaskError, TaskResult};
use crate::types::{Tag, Task, MAX_TAG_NAME_LEN};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

fn parse_tag_row(row: &Row) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: row.get(2)?,
    })
}

fn get_tag_internal(conn: &Connection, tag_id: i64) -> TaskResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, created_at FROM tags WHERE id = ?1",
            params![tag_id],
            parse_tag_row,
        )
        .optional()?;
    Ok(tag)
}

/// Names are stored trimmed, so lookups trim too.
fn get_tag_by_name_internal(conn: &Connection, name: &str) -> TaskResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name, created_at FROM tags WHERE name = ?1",
            params![name.trim()],
            parse_tag_row,
        )
        .optional()?;
    Ok(tag)
}

/// Validate a tag name and return it trimmed.
///
/// Names may not parse as an integer, so that an identifier [`TagManager::resolve`]
/// reads as an id can never also be a name.
pub fn validate_tag_name(name: &str) -> TaskResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TaskError::validation("name", "tag name must not be empty"));
    }
    let len = name.chars().count();
    if len > MAX_TAG_NAME_LEN {
        return Err(TaskError::validation(
            "name",
            format!("must be at most {} characters (got {})", MAX_TAG_NAME_LEN, len),
        ));
    }
    if name.parse::<i64>().is_ok() {
        return Err(TaskError::validation(
            "name",
            format!("tag name '{}' must not be a number", name),
        ));
    }
    Ok(name)
}

/// Manager for tags and their task associations.
pub struct TagManager<'db> {
    db: &'db Database,
}

impl<'db> TagManager<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Create a tag. Names are unique (case-sensitive).
    pub fn create(&self, name: &str) -> TaskResult<Tag> {
        let name = validate_tag_name(name)?;
        let now = now_ms();

        self.db.with_tx(|conn| {
            if get_tag_by_name_internal(conn, name)?.is_some() {
                return Err(duplicate_tag(name));
            }

            conn.execute(
                "INSERT INTO tags (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_tag(name)
                } else {
                    e.into()
                }
            })?;
            let id = conn.last_insert_rowid();
            debug!(tag_id = id, name, "Created tag");

            Ok(Tag {
                id,
                name: name.to_string(),
                created_at: now,
            })
        })
    }

    pub fn get(&self, tag_id: i64) -> TaskResult<Option<Tag>> {
        self.db.with_conn(|conn| get_tag_internal(conn, tag_id))
    }

    pub fn get_by_name(&self, name: &str) -> TaskResult<Option<Tag>> {
        self.db.with_conn(|conn| get_tag_by_name_internal(conn, name))
    }

    /// Look a tag up by id when `ident` is numeric, by name otherwise.
    pub fn resolve(&self, ident: &str) -> TaskResult<Option<Tag>> {
        match ident.trim().parse::<i64>() {
            Ok(id) => self.get(id),
            Err(_) => self.get_by_name(ident),
        }
    }

    /// All tags, by name.
    pub fn list(&self) -> TaskResult<Vec<Tag>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name, created_at FROM tags ORDER BY name")?;
            let tags = stmt
                .query_map([], parse_tag_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    /// Delete a tag and, through the foreign key, all its associations.
    pub fn delete(&self, tag_id: i64) -> TaskResult<bool> {
        self.db.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM tags WHERE id = ?1", params![tag_id])?;
            if deleted > 0 {
                debug!(tag_id, "Deleted tag");
            }
            Ok(deleted > 0)
        })
    }

    /// Attach a tag to a task.
    pub fn attach(&self, task_id: i64, tag_id: i64) -> TaskResult<()> {
        self.db.with_tx(|conn| {
            if !task_exists(conn, task_id)? {
                return Err(TaskError::task_not_found(task_id));
            }
            if get_tag_internal(conn, tag_id)?.is_none() {
                return Err(TaskError::tag_not_found(tag_id));
            }

            let attached: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM task_tags WHERE task_id = ?1 AND tag_id = ?2)",
                params![task_id, tag_id],
                |row| row.get(0),
            )?;
            if attached {
                return Err(duplicate_link(task_id, tag_id));
            }

            conn.execute(
                "INSERT INTO task_tags (task_id, tag_id) VALUES (?1, ?2)",
                params![task_id, tag_id],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_link(task_id, tag_id)
                } else {
                    e.into()
                }
            })?;
            debug!(task_id, tag_id, "Attached tag");
            Ok(())
        })
    }

    /// Detach a tag from a task. Returns `false` if it was not attached.
    pub fn detach(&self, task_id: i64, tag_id: i64) -> TaskResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM task_tags WHERE task_id = ?1 AND tag_id = ?2",
                params![task_id, tag_id],
            )?;
            Ok(removed > 0)
        })
    }

    /// Tags attached to a task, by name.
    pub fn tags_for_task(&self, task_id: i64) -> TaskResult<Vec<Tag>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT g.id, g.name, g.created_at FROM tags g
                 INNER JOIN task_tags tt ON tt.tag_id = g.id
                 WHERE tt.task_id = ?1
                 ORDER BY g.name",
            )?;
            let tags = stmt
                .query_map(params![task_id], parse_tag_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(tags)
        })
    }

    /// Tasks carrying a tag, newest first.
    pub fn tasks_with_tag(&self, tag_id: i64) -> TaskResult<Vec<Task>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tasks t
                 INNER JOIN task_tags tt ON tt.task_id = t.id
                 WHERE tt.tag_id = ?1
                 ORDER BY t.created_at DESC, t.id DESC",
                TASK_COLUMNS
            );
            query_tasks(conn, &sql, params![tag_id])
        })
    }
}

fn duplicate_tag(name: &str) -> TaskError {
    TaskError::Conflict(format!("Tag '{}' already exists", name))
}

fn duplicate_link(task_id: i64, tag_id: i64) -> TaskError {
    TaskError::Conflict(format!("Tag {} is already attached to task {}", tag_id, task_id))
}
