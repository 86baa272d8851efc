//! Task CRUD, validation and status counts.

use super::hierarchy::check_parent_assignment;
use super::{now_ms, Database};
use crate::error::{TaskError, TaskResult};
use crate::types::{
    NewTask, Task, TaskFilter, TaskStatus, TaskUpdate, MAX_AUTHOR_LEN, MAX_BODY_LEN,
    MAX_TITLE_LEN,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use tracing::debug;

/// Column list matching `parse_task_row`.
pub(crate) const TASK_COLUMNS: &str =
    "t.id, t.title, t.body, t.author, t.status, t.parent_id, t.created_at, t.updated_at";

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        author: row.get(3)?,
        status: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

// =============================================================================
// Field validation
// =============================================================================

fn check_title(title: &str) -> TaskResult<()> {
    if title.trim().is_empty() {
        return Err(TaskError::validation("title", "title is required"));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(TaskError::validation(
            "title",
            format!("must be at most {} characters (got {})", MAX_TITLE_LEN, len),
        ));
    }
    Ok(())
}

fn check_body(body: Option<&str>) -> TaskResult<()> {
    if let Some(body) = body {
        let len = body.chars().count();
        if len > MAX_BODY_LEN {
            return Err(TaskError::validation(
                "body",
                format!("must be at most {} characters (got {})", MAX_BODY_LEN, len),
            ));
        }
    }
    Ok(())
}

fn check_author(author: Option<&str>) -> TaskResult<()> {
    if let Some(author) = author {
        let len = author.chars().count();
        if len > MAX_AUTHOR_LEN {
            return Err(TaskError::validation(
                "author",
                format!("must be at most {} characters (got {})", MAX_AUTHOR_LEN, len),
            ));
        }
    }
    Ok(())
}

/// Validate the text fields of a new task. Checked in order title, body, author.
pub fn validate_new_task(input: &NewTask) -> TaskResult<()> {
    check_title(&input.title)?;
    check_body(input.body.as_deref())?;
    check_author(input.author.as_deref())?;
    Ok(())
}

/// Validate only the fields present in an update, in the same order as creation.
pub fn validate_update(update: &TaskUpdate) -> TaskResult<()> {
    if let Some(title) = &update.title {
        check_title(title)?;
    }
    if let Some(body) = &update.body {
        check_body(body.as_deref())?;
    }
    if let Some(author) = &update.author {
        check_author(author.as_deref())?;
    }
    Ok(())
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> TaskResult<Option<Task>> {
    let sql = format!("SELECT {} FROM tasks t WHERE t.id = ?1", TASK_COLUMNS);
    let task = conn
        .query_row(&sql, params![task_id], parse_task_row)
        .optional()?;
    Ok(task)
}

/// Run a task query and collect the rows.
pub(crate) fn query_tasks(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> TaskResult<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let tasks = stmt
        .query_map(params, parse_task_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tasks)
}

/// Repository for task rows.
pub struct TaskRepository<'db> {
    db: &'db Database,
}

impl<'db> TaskRepository<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    pub(super) fn db(&self) -> &'db Database {
        self.db
    }

    /// Create a new task.
    pub fn create(&self, input: NewTask) -> TaskResult<Task> {
        validate_new_task(&input)?;
        let now = now_ms();
        let status = input.status.unwrap_or_default();

        self.db.with_tx(|conn| {
            if let Some(parent_id) = input.parent_id {
                if !super::task_exists(conn, parent_id)? {
                    return Err(TaskError::parent_not_found(parent_id));
                }
            }

            conn.execute(
                "INSERT INTO tasks (title, body, author, status, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    input.title,
                    input.body,
                    input.author,
                    status,
                    input.parent_id,
                    now,
                    now,
                ],
            )?;
            let id = conn.last_insert_rowid();
            debug!(task_id = id, parent_id = ?input.parent_id, "Created task");

            Ok(Task {
                id,
                title: input.title,
                body: input.body,
                author: input.author,
                status,
                parent_id: input.parent_id,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a task by ID.
    pub fn get(&self, task_id: i64) -> TaskResult<Option<Task>> {
        self.db.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// List tasks matching every set filter, newest first.
    pub fn list(&self, filter: &TaskFilter) -> TaskResult<Vec<Task>> {
        self.db.with_conn(|conn| {
            let mut sql = format!("SELECT {} FROM tasks t WHERE 1 = 1", TASK_COLUMNS);
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(status) = filter.status {
                sql.push_str(" AND t.status = ?");
                params_vec.push(Box::new(status));
            }

            if let Some(author) = &filter.author {
                sql.push_str(" AND t.author = ?");
                params_vec.push(Box::new(author.clone()));
            }

            if let Some(tag) = &filter.tag {
                sql.push_str(
                    " AND EXISTS (SELECT 1 FROM task_tags tt
                                  INNER JOIN tags g ON g.id = tt.tag_id
                                  WHERE tt.task_id = t.id AND g.name = ?)",
                );
                params_vec.push(Box::new(tag.trim().to_string()));
            }

            sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

            let params_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|b| b.as_ref()).collect();

            query_tasks(conn, &sql, &params_refs)
        })
    }

    /// Apply a partial update. Returns `None` if the task does not exist.
    ///
    /// A `parent_id` change goes through the same checks as
    /// [`HierarchyManager::set_parent`](super::HierarchyManager::set_parent).
    pub fn update(&self, task_id: i64, update: TaskUpdate) -> TaskResult<Option<Task>> {
        validate_update(&update)?;
        let now = now_ms();

        self.db.with_tx(|conn| {
            let Some(task) = get_task_internal(conn, task_id)? else {
                return Ok(None);
            };

            let new_parent = match update.parent_id {
                Some(parent_id) => {
                    check_parent_assignment(conn, task_id, parent_id)?;
                    parent_id
                }
                None => task.parent_id,
            };
            let new_title = update.title.unwrap_or(task.title);
            let new_body = update.body.unwrap_or(task.body);
            let new_author = update.author.unwrap_or(task.author);
            let new_status = update.status.unwrap_or(task.status);

            conn.execute(
                "UPDATE tasks SET
                    title = ?1, body = ?2, author = ?3, status = ?4,
                    parent_id = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    new_title, new_body, new_author, new_status, new_parent, now, task_id
                ],
            )?;
            debug!(task_id, status = %new_status, "Updated task");

            Ok(Some(Task {
                id: task_id,
                title: new_title,
                body: new_body,
                author: new_author,
                status: new_status,
                parent_id: new_parent,
                created_at: task.created_at,
                updated_at: now,
            }))
        })
    }

    /// Delete a task. Returns `false` if it did not exist.
    ///
    /// Foreign keys do the cascading: direct children are orphaned
    /// (`ON DELETE SET NULL`); blocking edges, tag links and metadata rows go
    /// with the task (`ON DELETE CASCADE`).
    pub fn delete(&self, task_id: i64) -> TaskResult<bool> {
        self.db.with_tx(|conn| {
            let orphaned: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tasks WHERE parent_id = ?1",
                params![task_id],
                |row| row.get(0),
            )?;

            let deleted = conn.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if deleted > 0 {
                debug!(task_id, orphaned, "Deleted task");
            }
            Ok(deleted > 0)
        })
    }

    /// Count tasks per status. Every status is present, zero when unused.
    pub fn count_by_status(&self) -> TaskResult<BTreeMap<TaskStatus, i64>> {
        self.db.with_conn(|conn| {
            let mut counts: BTreeMap<TaskStatus, i64> =
                TaskStatus::ALL.into_iter().map(|s| (s, 0)).collect();

            let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM tasks GROUP BY status")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, TaskStatus>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (status, count) = row?;
                counts.insert(status, count);
            }

            Ok(counts)
        })
    }
}
