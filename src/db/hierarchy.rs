//! Parent/child tree operations.
//!
//! The forest lives in `tasks.parent_id`. It is kept apart from the blocking
//! graph: deleting a parent orphans its children, and reparenting is checked
//! against the tree only.

use super::tasks::{get_task_internal, query_tasks, TASK_COLUMNS};
use super::{now_ms, task_exists, Database};
use crate::cycle::would_create_parent_cycle;
use crate::error::{GraphKind, TaskError, TaskResult};
use crate::types::Task;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

/// Stored parent of a task, `None` for roots and for unknown ids.
fn parent_of(conn: &Connection, task_id: i64) -> TaskResult<Option<i64>> {
    let parent: Option<Option<i64>> = conn
        .query_row(
            "SELECT parent_id FROM tasks WHERE id = ?1",
            params![task_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(parent.flatten())
}

fn children_of(conn: &Connection, task_id: i64) -> TaskResult<Vec<Task>> {
    let sql = format!(
        "SELECT {} FROM tasks t WHERE t.parent_id = ?1 ORDER BY t.created_at ASC, t.id ASC",
        TASK_COLUMNS
    );
    query_tasks(conn, &sql, params![task_id])
}

/// Check that `task_id` may take `parent_id` as its parent.
///
/// Rejects a self-parent, a parent that does not exist, and a parent inside
/// the task's own subtree.
pub(crate) fn check_parent_assignment(
    conn: &Connection,
    task_id: i64,
    parent_id: Option<i64>,
) -> TaskResult<()> {
    let Some(parent) = parent_id else {
        return Ok(());
    };

    if parent == task_id {
        return Err(TaskError::validation(
            "parent_id",
            format!("task {} cannot be its own parent", task_id),
        ));
    }

    if !task_exists(conn, parent)? {
        return Err(TaskError::parent_not_found(parent));
    }

    if would_create_parent_cycle(task_id, Some(parent), |id| parent_of(conn, id))? {
        return Err(TaskError::Cycle {
            graph: GraphKind::Hierarchy,
            from: task_id,
            to: parent,
        });
    }

    Ok(())
}

/// Manager for the parent/child forest.
pub struct HierarchyManager<'db> {
    db: &'db Database,
}

impl<'db> HierarchyManager<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Set or clear the parent of a task.
    pub fn set_parent(&self, task_id: i64, parent_id: Option<i64>) -> TaskResult<Task> {
        let now = now_ms();

        self.db.with_tx(|conn| {
            let task = get_task_internal(conn, task_id)?
                .ok_or_else(|| TaskError::task_not_found(task_id))?;

            check_parent_assignment(conn, task_id, parent_id)?;

            conn.execute(
                "UPDATE tasks SET parent_id = ?1, updated_at = ?2 WHERE id = ?3",
                params![parent_id, now, task_id],
            )?;
            debug!(task_id, parent_id = ?parent_id, "Set task parent");

            Ok(Task {
                parent_id,
                updated_at: now,
                ..task
            })
        })
    }

    /// Direct children, oldest first.
    pub fn get_children(&self, task_id: i64) -> TaskResult<Vec<Task>> {
        self.db.with_conn(|conn| children_of(conn, task_id))
    }

    /// Every task below `task_id`, breadth-first. Each task appears once.
    pub fn get_descendants(&self, task_id: i64) -> TaskResult<Vec<Task>> {
        self.db.with_conn(|conn| {
            let mut result = Vec::new();
            let mut visited: HashSet<i64> = HashSet::new();
            let mut queue: VecDeque<i64> = VecDeque::new();
            visited.insert(task_id);
            queue.push_back(task_id);

            while let Some(current) = queue.pop_front() {
                for child in children_of(conn, current)? {
                    if !visited.insert(child.id) {
                        warn!(task_id = child.id, "Task revisited while walking descendants");
                        continue;
                    }
                    queue.push_back(child.id);
                    result.push(child);
                }
            }

            Ok(result)
        })
    }

    /// Ancestors of a task, nearest parent first.
    pub fn get_ancestors(&self, task_id: i64) -> TaskResult<Vec<Task>> {
        self.db.with_conn(|conn| {
            let mut result = Vec::new();
            let mut visited: HashSet<i64> = HashSet::new();
            visited.insert(task_id);
            let mut current = parent_of(conn, task_id)?;

            while let Some(id) = current {
                if !visited.insert(id) {
                    warn!(task_id, revisited = id, "Cycle in parent chain; stopping walk");
                    break;
                }
                let Some(task) = get_task_internal(conn, id)? else {
                    break;
                };
                current = task.parent_id;
                result.push(task);
            }

            Ok(result)
        })
    }

    /// Topmost ancestor of a task (the task itself when it has no parent).
    ///
    /// If the stored chain loops, the walk stops at the last task reached
    /// before the repeat.
    pub fn get_root(&self, task_id: i64) -> TaskResult<Option<Task>> {
        self.db.with_conn(|conn| {
            let Some(mut root) = get_task_internal(conn, task_id)? else {
                return Ok(None);
            };
            let mut visited: HashSet<i64> = HashSet::new();
            visited.insert(root.id);

            while let Some(parent_id) = root.parent_id {
                if !visited.insert(parent_id) {
                    warn!(task_id, revisited = parent_id, "Cycle in parent chain; stopping walk");
                    break;
                }
                match get_task_internal(conn, parent_id)? {
                    Some(parent) => root = parent,
                    None => break,
                }
            }

            Ok(Some(root))
        })
    }
}
