//! Blocking edges and cycle detection.

use super::{now_ms, task_exists, Database};
use crate::cycle::would_create_edge_cycle;
use crate::error::{is_unique_violation, GraphKind, TaskError, TaskResult};
use crate::types::{BlockingEdge, TaskStatus};
use rusqlite::{params, Connection};
use tracing::debug;

/// Tasks directly blocked by `task_id`.
fn blocked_by(conn: &Connection, task_id: i64) -> TaskResult<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT blocked_task_id FROM blocking_edges WHERE blocker_task_id = ?1
         ORDER BY blocked_task_id",
    )?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Tasks that directly block `task_id`.
fn blockers_of(conn: &Connection, task_id: i64) -> TaskResult<Vec<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT blocker_task_id FROM blocking_edges WHERE blocked_task_id = ?1
         ORDER BY blocker_task_id",
    )?;
    let ids = stmt
        .query_map(params![task_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

fn edge_exists(conn: &Connection, blocker_id: i64, blocked_id: i64) -> TaskResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM blocking_edges
                       WHERE blocker_task_id = ?1 AND blocked_task_id = ?2)",
        params![blocker_id, blocked_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Manager for the blocker/blocked graph.
pub struct BlockingGraph<'db> {
    db: &'db Database,
}

impl<'db> BlockingGraph<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self { db }
    }

    /// Add a dependency (`blocker_id` blocks `blocked_id`).
    pub fn add_edge(&self, blocker_id: i64, blocked_id: i64) -> TaskResult<BlockingEdge> {
        if blocker_id == blocked_id {
            return Err(TaskError::validation(
                "blocked_id",
                format!("task {} cannot block itself", blocker_id),
            ));
        }
        let now = now_ms();

        self.db.with_tx(|conn| {
            for id in [blocker_id, blocked_id] {
                if !task_exists(conn, id)? {
                    return Err(TaskError::task_not_found(id));
                }
            }

            // Evaluated against the live edge set on every call.
            if would_create_edge_cycle(blocker_id, blocked_id, |id| blocked_by(conn, id))? {
                return Err(TaskError::Cycle {
                    graph: GraphKind::Blocking,
                    from: blocker_id,
                    to: blocked_id,
                });
            }

            if edge_exists(conn, blocker_id, blocked_id)? {
                return Err(duplicate_edge(blocker_id, blocked_id));
            }

            conn.execute(
                "INSERT INTO blocking_edges (blocker_task_id, blocked_task_id, created_at)
                 VALUES (?1, ?2, ?3)",
                params![blocker_id, blocked_id, now],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    duplicate_edge(blocker_id, blocked_id)
                } else {
                    e.into()
                }
            })?;
            debug!(blocker_id, blocked_id, "Added blocking edge");

            Ok(BlockingEdge {
                blocker_id,
                blocked_id,
                created_at: now,
            })
        })
    }

    /// Remove a dependency. Returns `false` if the edge did not exist.
    pub fn remove_edge(&self, blocker_id: i64, blocked_id: i64) -> TaskResult<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM blocking_edges WHERE blocker_task_id = ?1 AND blocked_task_id = ?2",
                params![blocker_id, blocked_id],
            )?;
            if removed > 0 {
                debug!(blocker_id, blocked_id, "Removed blocking edge");
            }
            Ok(removed > 0)
        })
    }

    /// Get tasks that block a given task.
    pub fn get_blockers(&self, task_id: i64) -> TaskResult<Vec<i64>> {
        self.db.with_conn(|conn| blockers_of(conn, task_id))
    }

    /// Get tasks that a given task blocks.
    pub fn get_blocked(&self, task_id: i64) -> TaskResult<Vec<i64>> {
        self.db.with_conn(|conn| blocked_by(conn, task_id))
    }

    /// Get all edges.
    pub fn list_edges(&self) -> TaskResult<Vec<BlockingEdge>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT blocker_task_id, blocked_task_id, created_at FROM blocking_edges
                 ORDER BY blocker_task_id, blocked_task_id",
            )?;
            let edges = stmt
                .query_map([], |row| {
                    Ok(BlockingEdge {
                        blocker_id: row.get(0)?,
                        blocked_id: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    /// Blockers of `task_id` that have not reached a terminal status.
    ///
    /// Informational only; nothing here stops a blocked task from changing status.
    pub fn unresolved_blockers(&self, task_id: i64) -> TaskResult<Vec<i64>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT e.blocker_task_id FROM blocking_edges e
                 INNER JOIN tasks blocker ON blocker.id = e.blocker_task_id
                 WHERE e.blocked_task_id = ?1 AND blocker.status NOT IN (?2, ?3)
                 ORDER BY e.blocker_task_id",
            )?;
            let ids = stmt
                .query_map(
                    params![task_id, TaskStatus::Done, TaskStatus::Closed],
                    |row| row.get(0),
                )?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }
}

fn duplicate_edge(blocker_id: i64, blocked_id: i64) -> TaskError {
    TaskError::Conflict(format!(
        "Task {} already blocks task {}",
        blocker_id, blocked_id
    ))
}
