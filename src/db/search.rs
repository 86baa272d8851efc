//! Substring search over task titles and bodies.

use super::tasks::{query_tasks, TASK_COLUMNS};
use super::Database;
use crate::error::{TaskError, TaskResult};
use crate::types::{Task, TaskStatus};
use rusqlite::params;

impl<'db> super::TaskRepository<'db> {
    /// Search tasks whose title or body contains `keyword`, newest first.
    ///
    /// Matching ignores ASCII case. `done` and `closed` tasks are skipped
    /// unless `include_terminal` is set.
    pub fn search(&self, keyword: &str, include_terminal: bool) -> TaskResult<Vec<Task>> {
        search_tasks(self.db(), keyword, include_terminal)
    }
}

fn search_tasks(db: &Database, keyword: &str, include_terminal: bool) -> TaskResult<Vec<Task>> {
    if keyword.trim().is_empty() {
        return Err(TaskError::validation("keyword", "search keyword must not be empty"));
    }

    db.with_conn(|conn| {
        // instr() rather than LIKE so '%' and '_' in the keyword match literally.
        let mut sql = format!(
            "SELECT {} FROM tasks t
             WHERE (instr(lower(t.title), lower(?1)) > 0
                    OR instr(lower(COALESCE(t.body, '')), lower(?1)) > 0)",
            TASK_COLUMNS
        );
        if !include_terminal {
            sql.push_str(" AND t.status NOT IN (?2, ?3)");
        }
        sql.push_str(" ORDER BY t.created_at DESC, t.id DESC");

        if include_terminal {
            query_tasks(conn, &sql, params![keyword])
        } else {
            query_tasks(
                conn,
                &sql,
                params![keyword, TaskStatus::Done, TaskStatus::Closed],
            )
        }
    })
}
