//! Core types for the task graph.

use crate::error::TaskError;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum task title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum task body length, in characters.
pub const MAX_BODY_LEN: usize = 10_000;
/// Maximum author length, in characters.
pub const MAX_AUTHOR_LEN: usize = 100;
/// Maximum tag name length, in characters.
pub const MAX_TAG_NAME_LEN: usize = 50;
/// Maximum metadata key length, in characters.
pub const MAX_META_KEY_LEN: usize = 50;
/// Maximum metadata value length, in characters.
pub const MAX_META_VALUE_LEN: usize = 500;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Backlog,
    Ready,
    InProgress,
    Review,
    Done,
    Closed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::Backlog,
        TaskStatus::Ready,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
        TaskStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "backlog",
            TaskStatus::Ready => "ready",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Closed => "closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        TaskStatus::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Parse user input, reporting unknown values as a validation error.
    pub fn parse(s: &str) -> Result<Self, TaskError> {
        Self::from_str(s).ok_or_else(|| {
            let names: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
            TaskError::validation(
                "status",
                format!("'{}' is not one of: {}", s, names.join(", ")),
            )
        })
    }

    /// `done` and `closed` end a task's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Closed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        TaskStatus::from_str(text).ok_or_else(|| {
            FromSqlError::Other(format!("unknown task status '{}'", text).into())
        })
    }
}

/// A task in the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    pub status: TaskStatus,
    pub parent_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub body: Option<String>,
    pub author: Option<String>,
    /// Defaults to `backlog`.
    pub status: Option<TaskStatus>,
    pub parent_id: Option<i64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Partial update of a task.
///
/// `None` leaves a field unchanged. For clearable fields the inner `None`
/// clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub author: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub parent_id: Option<Option<i64>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.author.is_none()
            && self.status.is_none()
            && self.parent_id.is_none()
    }
}

/// Filters for listing tasks. All set filters must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub author: Option<String>,
    /// Tag name the task must carry.
    pub tag: Option<String>,
}

/// A directed "must finish before" edge between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingEdge {
    pub blocker_id: i64,
    pub blocked_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// A key/value pair attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub task_id: i64,
    pub key: String,
    pub value: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::default(), TaskStatus::Backlog);
    }

    #[test]
    fn unknown_status_is_a_validation_error() {
        let err = TaskStatus::parse("blocked").unwrap_err();
        assert_eq!(err.field(), Some("status"));
        assert!(err.to_string().contains("in_progress"));
    }

    #[test]
    fn only_done_and_closed_are_terminal() {
        let terminal: Vec<TaskStatus> = TaskStatus::ALL
            .into_iter()
            .filter(TaskStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![TaskStatus::Done, TaskStatus::Closed]);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
