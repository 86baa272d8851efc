//! Structured error types for repository and graph operations.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,
    ParentNotFound,
    TagNotFound,

    // Conflict errors
    AlreadyExists,
    HierarchyCycle,
    DependencyCycle,

    // Internal errors
    DatabaseError,
    MigrationError,
}

/// Kind of record an id failed to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Task,
    ParentTask,
    Tag,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Task => "Task",
            Entity::ParentTask => "Parent task",
            Entity::Tag => "Tag",
        })
    }
}

/// Which of the two task graphs an edge belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    /// Parent/child forest (`tasks.parent_id`).
    Hierarchy,
    /// Blocker/blocked graph (`blocking_edges`).
    Blocking,
}

#[derive(Debug, Error)]
pub enum TaskError {
    /// Caller-correctable input problem naming the offending field.
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// Duplicate unique key (tag name, blocking edge, task-tag pair).
    #[error("{0}")]
    Conflict(String),

    #[error("{}", cycle_message(.graph, .from, .to))]
    Cycle { graph: GraphKind, from: i64, to: i64 },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),
}

fn cycle_message(graph: &GraphKind, from: &i64, to: &i64) -> String {
    match graph {
        GraphKind::Hierarchy => format!(
            "Setting parent of task {} to {} would create a cycle",
            from, to
        ),
        GraphKind::Blocking => format!(
            "Adding dependency {} -> {} would create a cycle",
            from, to
        ),
    }
}

impl TaskError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        TaskError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn task_not_found(id: i64) -> Self {
        TaskError::NotFound {
            entity: Entity::Task,
            id,
        }
    }

    pub fn parent_not_found(id: i64) -> Self {
        TaskError::NotFound {
            entity: Entity::ParentTask,
            id,
        }
    }

    pub fn tag_not_found(id: i64) -> Self {
        TaskError::NotFound {
            entity: Entity::Tag,
            id,
        }
    }

    /// Stable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            TaskError::Validation { .. } => ErrorCode::InvalidFieldValue,
            TaskError::NotFound { entity, .. } => match entity {
                Entity::Task => ErrorCode::TaskNotFound,
                Entity::ParentTask => ErrorCode::ParentNotFound,
                Entity::Tag => ErrorCode::TagNotFound,
            },
            TaskError::Conflict(_) => ErrorCode::AlreadyExists,
            TaskError::Cycle { graph, .. } => match graph {
                GraphKind::Hierarchy => ErrorCode::HierarchyCycle,
                GraphKind::Blocking => ErrorCode::DependencyCycle,
            },
            TaskError::Database(_) => ErrorCode::DatabaseError,
            TaskError::Migration(_) => ErrorCode::MigrationError,
        }
    }

    /// Field name for validation errors.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            TaskError::Validation { field, .. } => Some(*field),
            _ => None,
        }
    }

    /// Render as the JSON error object printed by the CLI.
    pub fn to_json(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(field) = self.field() {
            value["field"] = serde_json::Value::from(field);
        }
        value
    }
}

/// Result type for repository operations.
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// True when a SQLite error is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_variant() {
        assert_eq!(
            TaskError::validation("title", "too long").code(),
            ErrorCode::InvalidFieldValue
        );
        assert_eq!(TaskError::parent_not_found(4).code(), ErrorCode::ParentNotFound);
        assert_eq!(
            TaskError::Cycle {
                graph: GraphKind::Blocking,
                from: 1,
                to: 2
            }
            .code(),
            ErrorCode::DependencyCycle
        );
    }

    #[test]
    fn json_includes_field_for_validation() {
        let json = TaskError::validation("body", "too long").to_json();
        assert_eq!(json["code"], "INVALID_FIELD_VALUE");
        assert_eq!(json["field"], "body");

        let json = TaskError::task_not_found(9).to_json();
        assert_eq!(json["code"], "TASK_NOT_FOUND");
        assert_eq!(json["message"], "Task not found: 9");
        assert!(json.get("field").is_none());
    }
}
