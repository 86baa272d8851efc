//! CLI command definitions for taskgraph
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod commands;

use crate::types::TaskStatus;
use clap::{Args, Parser, Subcommand};

/// Track tasks, their parent/child tree and their blocking dependencies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create, inspect, update and delete tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Parent/child tree operations
    #[command(subcommand)]
    Tree(TreeCommand),

    /// Blocking dependencies between tasks
    #[command(subcommand)]
    Block(BlockCommand),

    /// Tags and task-tag associations
    #[command(subcommand)]
    Tag(TagCommand),

    /// Per-task key/value metadata
    #[command(subcommand)]
    Meta(MetaCommand),

    /// Show the database schema and check foreign keys
    Schema,
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(s).map_err(|e| e.to_string())
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task
    Add(AddTaskArgs),

    /// Show a task
    Get { id: i64 },

    /// List tasks, newest first
    List(ListTasksArgs),

    /// Update fields of a task
    Update(UpdateTaskArgs),

    /// Delete a task (children are orphaned, not deleted)
    Delete { id: i64 },

    /// Find tasks whose title or body contains a keyword
    Search {
        keyword: String,

        /// Include done and closed tasks
        #[arg(long)]
        all: bool,
    },

    /// Count tasks by status
    Stats,
}

#[derive(Args, Debug)]
pub struct AddTaskArgs {
    /// Task title (1-200 characters)
    pub title: String,

    #[arg(long)]
    pub body: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    /// Initial status (default: backlog)
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    /// Parent task id
    #[arg(long)]
    pub parent: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ListTasksArgs {
    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    #[arg(long)]
    pub author: Option<String>,

    /// Only tasks carrying this tag name
    #[arg(long)]
    pub tag: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateTaskArgs {
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "clear_body")]
    pub body: Option<String>,

    #[arg(long)]
    pub clear_body: bool,

    #[arg(long, conflicts_with = "clear_author")]
    pub author: Option<String>,

    #[arg(long)]
    pub clear_author: bool,

    #[arg(long, value_parser = parse_status)]
    pub status: Option<TaskStatus>,

    #[arg(long, conflicts_with = "clear_parent")]
    pub parent: Option<i64>,

    #[arg(long)]
    pub clear_parent: bool,
}

#[derive(Subcommand, Debug)]
pub enum TreeCommand {
    /// Make PARENT the parent of TASK
    SetParent { task: i64, parent: i64 },

    /// Detach TASK from its parent
    ClearParent { task: i64 },

    /// Direct children, oldest first
    Children { id: i64 },

    /// Whole subtree, breadth-first
    Descendants { id: i64 },

    /// Parent chain, nearest first
    Ancestors { id: i64 },

    /// Topmost ancestor
    Root { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum BlockCommand {
    /// BLOCKER must finish before BLOCKED
    Add { blocker: i64, blocked: i64 },

    /// Remove a blocking edge
    Remove { blocker: i64, blocked: i64 },

    /// Tasks blocking ID
    Blockers {
        id: i64,

        /// Only blockers that are not done or closed
        #[arg(long)]
        unresolved: bool,
    },

    /// Tasks blocked by ID
    Blocked { id: i64 },

    /// All blocking edges
    List,
}

#[derive(Subcommand, Debug)]
pub enum TagCommand {
    /// Create a tag
    Create { name: String },

    /// List all tags
    List,

    /// Delete a tag (by id or name)
    Delete { tag: String },

    /// Attach a tag (by id or name) to a task
    Attach { task: i64, tag: String },

    /// Detach a tag (by id or name) from a task
    Detach { task: i64, tag: String },

    /// Tags on a task
    Show { task: i64 },

    /// Tasks carrying a tag (by id or name)
    Tasks { tag: String },
}

#[derive(Subcommand, Debug)]
pub enum MetaCommand {
    /// Set (insert or replace) a value
    Set {
        task: i64,
        key: String,
        value: String,
    },

    /// Show one value
    Get { task: i64, key: String },

    /// List all values on a task
    List { task: i64 },

    /// Delete a key
    Delete { task: i64, key: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_task_add() {
        let cli = Cli::try_parse_from([
            "taskgraph", "task", "add", "Write docs", "--status", "in_progress", "--parent", "3",
        ])
        .unwrap();
        match cli.command {
            Command::Task(TaskCommand::Add(args)) => {
                assert_eq!(args.title, "Write docs");
                assert_eq!(args.status, Some(TaskStatus::InProgress));
                assert_eq!(args.parent, Some(3));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_status() {
        let result = Cli::try_parse_from(["taskgraph", "task", "list", "--status", "blocked"]);
        assert!(result.is_err());
    }

    #[test]
    fn body_and_clear_body_conflict() {
        let result = Cli::try_parse_from([
            "taskgraph", "task", "update", "1", "--body", "x", "--clear-body",
        ]);
        assert!(result.is_err());
    }
}
