//! Output formatting for markdown and JSON.

use crate::cli::commands::Output;
use crate::db::schema::{DatabaseSchema, ForeignKeyViolation};
use crate::types::{BlockingEdge, MetadataEntry, Tag, Task, TaskStatus};
use serde_json::{Value, json};
use std::collections::BTreeMap;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Markdown
        }
    }
}

/// Render a command result in the requested format.
pub fn render(output: &Output, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&to_json(output)).unwrap_or_else(|e| e.to_string())
        }
        OutputFormat::Markdown => to_markdown(output),
    }
}

fn to_json(output: &Output) -> Value {
    match output {
        Output::Task(task) => json!(task),
        Output::Tasks(tasks) => json!(tasks),
        Output::TaskIds(ids) => json!(ids),
        Output::Edge(edge) => json!(edge),
        Output::Edges(edges) => json!(edges),
        Output::Tag(tag) => json!(tag),
        Output::Tags(tags) => json!(tags),
        Output::Entry(entry) => json!(entry),
        Output::Entries(entries) => json!(entries),
        Output::Counts(counts) => {
            let counts: BTreeMap<&str, i64> =
                counts.iter().map(|(s, n)| (s.as_str(), *n)).collect();
            json!(counts)
        }
        Output::Schema { schema, violations } => json!({
            "schema": schema,
            "foreign_key_violations": violations,
        }),
        Output::Removed { what, removed } => json!({ "target": what, "removed": removed }),
        Output::Done(message) => json!({ "message": message }),
    }
}

fn to_markdown(output: &Output) -> String {
    match output {
        Output::Task(task) => format_task_markdown(task),
        Output::Tasks(tasks) => format_tasks_markdown(tasks),
        Output::TaskIds(ids) => {
            if ids.is_empty() {
                "(none)\n".to_string()
            } else {
                let ids: Vec<String> = ids.iter().map(|id| format!("`{}`", id)).collect();
                format!("{}\n", ids.join(", "))
            }
        }
        Output::Edge(edge) => format_edge(edge),
        Output::Edges(edges) => {
            let mut md = format!("# Blocking edges ({})\n\n", edges.len());
            for edge in edges {
                md.push_str(&format_edge(edge));
            }
            md
        }
        Output::Tag(tag) => format_tag(tag),
        Output::Tags(tags) => {
            let mut md = format!("# Tags ({})\n\n", tags.len());
            for tag in tags {
                md.push_str(&format_tag(tag));
            }
            md
        }
        Output::Entry(entry) => format_entry(entry),
        Output::Entries(entries) => {
            let mut md = String::new();
            for entry in entries {
                md.push_str(&format_entry(entry));
            }
            if md.is_empty() {
                md.push_str("(no metadata)\n");
            }
            md
        }
        Output::Counts(counts) => format_counts_markdown(counts),
        Output::Schema { schema, violations } => format_schema_markdown(schema, violations),
        Output::Removed { what, removed } => {
            if *removed {
                format!("Removed {}\n", what)
            } else {
                format!("Nothing to remove: {} does not exist\n", what)
            }
        }
        Output::Done(message) => format!("{}\n", message),
    }
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.title));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));

    if let Some(ref author) = task.author {
        md.push_str(&format!("- **author**: {}\n", author));
    }

    if let Some(parent_id) = task.parent_id {
        md.push_str(&format!("- **parent_id**: `{}`\n", parent_id));
    }

    md.push_str(&format!("- **created_at**: {}\n", task.created_at));
    md.push_str(&format!("- **updated_at**: {}\n", task.updated_at));

    if let Some(ref body) = task.body {
        md.push_str("\n### Body\n");
        md.push_str(body);
        md.push('\n');
    }

    md
}

/// Format a list of tasks as markdown, one line each, in the given order.
pub fn format_tasks_markdown(tasks: &[Task]) -> String {
    let mut md = format!("# Tasks ({})\n\n", tasks.len());
    for task in tasks {
        md.push_str(&format_task_short(task));
    }
    md
}

fn format_task_short(task: &Task) -> String {
    let author = task
        .author
        .as_ref()
        .map(|a| format!(" @{}", a))
        .unwrap_or_default();

    let parent = task
        .parent_id
        .map(|p| format!(" (parent `{}`)", p))
        .unwrap_or_default();

    format!(
        "- [{}] {} `{}`{}{}\n",
        task.status, task.title, task.id, author, parent
    )
}

fn format_edge(edge: &BlockingEdge) -> String {
    format!("- `{}` blocks `{}`\n", edge.blocker_id, edge.blocked_id)
}

fn format_tag(tag: &Tag) -> String {
    format!("- {} `{}`\n", tag.name, tag.id)
}

fn format_entry(entry: &MetadataEntry) -> String {
    format!("- **{}**: {}\n", entry.key, entry.value)
}

fn format_counts_markdown(counts: &BTreeMap<TaskStatus, i64>) -> String {
    let total: i64 = counts.values().sum();
    let mut md = format!("# Tasks by status ({})\n\n", total);
    for (status, count) in counts {
        md.push_str(&format!("- **{}**: {}\n", status, count));
    }
    md
}

fn format_schema_markdown(schema: &DatabaseSchema, violations: &[ForeignKeyViolation]) -> String {
    let mut md = String::from("# Schema\n");
    md.push_str(&format!(
        "- **version**: {}\n",
        schema
            .version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    ));
    md.push_str(&format!("- **sqlite**: {}\n", schema.sqlite_version));
    md.push_str(&format!(
        "- **foreign_keys**: {}\n",
        if schema.foreign_keys_enabled { "on" } else { "off" }
    ));

    for table in &schema.tables {
        md.push_str(&format!("\n## {}\n", table.name));
        for column in &table.columns {
            let mut line = format!("- `{}` {}", column.name, column.data_type);
            if column.primary_key > 0 {
                line.push_str(" PK");
            }
            if !column.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(fk) = table.foreign_key(&column.name) {
                line.push_str(&format!(
                    " -> {}({}) ON DELETE {}",
                    fk.to_table, fk.to_column, fk.on_delete
                ));
            }
            md.push_str(&line);
            md.push('\n');
        }
    }

    if !violations.is_empty() {
        md.push_str(&format!("\n## Foreign key violations ({})\n", violations.len()));
        for v in violations {
            md.push_str(&format!(
                "- {} row {} -> missing {}\n",
                v.table,
                v.rowid.map(|r| r.to_string()).unwrap_or_else(|| "?".to_string()),
                v.parent_table
            ));
        }
    }

    md
}
