//! Dispatch of parsed CLI commands onto the repository and graph managers.

use super::{BlockCommand, Command, MetaCommand, TagCommand, TaskCommand, TreeCommand};
use crate::db::schema::{DatabaseSchema, ForeignKeyViolation};
use crate::db::Database;
use crate::error::{TaskError, TaskResult};
use crate::types::{
    BlockingEdge, MetadataEntry, NewTask, Tag, Task, TaskFilter, TaskStatus, TaskUpdate,
};
use std::collections::BTreeMap;

/// Result of a command, rendered by [`crate::format`].
#[derive(Debug)]
pub enum Output {
    Task(Task),
    Tasks(Vec<Task>),
    TaskIds(Vec<i64>),
    Edge(BlockingEdge),
    Edges(Vec<BlockingEdge>),
    Tag(Tag),
    Tags(Vec<Tag>),
    Entry(MetadataEntry),
    Entries(Vec<MetadataEntry>),
    Counts(BTreeMap<TaskStatus, i64>),
    Schema {
        schema: DatabaseSchema,
        violations: Vec<ForeignKeyViolation>,
    },
    /// Outcome of a delete/detach/remove style operation.
    Removed { what: String, removed: bool },
    Done(String),
}

/// Execute a command against the database.
pub fn execute(command: Command, db: &Database) -> TaskResult<Output> {
    match command {
        Command::Task(cmd) => task_command(cmd, db),
        Command::Tree(cmd) => tree_command(cmd, db),
        Command::Block(cmd) => block_command(cmd, db),
        Command::Tag(cmd) => tag_command(cmd, db),
        Command::Meta(cmd) => meta_command(cmd, db),
        Command::Schema => Ok(Output::Schema {
            schema: db.get_schema()?,
            violations: db.foreign_key_violations()?,
        }),
    }
}

fn task_command(cmd: TaskCommand, db: &Database) -> TaskResult<Output> {
    let tasks = db.tasks();
    match cmd {
        TaskCommand::Add(args) => {
            let task = tasks.create(NewTask {
                title: args.title,
                body: args.body,
                author: args.author,
                status: args.status,
                parent_id: args.parent,
            })?;
            Ok(Output::Task(task))
        }
        TaskCommand::Get { id } => tasks
            .get(id)?
            .map(Output::Task)
            .ok_or_else(|| TaskError::task_not_found(id)),
        TaskCommand::List(args) => {
            let filter = TaskFilter {
                status: args.status,
                author: args.author,
                tag: args.tag,
            };
            Ok(Output::Tasks(tasks.list(&filter)?))
        }
        TaskCommand::Update(args) => {
            let id = args.id;
            let update = TaskUpdate {
                title: args.title,
                body: clearable(args.body, args.clear_body),
                author: clearable(args.author, args.clear_author),
                status: args.status,
                parent_id: clearable(args.parent, args.clear_parent),
            };
            if update.is_empty() {
                return Err(TaskError::validation("update", "no fields to update"));
            }
            tasks
                .update(id, update)?
                .map(Output::Task)
                .ok_or_else(|| TaskError::task_not_found(id))
        }
        TaskCommand::Delete { id } => Ok(Output::Removed {
            what: format!("task {}", id),
            removed: tasks.delete(id)?,
        }),
        TaskCommand::Search { keyword, all } => Ok(Output::Tasks(tasks.search(&keyword, all)?)),
        TaskCommand::Stats => Ok(Output::Counts(tasks.count_by_status()?)),
    }
}

/// Map a set value and a clear flag onto a partial-update field.
fn clearable<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

fn tree_command(cmd: TreeCommand, db: &Database) -> TaskResult<Output> {
    let hierarchy = db.hierarchy();
    match cmd {
        TreeCommand::SetParent { task, parent } => {
            Ok(Output::Task(hierarchy.set_parent(task, Some(parent))?))
        }
        TreeCommand::ClearParent { task } => Ok(Output::Task(hierarchy.set_parent(task, None)?)),
        TreeCommand::Children { id } => {
            require_task(db, id)?;
            Ok(Output::Tasks(hierarchy.get_children(id)?))
        }
        TreeCommand::Descendants { id } => {
            require_task(db, id)?;
            Ok(Output::Tasks(hierarchy.get_descendants(id)?))
        }
        TreeCommand::Ancestors { id } => {
            require_task(db, id)?;
            Ok(Output::Tasks(hierarchy.get_ancestors(id)?))
        }
        TreeCommand::Root { id } => hierarchy
            .get_root(id)?
            .map(Output::Task)
            .ok_or_else(|| TaskError::task_not_found(id)),
    }
}

fn block_command(cmd: BlockCommand, db: &Database) -> TaskResult<Output> {
    let graph = db.blocking();
    match cmd {
        BlockCommand::Add { blocker, blocked } => Ok(Output::Edge(graph.add_edge(blocker, blocked)?)),
        BlockCommand::Remove { blocker, blocked } => Ok(Output::Removed {
            what: format!("edge {} -> {}", blocker, blocked),
            removed: graph.remove_edge(blocker, blocked)?,
        }),
        BlockCommand::Blockers { id, unresolved } => {
            require_task(db, id)?;
            let ids = if unresolved {
                graph.unresolved_blockers(id)?
            } else {
                graph.get_blockers(id)?
            };
            Ok(Output::TaskIds(ids))
        }
        BlockCommand::Blocked { id } => {
            require_task(db, id)?;
            Ok(Output::TaskIds(graph.get_blocked(id)?))
        }
        BlockCommand::List => Ok(Output::Edges(graph.list_edges()?)),
    }
}

fn tag_command(cmd: TagCommand, db: &Database) -> TaskResult<Output> {
    let tags = db.tags();
    match cmd {
        TagCommand::Create { name } => Ok(Output::Tag(tags.create(&name)?)),
        TagCommand::List => Ok(Output::Tags(tags.list()?)),
        TagCommand::Delete { tag } => {
            let tag = resolve_tag(db, &tag)?;
            Ok(Output::Removed {
                what: format!("tag '{}'", tag.name),
                removed: tags.delete(tag.id)?,
            })
        }
        TagCommand::Attach { task, tag } => {
            let tag = resolve_tag(db, &tag)?;
            tags.attach(task, tag.id)?;
            Ok(Output::Done(format!("Attached tag '{}' to task {}", tag.name, task)))
        }
        TagCommand::Detach { task, tag } => {
            let tag = resolve_tag(db, &tag)?;
            Ok(Output::Removed {
                what: format!("tag '{}' on task {}", tag.name, task),
                removed: tags.detach(task, tag.id)?,
            })
        }
        TagCommand::Show { task } => {
            require_task(db, task)?;
            Ok(Output::Tags(tags.tags_for_task(task)?))
        }
        TagCommand::Tasks { tag } => {
            let tag = resolve_tag(db, &tag)?;
            Ok(Output::Tasks(tags.tasks_with_tag(tag.id)?))
        }
    }
}

fn meta_command(cmd: MetaCommand, db: &Database) -> TaskResult<Output> {
    let metadata = db.metadata();
    match cmd {
        MetaCommand::Set { task, key, value } => Ok(Output::Entry(metadata.set(task, &key, &value)?)),
        MetaCommand::Get { task, key } => match metadata.get(task, &key)? {
            Some(entry) => Ok(Output::Entry(entry)),
            None => {
                require_task(db, task)?;
                Err(TaskError::validation(
                    "key",
                    format!("task {} has no metadata key '{}'", task, key),
                ))
            }
        },
        MetaCommand::List { task } => {
            require_task(db, task)?;
            Ok(Output::Entries(metadata.list(task)?))
        }
        MetaCommand::Delete { task, key } => Ok(Output::Removed {
            what: format!("key '{}' on task {}", key, task),
            removed: metadata.delete(task, &key)?,
        }),
    }
}

fn require_task(db: &Database, id: i64) -> TaskResult<()> {
    match db.tasks().get(id)? {
        Some(_) => Ok(()),
        None => Err(TaskError::task_not_found(id)),
    }
}

fn resolve_tag(db: &Database, ident: &str) -> TaskResult<Tag> {
    match db.tags().resolve(ident)? {
        Some(tag) => Ok(tag),
        None => match ident.trim().parse::<i64>() {
            Ok(id) => Err(TaskError::tag_not_found(id)),
            Err(_) => Err(TaskError::validation(
                "tag",
                format!("no tag named '{}'", ident.trim()),
            )),
        },
    }
}
