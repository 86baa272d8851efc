//! Tests for schema introspection and the store's referential rules.

use taskgraph::db::Database;
use taskgraph::types::NewTask;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

#[test]
fn get_schema_returns_all_tables() {
    let db = setup_db();

    let schema = db.get_schema().expect("Failed to get schema");

    assert!(!schema.sqlite_version.is_empty());
    assert_eq!(schema.version, Some(2));
    assert!(schema.foreign_keys_enabled, "foreign keys must be enforced");

    let mut names: Vec<&str> = schema.tables.iter().map(|t| t.name.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["blocking_edges", "tags", "task_metadata", "task_tags", "tasks"]
    );
}

#[test]
fn tasks_table_columns() {
    let db = setup_db();
    let schema = db.get_schema().unwrap();
    let tasks = schema.table("tasks").expect("tasks table");

    let column_names: Vec<&str> = tasks.columns.iter().map(|c| c.name.as_str()).collect();
    for expected in [
        "id", "title", "body", "author", "status", "parent_id", "created_at", "updated_at",
    ] {
        assert!(column_names.contains(&expected), "missing column {}", expected);
    }

    assert_eq!(tasks.primary_key(), vec!["id"]);

    let title = tasks.columns.iter().find(|c| c.name == "title").unwrap();
    assert!(!title.nullable);
    let body = tasks.columns.iter().find(|c| c.name == "body").unwrap();
    assert!(body.nullable);
}

#[test]
fn parent_reference_sets_null_on_delete() {
    let db = setup_db();
    let schema = db.get_schema().unwrap();
    let tasks = schema.table("tasks").unwrap();

    let fk = tasks.foreign_key("parent_id").expect("parent_id foreign key");
    assert_eq!(fk.to_table, "tasks");
    assert_eq!(fk.to_column, "id");
    assert_eq!(fk.on_delete, "SET NULL");
}

#[test]
fn side_tables_cascade_on_delete() {
    let db = setup_db();
    let schema = db.get_schema().unwrap();

    let cases = [
        ("blocking_edges", "blocker_task_id", "tasks"),
        ("blocking_edges", "blocked_task_id", "tasks"),
        ("task_tags", "task_id", "tasks"),
        ("task_tags", "tag_id", "tags"),
        ("task_metadata", "task_id", "tasks"),
    ];
    for (table, column, target) in cases {
        let fk = schema
            .table(table)
            .and_then(|t| t.foreign_key(column))
            .unwrap_or_else(|| panic!("{}.{} foreign key", table, column));
        assert_eq!(fk.to_table, target, "{}.{}", table, column);
        assert_eq!(fk.on_delete, "CASCADE", "{}.{}", table, column);
    }
}

#[test]
fn composite_keys_prevent_duplicates() {
    let db = setup_db();
    let schema = db.get_schema().unwrap();

    assert_eq!(
        schema.table("blocking_edges").unwrap().primary_key(),
        vec!["blocker_task_id", "blocked_task_id"]
    );
    assert_eq!(
        schema.table("task_tags").unwrap().primary_key(),
        vec!["task_id", "tag_id"]
    );
    assert_eq!(
        schema.table("task_metadata").unwrap().primary_key(),
        vec!["task_id", "key"]
    );

    let tags = schema.table("tags").unwrap();
    assert!(
        tags.indexes
            .iter()
            .any(|idx| idx.unique && idx.columns == vec!["name".to_string()]),
        "tag names must be unique"
    );
}

#[test]
fn fresh_database_has_no_fk_violations() {
    let db = setup_db();
    let parent = db.tasks().create(NewTask::new("parent")).unwrap();
    db.tasks()
        .create(NewTask::new("child").with_parent(parent.id))
        .unwrap();
    db.tasks().delete(parent.id).unwrap();

    assert!(db.foreign_key_violations().unwrap().is_empty());
}

#[test]
fn file_database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.db");

    let id = {
        let db = Database::open(&path).expect("Failed to open file database");
        let id = db.tasks().create(NewTask::new("persisted")).unwrap().id;
        db.close().unwrap();
        id
    };

    let db = Database::open(&path).expect("Failed to reopen file database");
    let task = db.tasks().get(id).unwrap().expect("task survives reopen");
    assert_eq!(task.title, "persisted");
    assert_eq!(db.get_schema().unwrap().version, Some(2));
}
