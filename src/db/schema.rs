//! Schema introspection for the task store.
//!
//! Used to confirm that the referential rules the graph managers rely on
//! (foreign keys, cascade actions, unique keys) are actually in place.

use super::Database;
use crate::error::TaskResult;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// Information about a table column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    /// Position within the primary key (1-based), 0 when not part of it.
    pub primary_key: i32,
}

/// Information about an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Information about a foreign key relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    pub on_delete: String,
}

/// Information about a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
}

impl TableInfo {
    /// Foreign key leaving `column`, if any.
    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKeyInfo> {
        self.foreign_keys.iter().find(|fk| fk.from_column == column)
    }

    /// Primary key columns in key order.
    pub fn primary_key(&self) -> Vec<&str> {
        let mut key: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.primary_key > 0).collect();
        key.sort_by_key(|c| c.primary_key);
        key.into_iter().map(|c| c.name.as_str()).collect()
    }
}

/// Complete database schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub tables: Vec<TableInfo>,
    /// Highest applied migration version.
    pub version: Option<i32>,
    pub foreign_keys_enabled: bool,
    pub sqlite_version: String,
}

impl DatabaseSchema {
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.iter().find(|t| t.name == name)
    }
}

/// A row whose foreign key points at a missing parent row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyViolation {
    pub table: String,
    pub rowid: Option<i64>,
    pub parent_table: String,
}

impl Database {
    /// Get schema information for the application tables.
    pub fn get_schema(&self) -> TaskResult<DatabaseSchema> {
        self.with_conn(|conn| {
            let sqlite_version: String =
                conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))?;
            let foreign_keys_enabled: bool =
                conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
            let version: Option<i32> = conn.query_row(
                "SELECT MAX(version) FROM refinery_schema_history",
                [],
                |row| row.get(0),
            )?;

            let mut tables = Vec::new();
            for name in table_names(conn)? {
                tables.push(TableInfo {
                    columns: table_columns(conn, &name)?,
                    indexes: table_indexes(conn, &name)?,
                    foreign_keys: table_foreign_keys(conn, &name)?,
                    name,
                });
            }

            Ok(DatabaseSchema {
                tables,
                version,
                foreign_keys_enabled,
                sqlite_version,
            })
        })
    }

    /// Run SQLite's foreign key check over the whole database.
    pub fn foreign_key_violations(&self) -> TaskResult<Vec<ForeignKeyViolation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
            let violations = stmt
                .query_map([], |row| {
                    Ok(ForeignKeyViolation {
                        table: row.get(0)?,
                        rowid: row.get(1)?,
                        parent_table: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(violations)
        })
    }
}

fn table_names(conn: &Connection) -> TaskResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table'
         AND name NOT LIKE 'sqlite_%'
         AND name NOT LIKE 'refinery_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

fn table_columns(conn: &Connection, table: &str) -> TaskResult<Vec<ColumnInfo>> {
    let mut stmt = conn.prepare("SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(ColumnInfo {
                name: row.get(0)?,
                data_type: row.get::<_, String>(1)?.to_uppercase(),
                nullable: !row.get::<_, bool>(2)?,
                default_value: row.get(3)?,
                primary_key: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

fn table_indexes(conn: &Connection, table: &str) -> TaskResult<Vec<IndexInfo>> {
    let mut stmt = conn.prepare("SELECT name, \"unique\" FROM pragma_index_list(?1)")?;
    let index_list = stmt
        .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut indexes = Vec::new();
    for (name, unique) in index_list {
        let mut stmt = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let columns = stmt
            .query_map([&name], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        indexes.push(IndexInfo {
            name,
            unique,
            columns,
        });
    }
    Ok(indexes)
}

fn table_foreign_keys(conn: &Connection, table: &str) -> TaskResult<Vec<ForeignKeyInfo>> {
    let mut stmt = conn.prepare(
        "SELECT \"from\", \"table\", \"to\", on_delete FROM pragma_foreign_key_list(?1)",
    )?;
    let foreign_keys = stmt
        .query_map([table], |row| {
            Ok(ForeignKeyInfo {
                from_column: row.get(0)?,
                to_table: row.get(1)?,
                to_column: row.get(2)?,
                on_delete: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(foreign_keys)
}
