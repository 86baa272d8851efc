//! Database layer for the task graph.
//!
//! `Database` owns the single SQLite connection. Repositories and graph
//! managers borrow it; none of them hold a connection of their own.

pub mod deps;
pub mod hierarchy;
pub mod metadata;
pub mod schema;
pub mod search;
pub mod tags;
pub mod tasks;

use crate::error::TaskResult;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

pub use deps::BlockingGraph;
pub use hierarchy::HierarchyManager;
pub use metadata::MetadataStore;
pub use tags::TagManager;
pub use tasks::TaskRepository;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Database handle wrapping a SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create the database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> TaskResult<Self> {
        let conn = Connection::open(path.as_ref())?;

        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA foreign_keys=ON;
             PRAGMA busy_timeout=5000;",
        )?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;
        debug!(path = %path.as_ref().display(), "Opened task database");

        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> TaskResult<Self> {
        let conn = Connection::open_in_memory()?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.run_migrations()?;

        Ok(db)
    }

    /// Run database migrations.
    fn run_migrations(&self) -> TaskResult<()> {
        let mut conn = self.lock();
        let report = embedded::migrations::runner().run(&mut *conn)?;
        for migration in report.applied_migrations() {
            debug!(version = migration.version(), name = migration.name(), "Applied migration");
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a function with exclusive access to the connection.
    pub fn with_conn<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&Connection) -> TaskResult<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    /// Execute a function inside a transaction. Commits on `Ok`, rolls back on `Err`.
    pub fn with_tx<F, T>(&self, f: F) -> TaskResult<T>
    where
        F: FnOnce(&Connection) -> TaskResult<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Close the connection. Consumes the handle, so nothing can use it afterwards.
    pub fn close(self) -> TaskResult<()> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close().map_err(|(_, err)| err)?;
        Ok(())
    }

    pub fn tasks(&self) -> TaskRepository<'_> {
        TaskRepository::new(self)
    }

    pub fn hierarchy(&self) -> HierarchyManager<'_> {
        HierarchyManager::new(self)
    }

    pub fn blocking(&self) -> BlockingGraph<'_> {
        BlockingGraph::new(self)
    }

    pub fn tags(&self) -> TagManager<'_> {
        TagManager::new(self)
    }

    pub fn metadata(&self) -> MetadataStore<'_> {
        MetadataStore::new(self)
    }
}

/// Get the current timestamp in milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Check whether a task row exists.
pub(crate) fn task_exists(conn: &Connection, task_id: i64) -> TaskResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM tasks WHERE id = ?1)",
        [task_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}
