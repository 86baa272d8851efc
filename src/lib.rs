//! Task tracking with referential integrity.
//!
//! Tasks live in SQLite and are related three ways: a parent/child forest,
//! a directed acyclic blocking graph, and tag/metadata side tables. The
//! managers in [`db`] keep both graphs acyclic and let the store's foreign
//! keys handle cascades on delete.

pub mod cli;
pub mod config;
pub mod cycle;
pub mod db;
pub mod error;
pub mod format;
pub mod logging;
pub mod types;

pub use db::Database;
pub use error::{TaskError, TaskResult};
