//! Connectors - the pluggable sources the engine extracts from.
//!
//! A connector names itself, opens a run-scoped handle to the remote
//! system, and contributes its task list. Everything else (conditions,
//! grouping, parallelism, output commit) belongs to the engine.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::cli::DumpArgs;
use crate::error::DumpError;
use crate::task::Task;

pub mod common;
pub mod fsmeta;
pub mod sqlite;

pub use fsmeta::FsMetadataConnector;
pub use sqlite::SqliteConnector;

/// Opaque run-scoped handle to the opened remote system.
///
/// Obtained once before any task runs and dropped once after all tasks
/// conclude. Tasks receive it by reference, treat it as shared
/// read-only, and must not close it.
#[derive(Debug)]
pub enum Handle {
    /// For engine tests and tasks that touch no remote system.
    None,
    /// A SQLite database opened read-only. The mutex serializes
    /// statement execution across parallel tasks.
    Sqlite(Mutex<rusqlite::Connection>),
    /// Root of a filesystem crawl.
    Directory(PathBuf),
}

impl Handle {
    /// Lock the SQLite connection, or fail fatally if this run was not
    /// opened against a database.
    pub fn sqlite(&self) -> Result<MutexGuard<'_, rusqlite::Connection>, DumpError> {
        match self {
            Handle::Sqlite(connection) => {
                Ok(connection.lock().unwrap_or_else(|poisoned| poisoned.into_inner()))
            }
            _ => Err(DumpError::internal("task requires a SQLite handle")),
        }
    }

    pub fn directory(&self) -> Result<&Path, DumpError> {
        match self {
            Handle::Directory(path) => Ok(path),
            _ => Err(DumpError::internal("task requires a directory handle")),
        }
    }
}

/// One extraction source: knows how to open its handle and which tasks
/// to run against it.
pub trait Connector: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Default output directory name when `--output` is not given.
    fn default_file_name(&self) -> String {
        format!("{}-dump", self.name())
    }

    /// Open the run-scoped handle. Configuration problems surface here
    /// as usage errors, before any task runs.
    fn open(&self, args: &DumpArgs) -> Result<Handle, DumpError>;

    /// Append this connector's tasks to the top-level task list.
    fn add_tasks(&self, tasks: &mut Vec<Arc<dyn Task>>, args: &DumpArgs) -> Result<(), DumpError>;
}

/// Look up a connector by its CLI name.
pub fn connector_for(name: &str) -> Option<Box<dyn Connector>> {
    match name.to_ascii_lowercase().as_str() {
        "sqlite" => Some(Box::new(SqliteConnector)),
        "fs" => Some(Box::new(FsMetadataConnector)),
        _ => None,
    }
}

/// Names of all registered connectors, for usage messages.
pub fn connector_names() -> &'static [&'static str] {
    &["sqlite", "fs"]
}
