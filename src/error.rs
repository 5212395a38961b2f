//! Error types for the dumper engine.
//!
//! Errors fall into two tiers. Fatal errors (bad configuration, a broken
//! executor, a programming mistake in sink handling) abort the whole run.
//! Everything else is a task-body error: it is caught at the child-runner
//! boundary, recorded in the ledger as FAILED, and never unwinds past a
//! task group.

use thiserror::Error;

/// All errors produced by the engine and its connectors.
#[derive(Error, Debug)]
pub enum DumpError {
    /// Bad configuration or invalid command line. Always fatal.
    #[error("usage error: {0}")]
    Usage(String),

    /// A second sink was opened for a target path that already has one
    /// in this run. Programmer error, not retryable.
    #[error("duplicate output sink for '{0}'")]
    DuplicateSink(String),

    /// The executor could not schedule or join work. Fatal.
    #[error("executor error: {0}")]
    Executor(String),

    /// An engine invariant was violated. Fatal.
    #[error("internal error: {0}")]
    Internal(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Open-ended task-body failure.
    #[error(transparent)]
    Task(#[from] anyhow::Error),
}

impl DumpError {
    pub fn usage(message: impl Into<String>) -> Self {
        DumpError::Usage(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        DumpError::Internal(message.into())
    }

    /// Whether this error must abort the whole run instead of being
    /// contained as a FAILED task result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DumpError::Usage(_)
                | DumpError::DuplicateSink(_)
                | DumpError::Executor(_)
                | DumpError::Internal(_)
        )
    }
}
