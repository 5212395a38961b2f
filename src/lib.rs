//! metadump - extracts metadata from a source system into an archive of
//! named output slots.
//!
//! The engine is a small task orchestrator: connectors contribute an
//! ordered list of [`Task`]s, each task owns exactly one output slot,
//! conditions gate tasks on earlier outcomes, and the [`TaskSetState`]
//! ledger records every conclusion for the end-of-run report. Output
//! commit is idempotent, so an interrupted run can be resumed with
//! `--continue` and already-committed slots are skipped.

pub mod cli;
pub mod connector;
pub mod dumper;
pub mod error;
pub mod executor;
pub mod io;
pub mod runner;
pub mod task;

pub use cli::DumpArgs;
pub use dumper::{MetadataDumper, RunReport};
pub use error::DumpError;
pub use executor::Executor;
pub use runner::TasksRunner;
pub use task::{
    Condition, Summary, Task, TaskCategory, TaskRunContext, TaskSetState, TaskState, TaskValue,
};
