//! The task contract and its execution template.
//!
//! A task is an immutable description of one unit of work: a target
//! output slot, a category deciding whether its failure is fatal to the
//! run, zero or more conditions gating execution, and a body. Tasks
//! compose: a [`TaskGroup`] owns an ordered list of children and is
//! itself a task; a [`ParallelTaskGroup`] fans its children out to the
//! bounded executor.

use std::fmt;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::connector::Handle;
use crate::error::DumpError;

pub mod condition;
pub mod context;
pub mod group;
pub mod state;
pub mod summary;

pub use condition::Condition;
pub use context::TaskRunContext;
pub use group::{ParallelTaskGroup, TaskGroup};
pub use state::{ReportRow, TaskResult, TaskSetState, TaskState};
pub use summary::{Interval, Summary};

/// Governs whether a task's failure is fatal to the overall run.
///
/// Only REQUIRED failures flip the exit status; OPTIONAL and
/// INFORMATIONAL failures are visible in the report but never fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskCategory {
    #[default]
    Required,
    Optional,
    Informational,
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskCategory::Required => "REQUIRED",
            TaskCategory::Optional => "OPTIONAL",
            TaskCategory::Informational => "INFORMATIONAL",
        };
        f.write_str(s)
    }
}

/// The value a successful task produces.
#[derive(Debug, Clone)]
pub enum TaskValue {
    Unit,
    Summary(Summary),
    Text(String),
}

/// How a task's `run` concluded (without failing).
#[derive(Debug)]
pub enum RunOutcome {
    /// The body ran and produced a value; the ledger records SUCCEEDED.
    Done(TaskValue),
    /// The output slot was already committed by a prior run; the body
    /// was never invoked and the ledger records SKIPPED.
    SkippedExisting,
}

/// A named, categorized unit of work producing a value or failing,
/// optionally gated by conditions.
#[async_trait]
pub trait Task: Send + Sync + fmt::Display {
    /// Display name; defaults to the target path.
    fn name(&self) -> &str {
        self.target_path()
    }

    /// Slot name/key of this task's output in the archive.
    fn target_path(&self) -> &str;

    fn category(&self) -> TaskCategory {
        TaskCategory::Required
    }

    /// Predicates gating execution, evaluated as a logical AND.
    fn conditions(&self) -> &[Condition] {
        &[]
    }

    /// Whether this task is a side-effect-isolated leaf eligible for
    /// membership in a [`ParallelTaskGroup`].
    fn parallel_safe(&self) -> bool {
        false
    }

    /// Child tasks, for groups. Leaves return an empty slice.
    fn children(&self) -> &[Arc<dyn Task>] {
        &[]
    }

    /// Whether this task is a group container. Containers contribute
    /// their children (possibly none) to leaf counts and progress,
    /// never themselves.
    fn is_container(&self) -> bool {
        false
    }

    /// Execute the task body. Called through
    /// [`TaskRunContext::run_child_task`], which owns condition
    /// evaluation and the nothrow failure boundary.
    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError>;
}

/// Number of leaf tasks in a task tree, counting through groups.
/// An empty group contributes nothing.
pub fn count_leaf_tasks(tasks: &[Arc<dyn Task>]) -> usize {
    tasks
        .iter()
        .map(|task| {
            if task.is_container() {
                count_leaf_tasks(task.children())
            } else {
                1
            }
        })
        .sum()
}

/// The idempotent output-commit template shared by every task that
/// writes a slot.
///
/// Opens the sink for the task's target path; if the slot is already
/// committed the body is never invoked and the task is reported as
/// skipped. Otherwise the body writes to a temporary location which is
/// committed (atomically published) only on success. Errors from the
/// body propagate to the caller; containment happens at the
/// child-runner boundary, not here.
pub async fn run_with_sink<F>(
    task: &dyn Task,
    context: &TaskRunContext,
    body: F,
) -> Result<RunOutcome, DumpError>
where
    F: FnOnce(&mut (dyn Write + Send), &Handle) -> Result<TaskValue, DumpError> + Send,
{
    let sink = context.sink_factory().create(task.target_path())?;
    if sink.exists() {
        info!(
            task = task.name(),
            target = task.target_path(),
            "output already exists, skipping"
        );
        return Ok(RunOutcome::SkippedExisting);
    }
    let mut writer = sink.temporary_writer()?;
    let value = body(writer.as_mut(), context.handle())?;
    writer.flush()?;
    drop(writer);
    sink.commit()?;
    Ok(RunOutcome::Done(value))
}


#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Minimal leaf task for ledger and condition tests. Never runs.
    pub struct StubTask {
        target_path: String,
        category: TaskCategory,
    }

    impl StubTask {
        pub fn new(target_path: impl Into<String>) -> Self {
            Self {
                target_path: target_path.into(),
                category: TaskCategory::Required,
            }
        }

        pub fn with_category(mut self, category: TaskCategory) -> Self {
            self.category = category;
            self
        }
    }

    impl fmt::Display for StubTask {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "StubTask({})", self.target_path)
        }
    }

    #[async_trait]
    impl Task for StubTask {
        fn target_path(&self) -> &str {
            &self.target_path
        }

        fn category(&self) -> TaskCategory {
            self.category
        }

        async fn run(&self, _context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
            Ok(RunOutcome::Done(TaskValue::Unit))
        }
    }
}
