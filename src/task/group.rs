//! Composite tasks: sequential and parallel groups.
//!
//! A group is itself a task: it owns an ordered list of children and
//! writes a (child-name, terminal-state) report to its own output slot,
//! in the same record format as every row-producing task.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::task::JoinSet;
use tracing::info;

use crate::error::DumpError;
use crate::io::csv_writer;

use super::context::TaskRunContext;
use super::{RunOutcome, Task, TaskValue};

/// Sequential group. Children execute in strict declaration order, each
/// fully concluded before the next starts, so a member's condition may
/// safely reference any member that appears earlier in the list.
pub struct TaskGroup {
    target_path: String,
    tasks: Vec<Arc<dyn Task>>,
}

impl TaskGroup {
    pub fn new(target_path: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            tasks: Vec::new(),
        }
    }

    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        self.tasks.push(task);
    }

    pub fn with_task(mut self, task: Arc<dyn Task>) -> Self {
        self.add_task(task);
        self
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }
}

impl fmt::Display for TaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskGroup({}, {} children)", self.target_path, self.tasks.len())
    }
}

#[async_trait]
impl Task for TaskGroup {
    fn target_path(&self) -> &str {
        &self.target_path
    }

    fn children(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    fn is_container(&self) -> bool {
        true
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        let sink = context.sink_factory().create(self.target_path())?;
        if sink.exists() {
            info!(group = %self, "report already exists, skipping group");
            return Ok(RunOutcome::SkippedExisting);
        }
        let mut report = csv_writer(sink.temporary_writer()?);
        for task in &self.tasks {
            context.run_child_task(task).await?;
            let state = context.task_state(task.name());
            report.write_record([task.name(), &state.to_string()])?;
        }
        report.flush()?;
        drop(report);
        sink.commit()?;
        Ok(RunOutcome::Done(TaskValue::Unit))
    }
}

/// Parallel group. Children fan out to the bounded executor; the only
/// shared mutable state they touch is the group's report writer, behind
/// a mutex. All children conclude before `run` returns.
pub struct ParallelTaskGroup {
    target_path: String,
    tasks: Vec<Arc<dyn Task>>,
}

impl ParallelTaskGroup {
    pub fn new(name: &str) -> Self {
        Self {
            target_path: format!("parallel-task-{name}"),
            tasks: Vec::new(),
        }
    }

    /// Add a child task.
    ///
    /// # Panics
    ///
    /// Panics if the child carries conditions (ordering among
    /// concurrently-started children is undefined, so evaluating a
    /// condition against a sibling would be racy) or is not a
    /// parallel-safe leaf.
    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        assert!(
            task.conditions().is_empty(),
            "tasks in a parallel group must not have conditions: {task}"
        );
        assert!(
            task.parallel_safe(),
            "parallel groups only accept parallel-safe leaf tasks: {task}"
        );
        self.tasks.push(task);
    }

    pub fn with_task(mut self, task: Arc<dyn Task>) -> Self {
        self.add_task(task);
        self
    }

    pub fn tasks(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }
}

impl fmt::Display for ParallelTaskGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParallelTaskGroup({} children)", self.tasks.len())
    }
}

#[async_trait]
impl Task for ParallelTaskGroup {
    fn target_path(&self) -> &str {
        &self.target_path
    }

    fn children(&self) -> &[Arc<dyn Task>] {
        &self.tasks
    }

    fn is_container(&self) -> bool {
        true
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        let sink = context.sink_factory().create(self.target_path())?;
        if sink.exists() {
            info!(group = %self, "report already exists, skipping group");
            return Ok(RunOutcome::SkippedExisting);
        }
        let report = Arc::new(Mutex::new(csv_writer(sink.temporary_writer()?)));

        let mut workers = JoinSet::new();
        for task in &self.tasks {
            // Submission blocks here under backpressure; it never fails
            // or drops work.
            let permit = context.executor().acquire().await?;
            let context = context.clone();
            let task = Arc::clone(task);
            let report = Arc::clone(&report);
            workers.spawn(async move {
                let _permit = permit;
                // Nothrow: a failing child is recorded, not propagated.
                let outcome = context.run_child_task(&task).await.map(|_| ());
                let state = context.task_state(task.name());
                let mut report = report
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                report.write_record([task.name(), &state.to_string()])?;
                outcome
            });
        }

        // Block until every submitted child has concluded. Dropping the
        // JoinSet on an early (fatal) exit aborts still-pending workers,
        // so no child execution outlives this call.
        while let Some(joined) = workers.join_next().await {
            joined.map_err(|join_error| {
                DumpError::Executor(format!("parallel worker did not complete: {join_error}"))
            })??;
        }

        let report = Arc::try_unwrap(report)
            .map_err(|_| DumpError::internal("report writer still shared after join"))?
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut inner = report
            .into_inner()
            .map_err(|e| DumpError::internal(format!("report writer flush failed: {e}")))?;
        inner.flush()?;
        drop(inner);
        sink.commit()?;
        Ok(RunOutcome::Done(TaskValue::Unit))
    }
}
