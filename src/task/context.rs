//! The per-run context and the nothrow child-task runner.
//!
//! `TaskRunContext` bundles everything a task may touch: the output
//! sink factory, the opened remote-system handle, the bounded executor,
//! and the run's state ledger. `run_child_task` is the single entry
//! point through which every task (top-level or group child) executes;
//! it owns condition evaluation and converts task-body failures into
//! FAILED ledger entries instead of letting them unwind.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::connector::Handle;
use crate::error::DumpError;
use crate::executor::Executor;
use crate::io::OutputHandleFactory;
use crate::runner::Progress;

use super::state::{TaskSetState, TaskState};
use super::{RunOutcome, Task, TaskValue};

/// Per-run handle bundling the collaborators every task needs.
/// Cheap to clone; parallel groups clone it into each worker.
#[derive(Clone)]
pub struct TaskRunContext {
    sink_factory: Arc<dyn OutputHandleFactory>,
    handle: Arc<Handle>,
    executor: Arc<Executor>,
    state: Arc<TaskSetState>,
    progress: Arc<Progress>,
}

impl TaskRunContext {
    pub fn new(
        sink_factory: Arc<dyn OutputHandleFactory>,
        handle: Arc<Handle>,
        executor: Arc<Executor>,
        state: Arc<TaskSetState>,
        total_tasks: usize,
    ) -> Self {
        Self {
            sink_factory,
            handle,
            executor,
            state,
            progress: Arc::new(Progress::new(total_tasks)),
        }
    }

    pub fn sink_factory(&self) -> &dyn OutputHandleFactory {
        self.sink_factory.as_ref()
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn state(&self) -> &TaskSetState {
        &self.state
    }

    /// Current ledger state of the named task.
    pub fn task_state(&self, name: &str) -> TaskState {
        self.state.state_of(name)
    }

    /// Run one task through the full protocol: condition evaluation,
    /// body execution, outcome recording.
    ///
    /// This call never fails for task-body errors - they are recorded
    /// as FAILED and contained here, so one failing concurrent child
    /// cannot abort its siblings. Only fatal errors (usage, executor
    /// breakdown) propagate.
    pub async fn run_child_task(
        &self,
        task: &Arc<dyn Task>,
    ) -> Result<Option<TaskValue>, DumpError> {
        let previous = self.state.state_of(task.name());
        if previous != TaskState::NotStarted {
            warn!(task = task.name(), state = %previous, "task already ran; running again");
        }

        for condition in task.conditions() {
            if !condition.evaluate(&self.state) {
                let reason = condition.skip_reason();
                debug!(task = task.name(), %reason, "skipping task");
                self.state.record_skip(task.as_ref(), reason);
                self.finish_leaf(task);
                return Ok(None);
            }
        }

        match task.run(self).await {
            Ok(RunOutcome::Done(value)) => {
                self.state
                    .record_result(task.as_ref(), TaskState::Succeeded, Some(value.clone()));
                self.finish_leaf(task);
                Ok(Some(value))
            }
            Ok(RunOutcome::SkippedExisting) => {
                self.state.record_skip(
                    task.as_ref(),
                    format!("output {} already exists", task.target_path()),
                );
                self.finish_leaf(task);
                Ok(None)
            }
            Err(error) if error.is_fatal() => Err(error),
            Err(error) => {
                warn!(task = %task, error = %error, "task failed");
                self.state
                    .record_error(task.as_ref(), TaskState::Failed, &error);
                self.write_exception_sidecar(task.as_ref(), &error);
                self.finish_leaf(task);
                Ok(None)
            }
        }
    }

    /// Best-effort record of the failure cause next to the task's slot,
    /// so the archive itself documents what went wrong.
    fn write_exception_sidecar(&self, task: &dyn Task, error: &DumpError) {
        let target = format!("{}.exception.txt", task.target_path());
        let attempt = (|| -> Result<(), DumpError> {
            let sink = self.sink_factory.create(&target)?;
            if sink.exists() {
                return Ok(());
            }
            let mut writer = sink.temporary_writer()?;
            writeln!(writer, "{task}")?;
            writeln!(writer, "******************************")?;
            writeln!(writer, "{error}")?;
            let mut source = std::error::Error::source(error);
            while let Some(cause) = source {
                writeln!(writer, "caused by: {cause}")?;
                source = cause.source();
            }
            writer.flush()?;
            drop(writer);
            sink.commit()
        })();
        if let Err(sidecar_error) = attempt {
            warn!(task = task.name(), error = %sidecar_error, "exception recorder failed");
        }
    }

    fn finish_leaf(&self, task: &Arc<dyn Task>) {
        if !task.is_container() {
            self.progress.task_done();
        }
    }
}
