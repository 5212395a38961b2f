//! Top-level task runner: drives the ordered task list and logs
//! progress.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::connector::Handle;
use crate::error::DumpError;
use crate::executor::Executor;
use crate::io::OutputHandleFactory;
use crate::task::{count_leaf_tasks, Task, TaskRunContext, TaskSetState};

/// Leaf-task completion tracker. Emits percent complete and, once
/// enough samples exist, an estimated time to completion.
pub(crate) struct Progress {
    total: usize,
    completed: AtomicUsize,
    started: Instant,
}

impl Progress {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            completed: AtomicUsize::new(0),
            started: Instant::now(),
        }
    }

    pub(crate) fn task_done(&self) {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if self.total == 0 {
            return;
        }
        let percent = completed * 100 / self.total;
        let remaining = self.total.saturating_sub(completed);
        // ETA is only meaningful once the average has settled.
        if completed > 10 && remaining > 0 {
            let average = self.started.elapsed() / completed as u32;
            let eta = average * remaining as u32;
            info!(
                target: "progress",
                "{percent}% completed, estimated {}s remaining",
                eta.as_secs()
            );
        } else {
            info!(target: "progress", "{percent}% completed");
        }
    }
}

/// Runs an ordered list of top-level tasks against a shared ledger.
///
/// Each task goes through the child-task runner, so failures are
/// contained per task; only fatal errors abort the loop.
pub struct TasksRunner {
    context: TaskRunContext,
    tasks: Vec<Arc<dyn Task>>,
}

impl TasksRunner {
    pub fn new(
        sink_factory: Arc<dyn OutputHandleFactory>,
        handle: Arc<Handle>,
        threads: usize,
        state: Arc<TaskSetState>,
        tasks: Vec<Arc<dyn Task>>,
    ) -> Self {
        let total = count_leaf_tasks(&tasks);
        let executor = Arc::new(Executor::new(threads));
        info!(tasks = total, workers = executor.workers(), "starting run");
        let context = TaskRunContext::new(sink_factory, handle, executor, state, total);
        Self { context, tasks }
    }

    pub fn context(&self) -> &TaskRunContext {
        &self.context
    }

    pub async fn run(&self) -> Result<(), DumpError> {
        for task in &self.tasks {
            self.context.run_child_task(task).await?;
        }
        Ok(())
    }
}
