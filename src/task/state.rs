//! Run-wide ledger of task outcomes.
//!
//! The ledger is an insertion-ordered, mutex-guarded map from task name
//! to result, owned by the run and passed around inside the run context.
//! Insertion order makes the end-of-run report stable.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tracing::warn;

use super::{Task, TaskCategory, TaskValue};

/// Terminal and non-terminal states of a task within one run.
///
/// `NotStarted` is the only non-terminal value; it is also the implied
/// state of any task absent from the ledger, and the only state a
/// condition may not target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    NotStarted,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskState {
    /// All terminal states, in report order.
    pub const TERMINAL: [TaskState; 3] =
        [TaskState::Succeeded, TaskState::Failed, TaskState::Skipped];
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::NotStarted => "NOT_STARTED",
            TaskState::Succeeded => "SUCCEEDED",
            TaskState::Failed => "FAILED",
            TaskState::Skipped => "SKIPPED",
        };
        f.write_str(s)
    }
}

/// What a terminal state carries: a value, a failure cause, or a skip
/// reason.
#[derive(Debug, Clone)]
pub enum ResultDetail {
    None,
    Value(TaskValue),
    Error(String),
    Skipped(String),
}

/// Immutable (state, detail) pair recorded once per task per run.
#[derive(Debug, Clone)]
pub struct TaskResult {
    state: TaskState,
    detail: ResultDetail,
}

impl TaskResult {
    pub fn state(&self) -> TaskState {
        self.state
    }

    pub fn value(&self) -> Option<&TaskValue> {
        match &self.detail {
            ResultDetail::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.detail {
            ResultDetail::Error(cause) => Some(cause),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.detail {
            ResultDetail::Skipped(reason) => Some(reason),
            _ => None,
        }
    }

    /// Short human-readable detail for the report, if any.
    pub fn detail_text(&self) -> Option<String> {
        match &self.detail {
            ResultDetail::None => None,
            ResultDetail::Value(TaskValue::Unit) => None,
            ResultDetail::Value(TaskValue::Summary(summary)) => Some(summary.to_string()),
            ResultDetail::Value(TaskValue::Text(text)) => Some(text.clone()),
            ResultDetail::Error(cause) => Some(cause.clone()),
            ResultDetail::Skipped(reason) => Some(reason.clone()),
        }
    }
}

/// One line of the end-of-run report.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub name: String,
    pub category: TaskCategory,
    pub state: TaskState,
    pub detail: Option<String>,
}

struct LedgerRow {
    category: TaskCategory,
    result: TaskResult,
}

#[derive(Default)]
struct Inner {
    order: Vec<String>,
    rows: HashMap<String, LedgerRow>,
}

/// Thread-safe, insertion-ordered record of every task's outcome.
///
/// Safe for concurrent writers; each task is expected to be recorded
/// exactly once, and a repeat record wins (with a warning).
#[derive(Default)]
pub struct TaskSetState {
    inner: Mutex<Inner>,
}

impl TaskSetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the named task; a task absent from the ledger is
    /// NOT_STARTED by definition.
    pub fn state_of(&self, name: &str) -> TaskState {
        let inner = self.lock();
        inner
            .rows
            .get(name)
            .map(|row| row.result.state)
            .unwrap_or(TaskState::NotStarted)
    }

    /// Snapshot of the named task's result, if it has concluded.
    pub fn result_of(&self, name: &str) -> Option<TaskResult> {
        let inner = self.lock();
        inner.rows.get(name).map(|row| row.result.clone())
    }

    pub fn record_result(&self, task: &dyn Task, state: TaskState, value: Option<TaskValue>) {
        let detail = match value {
            Some(value) => ResultDetail::Value(value),
            None => ResultDetail::None,
        };
        self.insert(task, TaskResult { state, detail });
    }

    pub fn record_skip(&self, task: &dyn Task, reason: String) {
        self.insert(
            task,
            TaskResult {
                state: TaskState::Skipped,
                detail: ResultDetail::Skipped(reason),
            },
        );
    }

    pub fn record_error(&self, task: &dyn Task, state: TaskState, error: &crate::DumpError) {
        self.insert(
            task,
            TaskResult {
                state,
                detail: ResultDetail::Error(error_chain(error)),
            },
        );
    }

    /// Number of REQUIRED tasks whose terminal state is FAILED. The only
    /// aggregate that determines overall run failure.
    pub fn failed_required_count(&self) -> u64 {
        let inner = self.lock();
        inner
            .rows
            .values()
            .filter(|row| {
                row.category == TaskCategory::Required && row.result.state == TaskState::Failed
            })
            .count() as u64
    }

    /// Count of concluded tasks per terminal state, in report order.
    /// States with no tasks are omitted.
    pub fn state_counts(&self) -> Vec<(TaskState, u64)> {
        let inner = self.lock();
        TaskState::TERMINAL
            .iter()
            .filter_map(|state| {
                let count = inner
                    .rows
                    .values()
                    .filter(|row| row.result.state == *state)
                    .count() as u64;
                (count > 0).then_some((*state, count))
            })
            .collect()
    }

    /// Every recorded task in insertion order, for the final report.
    pub fn report_rows(&self) -> Vec<ReportRow> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|name| {
                inner.rows.get(name).map(|row| ReportRow {
                    name: name.clone(),
                    category: row.category,
                    state: row.result.state,
                    detail: row.result.detail_text(),
                })
            })
            .collect()
    }

    fn insert(&self, task: &dyn Task, result: TaskResult) {
        let mut inner = self.lock();
        let name = task.name().to_string();
        let row = LedgerRow {
            category: task.category(),
            result,
        };
        if inner.rows.insert(name.clone(), row).is_some() {
            warn!(task = %name, "task result recorded more than once; keeping the last");
        } else {
            inner.order.push(name);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Render an error with its source chain on one line.
fn error_chain(error: &crate::DumpError) -> String {
    use std::error::Error;
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !text.contains(&cause_text) {
            text.push_str(": ");
            text.push_str(&cause_text);
        }
        source = cause.source();
    }
    text
}
