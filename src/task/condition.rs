//! Conditions - predicates over prior task outcomes.
//!
//! A condition gates whether a task runs at all. Conditions are decided
//! against the ledger at the moment the task is about to run; they only
//! reference terminal states of tasks that appear earlier in the run.

use std::fmt;
use std::sync::Arc;

use super::state::{TaskSetState, TaskState};
use super::Task;

/// Predicate over the run's state ledger.
///
/// Two variants cover everything the engine needs: a check that a named
/// task concluded in a given state, and a logical AND over a list.
#[derive(Debug, Clone)]
pub enum Condition {
    /// True iff the named task's terminal state equals `expected`.
    TaskState { task: String, expected: TaskState },
    /// True iff every child condition is true. Short-circuits.
    All(Vec<Condition>),
}

impl Condition {
    /// Condition on the terminal state of a named task.
    ///
    /// # Panics
    ///
    /// Panics if `expected` is `NotStarted`: a condition must reference
    /// something that has already concluded.
    pub fn state(task: impl Into<String>, expected: TaskState) -> Condition {
        assert!(
            expected != TaskState::NotStarted,
            "cannot accept NOT_STARTED as a precondition"
        );
        Condition::TaskState {
            task: task.into(),
            expected,
        }
    }

    /// Run only if the given task failed. The fallback-query pattern.
    pub fn failed(task: &dyn Task) -> Condition {
        Condition::state(task.name(), TaskState::Failed)
    }

    /// Run only if every one of the given tasks failed. The
    /// diagnostic-aggregation pattern: one consolidated message instead
    /// of N redundant ones.
    pub fn all_failed<'a>(tasks: impl IntoIterator<Item = &'a Arc<dyn Task>>) -> Condition {
        Condition::All(
            tasks
                .into_iter()
                .map(|task| Condition::state(task.name(), TaskState::Failed))
                .collect(),
        )
    }

    pub fn evaluate(&self, state: &TaskSetState) -> bool {
        match self {
            Condition::TaskState { task, expected } => state.state_of(task) == *expected,
            Condition::All(conditions) => {
                conditions.iter().all(|condition| condition.evaluate(state))
            }
        }
    }

    /// Human-readable explanation recorded when the condition skips a
    /// task.
    pub fn skip_reason(&self) -> String {
        match self {
            Condition::TaskState { task, expected } => {
                format!("state of {task} was not {expected}")
            }
            Condition::All(conditions) => {
                let reasons: Vec<String> = conditions
                    .iter()
                    .map(|condition| condition.skip_reason())
                    .collect();
                format!("all of [{}]", reasons.join(", "))
            }
        }
    }
}

// Conditions only surface to users when they explain a skip.
impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.skip_reason())
    }
}
