//! Marker tasks shared by every connector: version stamp, arguments
//! snapshot, and conditional messages.

use std::fmt;

use async_trait::async_trait;

use crate::cli::DumpArgs;
use crate::error::DumpError;
use crate::task::{
    run_with_sink, Condition, RunOutcome, Task, TaskCategory, TaskRunContext, TaskValue,
};

/// Writes the dumper's own name and version into the archive.
pub struct VersionTask;

pub const VERSION_TARGET: &str = "dumper-version.txt";

impl fmt::Display for VersionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VersionTask")
    }
}

#[async_trait]
impl Task for VersionTask {
    fn target_path(&self) -> &str {
        VERSION_TARGET
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Informational
    }

    fn parallel_safe(&self) -> bool {
        true
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        run_with_sink(self, context, |writer, _handle| {
            let version = format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
            writeln!(writer, "{version}")?;
            Ok(TaskValue::Text(version))
        })
        .await
    }
}

/// Snapshots the parsed command line as JSON, making the dump
/// self-describing.
pub struct ArgumentsTask {
    args: DumpArgs,
}

impl ArgumentsTask {
    pub fn new(args: DumpArgs) -> Self {
        Self { args }
    }
}

impl fmt::Display for ArgumentsTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ArgumentsTask")
    }
}

#[async_trait]
impl Task for ArgumentsTask {
    fn target_path(&self) -> &str {
        "arguments.json"
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Informational
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        run_with_sink(self, context, |writer, _handle| {
            serde_json::to_writer_pretty(&mut *writer, &self.args)?;
            writeln!(writer)?;
            Ok(TaskValue::Unit)
        })
        .await
    }
}

/// Writes a fixed message into the archive, usually gated by
/// conditions. Connectors use it to surface one consolidated
/// explanation when a whole set of alternative extractions failed.
pub struct MessageTask {
    target_path: String,
    message: String,
    category: TaskCategory,
    conditions: Vec<Condition>,
}

impl MessageTask {
    pub fn new(target_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            message: message.into(),
            category: TaskCategory::Optional,
            conditions: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

impl fmt::Display for MessageTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageTask({})", self.target_path)
    }
}

#[async_trait]
impl Task for MessageTask {
    fn target_path(&self) -> &str {
        &self.target_path
    }

    fn category(&self) -> TaskCategory {
        self.category
    }

    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    fn parallel_safe(&self) -> bool {
        self.conditions.is_empty()
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        run_with_sink(self, context, |writer, _handle| {
            writeln!(writer, "{}", self.message)?;
            Ok(TaskValue::Text(self.message.clone()))
        })
        .await
    }
}
