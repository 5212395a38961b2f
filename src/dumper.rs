//! The end-to-end dump driver.
//!
//! Resolves the connector, prepares the output directory, builds the
//! task list, runs it, and renders the final report. The exit status
//! policy lives in `main`: a run "succeeds" as long as no REQUIRED task
//! failed, regardless of how many optional extractions went wrong.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;
use tracing::{info, warn};

use crate::cli::DumpArgs;
use crate::connector::common::{ArgumentsTask, VersionTask};
use crate::connector::{connector_for, connector_names, Connector};
use crate::error::DumpError;
use crate::io::archive::package_directory;
use crate::io::fs::FsOutputHandleFactory;
use crate::runner::TasksRunner;
use crate::task::{ReportRow, Task, TaskSetState, TaskState};

/// Outcome of a completed (non-dry) run, ready for rendering.
#[derive(Debug)]
pub struct RunReport {
    pub rows: Vec<ReportRow>,
    pub state_counts: Vec<(TaskState, u64)>,
    pub failed_required: u64,
    pub output: PathBuf,
}

impl RunReport {
    pub fn print(&self) {
        println!();
        println!("{}", "Task report".bold());
        for row in &self.rows {
            let state = match row.state {
                TaskState::Succeeded => row.state.to_string().green(),
                TaskState::Failed => row.state.to_string().red(),
                TaskState::Skipped => row.state.to_string().yellow(),
                TaskState::NotStarted => row.state.to_string().normal(),
            };
            match &row.detail {
                Some(detail) => {
                    println!("  {} [{}] {}: {}", state, row.category, row.name, detail)
                }
                None => println!("  {} [{}] {}", state, row.category, row.name),
            }
        }
        println!();
        let counts = self
            .state_counts
            .iter()
            .map(|(state, count)| format!("{count} {state}"))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Tasks: {counts}");
        if self.failed_required > 0 {
            println!(
                "{}",
                format!("{} required task(s) failed.", self.failed_required).red()
            );
        } else {
            println!("{}", format!("Output is in {}", self.output.display()).green());
        }
    }
}

/// Top-level driver. One instance per process invocation.
pub struct MetadataDumper;

impl MetadataDumper {
    /// Run a dump. Returns `None` for a dry run, `Some(report)` for a
    /// completed run. Fatal errors abort with `Err`.
    pub async fn run(&self, args: &DumpArgs) -> Result<Option<RunReport>, DumpError> {
        let connector = connector_for(&args.connector).ok_or_else(|| {
            DumpError::usage(format!(
                "unknown connector '{}'; available: {}",
                args.connector,
                connector_names().join(", ")
            ))
        })?;
        info!(
            connector = connector.name(),
            description = connector.description(),
            "selected connector"
        );

        let mut tasks: Vec<Arc<dyn Task>> = vec![Arc::new(VersionTask), Arc::new(ArgumentsTask::new(args.clone()))];
        connector.add_tasks(&mut tasks, args)?;

        if args.dry_run {
            println!("Tasks for connector '{}':", connector.name());
            print_task_tree(&tasks, 1);
            return Ok(None);
        }

        // The handle opens first: a failed open must not leave a
        // freshly created output directory behind.
        let handle = Arc::new(connector.open(args)?);
        let output = self.prepare_output_directory(connector.as_ref(), args)?;
        let sink_factory = Arc::new(FsOutputHandleFactory::new(&output));
        let state = Arc::new(TaskSetState::new());

        let runner = TasksRunner::new(
            sink_factory,
            handle.clone(),
            args.threads,
            state.clone(),
            tasks,
        );
        runner.run().await?;
        runner.context().executor().shutdown();
        drop(runner);
        // The handle must close before packaging reads the directory.
        drop(handle);

        if args.zip {
            let mut archive = output.clone().into_os_string();
            archive.push(".zip");
            package_directory(&output, archive.as_ref())?;
        }

        Ok(Some(RunReport {
            rows: state.report_rows(),
            state_counts: state.state_counts(),
            failed_required: state.failed_required_count(),
            output,
        }))
    }

    /// Resolve and prepare the output directory.
    ///
    /// A fresh run requires an empty (or absent) directory; `--continue`
    /// accepts prior content so already-committed slots are skipped.
    fn prepare_output_directory(
        &self,
        connector: &dyn Connector,
        args: &DumpArgs,
    ) -> Result<PathBuf, DumpError> {
        let output = args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(connector.default_file_name()));
        if output.exists() {
            if !output.is_dir() {
                return Err(DumpError::usage(format!(
                    "output path exists and is not a directory: {}",
                    output.display()
                )));
            }
            let occupied = fs::read_dir(&output)?.next().is_some();
            if occupied && !args.resume {
                return Err(DumpError::usage(format!(
                    "output directory {} is not empty; pass --continue to resume into it",
                    output.display()
                )));
            }
            if occupied {
                warn!(output = %output.display(), "resuming into existing output directory");
            }
        } else {
            fs::create_dir_all(&output)?;
        }
        info!(output = %output.display(), "writing dump");
        Ok(output)
    }
}

fn print_task_tree(tasks: &[Arc<dyn Task>], depth: usize) {
    for task in tasks {
        println!(
            "{}[{}] {} -> {}",
            "  ".repeat(depth),
            task.category(),
            task.name(),
            task.target_path()
        );
        print_task_tree(task.children(), depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args_for(output: PathBuf, resume: bool) -> DumpArgs {
        DumpArgs {
            connector: "fs".into(),
            output: Some(output),
            resume,
            dry_run: false,
            threads: 2,
            zip: false,
            database: None,
            path: None,
        }
    }

    #[test]
    fn fresh_run_refuses_occupied_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("leftover.csv"), "x").unwrap();
        let args = args_for(dir.path().to_path_buf(), false);
        let err = MetadataDumper
            .prepare_output_directory(&crate::connector::FsMetadataConnector, &args)
            .unwrap_err();
        assert!(matches!(err, DumpError::Usage(_)));
    }

    #[test]
    fn resume_accepts_occupied_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("leftover.csv"), "x").unwrap();
        let args = args_for(dir.path().to_path_buf(), true);
        let output = MetadataDumper
            .prepare_output_directory(&crate::connector::FsMetadataConnector, &args)
            .unwrap();
        assert_eq!(output, dir.path());
    }

    #[tokio::test]
    async fn failed_connector_open_leaves_no_output_directory() {
        let dir = TempDir::new().unwrap();
        let dump = dir.path().join("dump");
        let args = DumpArgs {
            connector: "sqlite".into(),
            output: Some(dump.clone()),
            resume: false,
            dry_run: false,
            threads: 2,
            zip: false,
            database: None,
            path: None,
        };
        let err = MetadataDumper.run(&args).await.unwrap_err();
        assert!(matches!(err, DumpError::Usage(_)));
        assert!(!dump.exists());
    }

    #[test]
    fn missing_output_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/dump");
        let args = args_for(target.clone(), false);
        let output = MetadataDumper
            .prepare_output_directory(&crate::connector::FsMetadataConnector, &args)
            .unwrap();
        assert!(output.is_dir());
        assert_eq!(output, target);
    }
}
