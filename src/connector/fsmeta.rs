//! Filesystem metadata connector.
//!
//! Crawls a directory tree and dumps per-entry metadata plus an
//! aggregate per-extension summary. The crawl itself is a thin consumer
//! of the engine: each task is an ordinary sink-writing leaf.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::cli::DumpArgs;
use crate::error::DumpError;
use crate::io::csv_writer;
use crate::task::{
    run_with_sink, Interval, RunOutcome, Summary, Task, TaskCategory, TaskRunContext, TaskValue,
};

use super::{Connector, Handle};

/// Dumps one row per directory entry: path, kind, size, mtime.
///
/// The returned Summary's interval covers the observed modification
/// times, so sibling crawls merge into one covered span.
pub struct FileMetadataTask;

impl fmt::Display for FileMetadataTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FileMetadataTask")
    }
}

#[async_trait]
impl Task for FileMetadataTask {
    fn target_path(&self) -> &str {
        "files.csv"
    }

    fn parallel_safe(&self) -> bool {
        true
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        run_with_sink(self, context, |writer, handle| {
            let root = handle.directory()?;
            let mut out = csv_writer(writer);
            out.write_record(["path", "kind", "size", "modified"])?;
            let mut count = 0u64;
            let mut earliest: Option<DateTime<Utc>> = None;
            let mut latest: Option<DateTime<Utc>> = None;
            for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
                let entry = entry.map_err(anyhow::Error::from)?;
                let relative = entry
                    .path()
                    .strip_prefix(root)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .into_owned();
                let kind = if entry.file_type().is_dir() {
                    "dir"
                } else if entry.file_type().is_symlink() {
                    "symlink"
                } else {
                    "file"
                };
                let metadata = entry.metadata().map_err(anyhow::Error::from)?;
                let modified: Option<DateTime<Utc>> =
                    metadata.modified().ok().map(DateTime::from);
                if let Some(modified) = modified {
                    earliest = Some(earliest.map_or(modified, |e| e.min(modified)));
                    latest = Some(latest.map_or(modified, |l| l.max(modified)));
                }
                out.write_record([
                    relative.as_str(),
                    kind,
                    &metadata.len().to_string(),
                    &modified.map(|m| m.to_rfc3339()).unwrap_or_default(),
                ])?;
                count += 1;
            }
            out.flush()?;
            let mut summary = Summary::new(count);
            if let (Some(start), Some(end)) = (earliest, latest) {
                summary = summary.with_interval(Interval::new(start, end));
            }
            Ok(TaskValue::Summary(summary))
        })
        .await
    }
}

/// Aggregates file counts and byte totals per extension.
pub struct ExtensionSummaryTask;

impl fmt::Display for ExtensionSummaryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ExtensionSummaryTask")
    }
}

#[async_trait]
impl Task for ExtensionSummaryTask {
    fn target_path(&self) -> &str {
        "extension-summary.csv"
    }

    fn category(&self) -> TaskCategory {
        TaskCategory::Optional
    }

    fn parallel_safe(&self) -> bool {
        true
    }

    async fn run(&self, context: &TaskRunContext) -> Result<RunOutcome, DumpError> {
        run_with_sink(self, context, |writer, handle| {
            let root = handle.directory()?;
            let mut by_extension: BTreeMap<String, (u64, u64)> = BTreeMap::new();
            for entry in WalkDir::new(root).min_depth(1) {
                let entry = entry.map_err(anyhow::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let extension = entry
                    .path()
                    .extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "<none>".to_string());
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                let slot = by_extension.entry(extension).or_insert((0, 0));
                slot.0 += 1;
                slot.1 += size;
            }
            let mut out = csv_writer(writer);
            out.write_record(["extension", "files", "bytes"])?;
            let mut count = 0u64;
            for (extension, (files, bytes)) in &by_extension {
                out.write_record([
                    extension.as_str(),
                    &files.to_string(),
                    &bytes.to_string(),
                ])?;
                count += 1;
            }
            out.flush()?;
            Ok(TaskValue::Summary(Summary::new(count)))
        })
        .await
    }
}

/// `--connector fs --path <dir>`
pub struct FsMetadataConnector;

impl Connector for FsMetadataConnector {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn description(&self) -> &'static str {
        "filesystem metadata crawl"
    }

    fn open(&self, args: &DumpArgs) -> Result<Handle, DumpError> {
        let path = args
            .path
            .as_ref()
            .ok_or_else(|| DumpError::usage("the fs connector requires --path"))?;
        if !path.is_dir() {
            return Err(DumpError::usage(format!(
                "not a directory: {}",
                path.display()
            )));
        }
        Ok(Handle::Directory(path.clone()))
    }

    fn add_tasks(&self, tasks: &mut Vec<Arc<dyn Task>>, _args: &DumpArgs) -> Result<(), DumpError> {
        tasks.push(Arc::new(FileMetadataTask));
        tasks.push(Arc::new(ExtensionSummaryTask));
        Ok(())
    }
}
