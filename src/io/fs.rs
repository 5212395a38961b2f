//! Filesystem-backed output sinks.
//!
//! Each slot is written to `<target>.tmp` inside the output directory
//! and renamed into place on commit; the rename is the atomic publish
//! step. `exists()` checks the final path only, so an interrupted run
//! leaves a `.tmp` behind and the slot is redone on resume.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{OutputHandle, OutputHandleFactory};
use crate::error::DumpError;

/// Factory of file sinks rooted at the run's output directory.
pub struct FsOutputHandleFactory {
    root: PathBuf,
    opened: Mutex<HashSet<String>>,
}

impl FsOutputHandleFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            opened: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl OutputHandleFactory for FsOutputHandleFactory {
    fn create(&self, target_path: &str) -> Result<Box<dyn OutputHandle>, DumpError> {
        if target_path.is_empty() || Path::new(target_path).is_absolute() {
            return Err(DumpError::internal(format!(
                "invalid sink target path '{target_path}'"
            )));
        }
        {
            let mut opened = self
                .opened
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if !opened.insert(target_path.to_string()) {
                return Err(DumpError::DuplicateSink(target_path.to_string()));
            }
        }
        let final_path = self.root.join(target_path);
        let mut temp_name = final_path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = final_path.with_file_name(temp_name);
        debug!(target = target_path, "opened output sink");
        Ok(Box::new(FsOutputHandle {
            target_path: target_path.to_string(),
            final_path,
            temp_path,
        }))
    }
}

#[derive(Debug)]
struct FsOutputHandle {
    target_path: String,
    final_path: PathBuf,
    temp_path: PathBuf,
}

impl OutputHandle for FsOutputHandle {
    fn target_path(&self) -> &str {
        &self.target_path
    }

    fn exists(&self) -> bool {
        self.final_path.exists()
    }

    fn temporary_writer(&self) -> Result<Box<dyn Write + Send>, DumpError> {
        if let Some(parent) = self.temp_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.temp_path)?;
        Ok(Box::new(BufWriter::new(file)))
    }

    fn commit(&self) -> Result<(), DumpError> {
        fs::rename(&self.temp_path, &self.final_path)?;
        debug!(target = %self.target_path, "committed output sink");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn commit_publishes_atomically() {
        let dir = TempDir::new().unwrap();
        let factory = FsOutputHandleFactory::new(dir.path());
        let sink = factory.create("schema.csv").unwrap();
        assert!(!sink.exists());

        let mut writer = sink.temporary_writer().unwrap();
        writer.write_all(b"a,b\n").unwrap();
        writer.flush().unwrap();
        drop(writer);

        // Not visible before commit.
        assert!(!dir.path().join("schema.csv").exists());
        assert!(dir.path().join("schema.csv.tmp").exists());

        sink.commit().unwrap();
        assert!(sink.exists());
        assert!(!dir.path().join("schema.csv.tmp").exists());
        assert_eq!(fs::read_to_string(dir.path().join("schema.csv")).unwrap(), "a,b\n");
    }

    #[test]
    fn repeat_open_of_same_target_is_fatal() {
        let dir = TempDir::new().unwrap();
        let factory = FsOutputHandleFactory::new(dir.path());
        factory.create("schema.csv").unwrap();
        let err = factory.create("schema.csv").unwrap_err();
        assert!(matches!(err, DumpError::DuplicateSink(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn nested_target_paths_create_parent_directories() {
        let dir = TempDir::new().unwrap();
        let factory = FsOutputHandleFactory::new(dir.path());
        let sink = factory.create("hdfs/permissions.csv").unwrap();
        let mut writer = sink.temporary_writer().unwrap();
        writer.write_all(b"x\n").unwrap();
        drop(writer);
        sink.commit().unwrap();
        assert!(dir.path().join("hdfs/permissions.csv").exists());
    }

    #[test]
    fn absolute_target_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let factory = FsOutputHandleFactory::new(dir.path());
        assert!(factory.create("/etc/passwd").is_err());
    }
}
