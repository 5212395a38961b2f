//! Black-box tests of the metadump binary.

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn metadump() -> Command {
    Command::cargo_bin("metadump").unwrap()
}

#[test]
fn fs_connector_dumps_a_directory() {
    let source = TempDir::new().unwrap();
    fs::write(source.path().join("a.txt"), "hello").unwrap();
    fs::create_dir(source.path().join("sub")).unwrap();
    fs::write(source.path().join("sub/b.rs"), "fn main() {}").unwrap();
    let output = TempDir::new().unwrap();
    let dump = output.path().join("dump");

    metadump()
        .args(["--connector", "fs"])
        .arg("--path")
        .arg(source.path())
        .arg("--output")
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("SUCCEEDED"));

    let files = fs::read_to_string(dump.join("files.csv")).unwrap();
    assert!(files.starts_with("path,kind,size,modified\n"));
    assert!(files.contains("a.txt,file,5,"));
    assert!(files.contains("sub,dir,"));

    let extensions = fs::read_to_string(dump.join("extension-summary.csv")).unwrap();
    assert!(extensions.contains("rs,1,"));
    assert!(extensions.contains("txt,1,"));
}

#[test]
fn dry_run_lists_tasks_without_writing_anything() {
    let source = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let dump = output.path().join("dump");

    metadump()
        .args(["--connector", "fs", "--dry-run"])
        .arg("--path")
        .arg(source.path())
        .arg("--output")
        .arg(&dump)
        .assert()
        .success()
        .stdout(
            predicate::str::contains("files.csv")
                .and(predicate::str::contains("dumper-version.txt")),
        );

    assert!(!dump.exists());
}

#[test]
fn required_task_failure_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    // SQLite opens lazily, so a corrupt file gets past open and fails
    // the required schema query instead.
    let database = dir.path().join("corrupt.db");
    fs::write(&database, "this is not a sqlite database").unwrap();
    let dump = dir.path().join("dump");

    metadump()
        .args(["--connector", "sqlite"])
        .arg("--database")
        .arg(&database)
        .arg("--output")
        .arg(&dump)
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("FAILED [REQUIRED] schema.csv")
                .and(predicate::str::contains("required task(s) failed")),
        );

    // The run still completed and documented the failure next to the
    // slot.
    assert!(dump.join("schema.csv.exception.txt").exists());
    assert!(!dump.join("schema.csv").exists());
}

#[test]
fn unknown_connector_names_the_alternatives() {
    metadump()
        .args(["--connector", "oracle"])
        .assert()
        .code(2)
        .stderr(
            predicate::str::contains("unknown connector 'oracle'")
                .and(predicate::str::contains("sqlite"))
                .and(predicate::str::contains("fs")),
        );
}

#[test]
fn occupied_output_without_continue_is_a_usage_error() {
    let source = TempDir::new().unwrap();
    let dump = TempDir::new().unwrap();
    fs::write(dump.path().join("leftover.csv"), "x").unwrap();

    metadump()
        .args(["--connector", "fs"])
        .arg("--path")
        .arg(source.path())
        .arg("--output")
        .arg(dump.path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--continue"));
}
