//! End-to-end dump of a real SQLite database through the full driver.

use std::fs;
use std::path::PathBuf;

use rusqlite::Connection;
use tempfile::TempDir;

use metadump::task::TaskState;
use metadump::{DumpArgs, MetadataDumper};

fn seed_database(path: &std::path::Path) {
    let db = Connection::open(path).unwrap();
    db.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
         CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER);
         CREATE INDEX idx_orders_user ON orders (user_id);
         CREATE VIEW user_names AS SELECT name FROM users;
         INSERT INTO users (name) VALUES ('ada'), ('grace');",
    )
    .unwrap();
}

fn dump_args(database: PathBuf, output: PathBuf) -> DumpArgs {
    DumpArgs {
        connector: "sqlite".into(),
        output: Some(output),
        resume: false,
        dry_run: false,
        threads: 4,
        zip: false,
        database: Some(database),
        path: None,
    }
}

#[tokio::test]
async fn dumps_schema_and_statistics_from_a_seeded_database() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("seed.db");
    seed_database(&database);
    let output = dir.path().join("dump");

    let report = MetadataDumper
        .run(&dump_args(database, output.clone()))
        .await
        .unwrap()
        .expect("not a dry run");

    assert_eq!(report.failed_required, 0);
    assert_eq!(report.output, output);

    let schema = fs::read_to_string(output.join("schema.csv")).unwrap();
    assert!(schema.starts_with("type,name,tbl_name,rootpage,sql\n"));
    assert!(schema.contains("table,orders"));
    assert!(schema.contains("table,users"));
    assert!(schema.contains("view,user_names"));

    let table_list = fs::read_to_string(output.join("table-list.csv")).unwrap();
    assert_eq!(table_list, "name\norders\nusers\n");

    // The primary table list succeeded, so the legacy fallback and the
    // consolidated error message were both skipped by their conditions.
    let rows = report.rows;
    let state_of = |name: &str| {
        rows.iter()
            .find(|row| row.name == name)
            .map(|row| row.state)
            .expect("task missing from report")
    };
    assert_eq!(state_of("table-list.csv"), TaskState::Succeeded);
    assert_eq!(state_of("table-list-legacy.csv"), TaskState::Skipped);
    assert_eq!(state_of("table-list-error.txt"), TaskState::Skipped);
    assert!(!output.join("table-list-legacy.csv").exists());
    assert!(!output.join("table-list-error.txt").exists());

    let table_count = fs::read_to_string(output.join("table-count.csv")).unwrap();
    assert_eq!(table_count, "count\n2\n");
    let view_count = fs::read_to_string(output.join("view-count.csv")).unwrap();
    assert_eq!(view_count, "count\n1\n");

    // Every run is self-describing.
    assert!(output.join("dumper-version.txt").exists());
    let arguments = fs::read_to_string(output.join("arguments.json")).unwrap();
    assert!(arguments.contains("\"connector\": \"sqlite\""));
}

#[tokio::test]
async fn resumed_run_skips_committed_slots_and_still_succeeds() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("seed.db");
    seed_database(&database);
    let output = dir.path().join("dump");

    let mut args = dump_args(database, output.clone());
    MetadataDumper.run(&args).await.unwrap();

    let schema_before = fs::read_to_string(output.join("schema.csv")).unwrap();
    args.resume = true;
    let report = MetadataDumper.run(&args).await.unwrap().unwrap();

    assert_eq!(report.failed_required, 0);
    let schema_row = report
        .rows
        .iter()
        .find(|row| row.name == "schema.csv")
        .unwrap();
    assert_eq!(schema_row.state, TaskState::Skipped);
    assert_eq!(
        fs::read_to_string(output.join("schema.csv")).unwrap(),
        schema_before
    );
}

#[tokio::test]
async fn zip_flag_packages_the_output_directory() {
    let dir = TempDir::new().unwrap();
    let database = dir.path().join("seed.db");
    seed_database(&database);
    let output = dir.path().join("dump");

    let mut args = dump_args(database, output.clone());
    args.zip = true;
    MetadataDumper.run(&args).await.unwrap();

    let archive = dir.path().join("dump.zip");
    assert!(archive.is_file());
    let mut zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    assert!(zip.by_name("schema.csv").is_ok());
}
