//! SQLite metadata connector.
//!
//! Dumps schema objects and object statistics from a SQLite database
//! opened read-only. Also the reference implementation of the two
//! condition patterns: the table list is extracted from the modern
//! `sqlite_schema` view with a legacy `sqlite_master` fallback that
//! runs only if the preferred query failed, and a consolidated message
//! surfaces only if both alternatives failed.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::cli::DumpArgs;
use crate::error::DumpError;
use crate::io::csv_writer;
use crate::task::{
    run_with_sink, Condition, ParallelTaskGroup, RunOutcome, Summary, Task, TaskCategory,
    TaskRunContext, TaskValue,
};

use super::common::MessageTask;
use super::{Connector, Handle};

/// A single SELECT dumped to one CSV slot.
///
/// Stateless and side-effect-isolated, so it is parallel-safe; the
/// connection mutex serializes actual statement execution.
pub struct SqliteSelectTask {
    target_path: String,
    sql: String,
    category: TaskCategory,
    conditions: Vec<Condition>,
}

impl SqliteSelectTask {
    pub fn new(target_path: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            sql: sql.into(),
            category: TaskCategory::Required,
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

    /// Fallback-query pattern: run only if `task` failed.
    pub fn only_if_failed(self, task: &dyn Task) -> Self {
        self.with_condition(Condition::failed(task))
    }
}

impl fmt::Display for SqliteSelectTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqliteSelectTask({}): {}", self.target_path, self.sql)
    }
}

#[async_trait]
impl Task for SqliteSelectTask {
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
        run_with_sink(self, context, |writer, handle| {
            let connection = handle.sqlite()?;
            let mut statement = connection.prepare(&self.sql)?;
            let columns: Vec<String> =
                statement.column_names().iter().map(|c| c.to_string()).collect();
            let mut out = csv_writer(writer);
            out.write_record(&columns)?;
            let mut rows = statement.query([])?;
            let mut count = 0u64;
            while let Some(row) = rows.next()? {
                let mut record = Vec::with_capacity(columns.len());
                for index in 0..columns.len() {
                    record.push(render_value(row.get_ref(index)?));
                }
                out.write_record(&record)?;
                count += 1;
            }
            out.flush()?;
            Ok(TaskValue::Summary(Summary::new(count)))
        })
        .await
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(r) => r.to_string(),
        ValueRef::Text(text) => String::from_utf8_lossy(text).into_owned(),
        ValueRef::Blob(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
    }
}

/// `--connector sqlite --database <path>`
pub struct SqliteConnector;

impl Connector for SqliteConnector {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn description(&self) -> &'static str {
        "SQLite database metadata"
    }

    fn open(&self, args: &DumpArgs) -> Result<Handle, DumpError> {
        let database = args
            .database
            .as_ref()
            .ok_or_else(|| DumpError::usage("the sqlite connector requires --database"))?;
        if !database.is_file() {
            return Err(DumpError::usage(format!(
                "database file not found: {}",
                database.display()
            )));
        }
        let connection = Connection::open_with_flags(
            database,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Handle::Sqlite(Mutex::new(connection)))
    }

    fn add_tasks(&self, tasks: &mut Vec<Arc<dyn Task>>, _args: &DumpArgs) -> Result<(), DumpError> {
        let schema = Arc::new(SqliteSelectTask::new(
            "schema.csv",
            "SELECT type, name, tbl_name, rootpage, sql FROM sqlite_master ORDER BY type, name",
        ));

        // Preferred table list with a legacy fallback, plus one
        // consolidated message if both alternatives failed.
        let table_list = Arc::new(
            SqliteSelectTask::new(
                "table-list.csv",
                "SELECT name FROM sqlite_schema WHERE type = 'table' ORDER BY name",
            )
            .with_category(TaskCategory::Optional),
        );
        let table_list_legacy = Arc::new(
            SqliteSelectTask::new(
                "table-list-legacy.csv",
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
            )
            .with_category(TaskCategory::Optional)
            .only_if_failed(table_list.as_ref()),
        );
        let table_list_alternatives: Vec<Arc<dyn Task>> =
            vec![table_list.clone(), table_list_legacy.clone()];
        let table_list_message = Arc::new(
            MessageTask::new(
                "table-list-error.txt",
                "Could not list tables from either sqlite_schema or sqlite_master.",
            )
            .with_condition(Condition::all_failed(&table_list_alternatives)),
        );

        let database_list = Arc::new(
            SqliteSelectTask::new("database-list.csv", "PRAGMA database_list")
                .with_category(TaskCategory::Optional),
        );

        let mut stats = ParallelTaskGroup::new("object-stats.csv");
        for (target, object_type) in [
            ("table-count.csv", "table"),
            ("index-count.csv", "index"),
            ("view-count.csv", "view"),
            ("trigger-count.csv", "trigger"),
        ] {
            stats.add_task(Arc::new(
                SqliteSelectTask::new(
                    target,
                    format!(
                        "SELECT COUNT(*) AS count FROM sqlite_master WHERE type = '{object_type}'"
                    ),
                )
                .with_category(TaskCategory::Optional),
            ));
        }

        tasks.push(schema);
        tasks.push(table_list);
        tasks.push(table_list_legacy);
        tasks.push(table_list_message);
        tasks.push(database_list);
        tasks.push(Arc::new(stats));
        Ok(())
    }
}
