//! Command-line arguments.
//!
//! The flags are the whole configuration surface of a run; they are
//! also snapshotted into the archive by `ArgumentsTask` so a dump is
//! self-describing.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug, Clone, Serialize)]
#[command(name = "metadump")]
#[command(about = "Extract metadata from a remote system into an archive of named slots")]
#[command(version)]
pub struct DumpArgs {
    /// Which source to extract from (sqlite, fs)
    #[arg(long)]
    pub connector: String,

    /// Output directory; defaults to <connector>-dump
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Resume into an existing non-empty output directory, skipping
    /// slots that were already committed
    #[arg(long = "continue")]
    pub resume: bool,

    /// Print the task list without running anything
    #[arg(long)]
    pub dry_run: bool,

    /// Worker bound for parallel task groups
    #[arg(long, default_value_t = 8)]
    pub threads: usize,

    /// Also package the finished output directory into <output>.zip
    #[arg(long)]
    pub zip: bool,

    /// SQLite database file (sqlite connector)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Directory to crawl (fs connector)
    #[arg(long)]
    pub path: Option<PathBuf>,
}
