//! Output sinks and the row format shared by all row-producing tasks.
//!
//! A sink goes through three states: does-not-exist, temporary-write-in-
//! progress, committed. Once committed, a later run targeting the same
//! path sees `exists()` and skips re-execution entirely.

use std::io::Write;

use crate::error::DumpError;

pub mod archive;
pub mod fs;

pub use fs::FsOutputHandleFactory;

/// One output slot, identified by target path.
pub trait OutputHandle: Send + Sync + std::fmt::Debug {
    fn target_path(&self) -> &str;

    /// Whether the slot was already committed (by a prior run or an
    /// earlier task in this one).
    fn exists(&self) -> bool;

    /// Writer into the temporary location. Nothing is visible at the
    /// target path until `commit`.
    fn temporary_writer(&self) -> Result<Box<dyn Write + Send>, DumpError>;

    /// Atomically publish the temporary content at the target path.
    fn commit(&self) -> Result<(), DumpError>;
}

/// Per-run factory of output slots. Opening the same target path twice
/// in one run is a programmer error and fails fatally.
pub trait OutputHandleFactory: Send + Sync {
    fn create(&self, target_path: &str) -> Result<Box<dyn OutputHandle>, DumpError>;
}

/// The record format used by every row-producing task and by group
/// reports: single `\n` record separator, minimal quoting, backslash
/// escape. Reports stay greppable artifacts of the run.
pub fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .double_quote(false)
        .escape(b'\\')
        .from_writer(writer)
}
