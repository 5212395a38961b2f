//! Zip packaging of a finished output directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

use crate::error::DumpError;

/// Package every file under `dir` into a zip archive at `archive`.
/// Entry names are paths relative to `dir`.
pub fn package_directory(dir: &Path, archive: &Path) -> Result<(), DumpError> {
    let file = File::create(archive)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = 0usize;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| DumpError::Io(io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| DumpError::internal(format!("path outside output dir: {e}")))?;
        zip.start_file(relative.to_string_lossy(), options)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        entries += 1;
    }
    let mut finished = zip.finish()?;
    finished.flush()?;
    info!(archive = %archive.display(), entries, "packaged output directory");
    Ok(())
}
