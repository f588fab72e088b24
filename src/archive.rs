//! Zip archives of build outputs

use crate::error::GeneratorError;
use crate::util::paths::{absolute, relative_to, to_forward_slashes};
use serde::Serialize;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub archive: PathBuf,
    pub entries: Vec<String>,
}

fn resolve(path: &Path) -> Result<PathBuf, GeneratorError> {
    absolute(path).map_err(|e| {
        GeneratorError::Filesystem(format!("Failed to resolve {}: {}", path.display(), e))
    })
}

/// Entry name of `file` inside an archive rooted at `working_dir`.
pub fn entry_name(file: &Path, working_dir: &Path) -> String {
    to_forward_slashes(&relative_to(file, working_dir))
}

/// Pack `files` into a deflate-compressed zip at `archive_path`.
///
/// Entry names are the file paths relative to `working_dir`, with forward
/// slashes. Every input is checked before the archive is created. The
/// archive is written next to its destination and moved into place when
/// complete, so a failed run never leaves a partial archive behind.
///
/// # Errors
///
/// Returns [`GeneratorError::InputMissing`] when `working_dir` or any input
/// file does not exist, and [`GeneratorError::Write`] or
/// [`GeneratorError::Archive`] when the archive cannot be written.
///
/// # Example
///
/// ```no_run
/// use buildgen::archive::create_archive;
/// use std::path::Path;
///
/// let summary = create_archive(
///     Path::new("bin.zip"),
///     Path::new("Bin"),
///     &["Bin/Framework/DevExpress.Data.dll"],
/// )?;
/// assert_eq!(summary.entries, vec!["Framework/DevExpress.Data.dll"]);
/// # Ok::<(), buildgen::GeneratorError>(())
/// ```
pub fn create_archive<P: AsRef<Path>>(
    archive_path: &Path,
    working_dir: &Path,
    files: &[P],
) -> Result<ArchiveSummary, GeneratorError> {
    if !working_dir.is_dir() {
        return Err(GeneratorError::input_missing("Working directory", working_dir));
    }
    let working_dir = resolve(working_dir)?;

    let mut inputs = Vec::with_capacity(files.len());
    for file in files {
        let file = file.as_ref();
        if !file.is_file() {
            return Err(GeneratorError::input_missing("Archive input", file));
        }
        let file = resolve(file)?;
        let name = entry_name(&file, &working_dir);
        inputs.push((file, name));
    }

    let archive_path = resolve(archive_path)?;
    let write_err = |source| GeneratorError::Write {
        path: archive_path.clone(),
        source,
    };
    let zip_err = |source| GeneratorError::Archive {
        path: archive_path.clone(),
        source,
    };
    let dir = archive_path.parent().unwrap_or(Path::new("."));
    let tmp = NamedTempFile::new_in(dir).map_err(write_err)?;

    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(tmp.reopen().map_err(write_err)?);
    for (file, name) in &inputs {
        let mut input = File::open(file).map_err(|source| GeneratorError::Write {
            path: file.clone(),
            source,
        })?;
        zip.start_file(name.as_str(), options).map_err(zip_err)?;
        io::copy(&mut input, &mut zip).map_err(write_err)?;
        debug!(entry = %name, "Added archive entry");
    }
    zip.finish().map_err(zip_err)?.sync_all().map_err(write_err)?;
    tmp.persist(&archive_path).map_err(|e| write_err(e.error))?;

    info!(archive = %archive_path.display(), entries = inputs.len(), "Created archive");
    Ok(ArchiveSummary {
        archive: archive_path,
        entries: inputs.into_iter().map(|(_, name)| name).collect(),
    })
}
