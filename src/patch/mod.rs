//! In-place source rewriting
//!
//! Files are only written when their content changes, and always through a
//! temp file in the same directory followed by a rename, so an interrupted
//! write never leaves a truncated file behind. Each file is committed on its
//! own; a failure part way through a batch leaves earlier files rewritten.

pub mod markers;
pub mod targets;

pub use markers::{patch_markers, should_patch, Patched};
pub use targets::retarget_using_tasks;

use crate::identity::KeyMaterial;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of patching a batch of files.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    pub rewritten: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
}

fn read_file(path: &Path) -> Result<String, PatchError> {
    if !path.is_file() {
        return Err(PatchError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(|source| PatchError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `content` via a sibling temp file.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), PatchError> {
    let write_err = |source| PatchError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Patch the identity markers of one file. Returns whether it was rewritten.
pub fn patch_file(path: &Path, material: &KeyMaterial) -> Result<bool, PatchError> {
    let content = read_file(path)?;
    let patched = patch_markers(&content, &material.public_key, &material.token);
    if !patched.changed {
        debug!(file = %path.display(), "Identity markers already up to date");
        return Ok(false);
    }

    write_atomic(path, &patched.text)?;
    info!(file = %path.display(), "Patched identity markers");
    Ok(true)
}

/// Patch files one after another, stopping at the first failure.
pub fn patch_files<P: AsRef<Path>>(
    files: &[P],
    material: &KeyMaterial,
) -> Result<PatchSummary, PatchError> {
    let mut summary = PatchSummary::default();
    for file in files {
        let file = file.as_ref();
        if patch_file(file, material)? {
            summary.rewritten.push(file.to_path_buf());
        } else {
            summary.unchanged.push(file.to_path_buf());
        }
    }
    Ok(summary)
}

/// Retarget the `UsingTask` declarations of one `.targets` file.
pub fn retarget_targets_file(
    path: &Path,
    task_prefix: &str,
    task_path: &str,
) -> Result<bool, PatchError> {
    let content = read_file(path)?;
    let Some(rewritten) = retarget_using_tasks(&content, task_prefix, task_path) else {
        debug!(file = %path.display(), "Skipping targets file that is not valid XML");
        return Ok(false);
    };
    if rewritten == content {
        return Ok(false);
    }

    write_atomic(path, &rewritten)?;
    info!(file = %path.display(), "Retargeted UsingTask declarations");
    Ok(true)
}
