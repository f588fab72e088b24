use crate::config::ConfigError;
use crate::patch::PatchError;
use crate::script::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("{what} not found: {}", path.display())]
    InputMissing { what: &'static str, path: PathBuf },

    #[error("No input paths: pass --root, or both --source and --references")]
    NoInputPaths,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("Failed to scan {}: {message}", root.display())]
    Scan { root: PathBuf, message: String },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to pack {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{0}")]
    Filesystem(String),
}

impl GeneratorError {
    pub fn input_missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
        GeneratorError::InputMissing {
            what,
            path: path.into(),
        }
    }

    pub(crate) fn scan(root: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        GeneratorError::Scan {
            root: root.into(),
            message: format!("{:#}", err),
        }
    }
}
