use crate::graph::NameSet;
use crate::project::{find_files, DiscoveryConfig};
use crate::util::paths::relative_to;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const ASSEMBLY_EXTENSION: &str = "dll";
const ENTITY_FRAMEWORK_FILE: &str = "EntityFramework.dll";

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Reference assemblies found under one directory.
#[derive(Debug, Clone)]
pub struct ReferenceLocator {
    root: PathBuf,
    assemblies: Vec<PathBuf>,
}

impl ReferenceLocator {
    /// Enumerate every `*.dll` beneath `root`, in path order.
    pub fn new(root: &Path) -> Result<Self> {
        let config = DiscoveryConfig {
            excluded_dirs: Vec::new(),
            max_depth: None,
        };
        let assemblies = find_files(root, &config, |path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(ASSEMBLY_EXTENSION))
        })
        .with_context(|| format!("Failed to scan references in {}", root.display()))?;

        debug!(root = %root.display(), count = assemblies.len(), "Indexed reference assemblies");
        Ok(Self {
            root: root.to_path_buf(),
            assemblies,
        })
    }

    pub fn len(&self) -> usize {
        self.assemblies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assemblies.is_empty()
    }

    /// Files called `<name>.dll` for every name in `names`.
    pub fn locate(&self, names: &NameSet) -> Vec<PathBuf> {
        self.assemblies
            .iter()
            .filter(|path| {
                let name = file_name(path);
                name.len() > ASSEMBLY_EXTENSION.len() + 1
                    && names.contains(&name[..name.len() - ASSEMBLY_EXTENSION.len() - 1])
            })
            .cloned()
            .collect()
    }

    /// `EntityFramework.dll` directly under the reference root.
    pub fn entity_framework(&self) -> Option<PathBuf> {
        let path = self.root.join(ENTITY_FRAMEWORK_FILE);
        path.is_file().then_some(path)
    }

    /// First assembly whose file name starts with `prefix`.
    pub fn task_assembly(&self, prefix: &str) -> Option<PathBuf> {
        let prefix = prefix.to_lowercase();
        self.assemblies
            .iter()
            .find(|path| file_name(path).to_lowercase().starts_with(&prefix))
            .cloned()
    }
}

/// Reference files of a run, unique by file name. The first file wins.
#[derive(Debug, Clone, Default)]
pub struct ReferenceFiles {
    files: Vec<PathBuf>,
    names: NameSet,
}

impl ReferenceFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: PathBuf) -> bool {
        if !self.names.insert(file_name(&path)) {
            debug!(file = %path.display(), "Reference file with this name already listed");
            return false;
        }
        self.files.push(path);
        true
    }

    pub fn extend(&mut self, paths: impl IntoIterator<Item = PathBuf>) {
        for path in paths {
            self.add(path);
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Copy every reference file into `copy_dir` and return the copied paths
/// relative to `output_dir`.
pub fn copy_references(files: &[PathBuf], copy_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(copy_dir)
        .with_context(|| format!("Failed to create {}", copy_dir.display()))?;

    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        let target = copy_dir.join(file_name(file));
        fs::copy(file, &target).with_context(|| {
            format!("Failed to copy {} to {}", file.display(), target.display())
        })?;
        copied.push(relative_to(&target, output_dir));
    }
    info!(count = copied.len(), dir = %copy_dir.display(), "Copied reference files");
    Ok(copied)
}
