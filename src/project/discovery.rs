use anyhow::{Context, Result};
use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PROJECT_EXTENSION: &str = "csproj";

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub excluded_dirs: Vec<String>,
    pub max_depth: Option<usize>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            excluded_dirs: vec!["bin".to_string(), "obj".to_string(), ".git".to_string()],
            max_depth: None,
        }
    }
}

/// Walk `root` and return every file accepted by `accept`, sorted by path so
/// discovery order is stable across runs.
pub fn find_files<F>(root: &Path, config: &DiscoveryConfig, accept: F) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut override_builder = OverrideBuilder::new(root);
    for excluded in &config.excluded_dirs {
        override_builder
            .add(&format!("!{}/", excluded))
            .with_context(|| format!("Invalid exclusion pattern for {}", excluded))?;
    }
    let overrides = override_builder
        .build()
        .context("Failed to build discovery overrides")?;

    let mut files = Vec::new();
    for result in WalkBuilder::new(root)
        .max_depth(config.max_depth)
        .hidden(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .ignore(false)
        .parents(false)
        .overrides(overrides)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build()
    {
        let entry = match result {
            Ok(e) => e,
            Err(err) => {
                warn!(error = %err, "Failed to read directory entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if accept(entry.path()) {
            files.push(entry.into_path());
        }
    }

    debug!(root = %root.display(), count = files.len(), "Discovery finished");
    Ok(files)
}

/// All project descriptors beneath `root`.
pub fn discover_projects(root: &Path, config: &DiscoveryConfig) -> Result<Vec<PathBuf>> {
    find_files(root, config, |path| {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(PROJECT_EXTENSION))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "<Project/>").unwrap();
    }

    #[test]
    fn test_discovers_projects_sorted() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b/B.csproj");
        touch(dir.path(), "a/A.csproj");
        touch(dir.path(), "a/readme.txt");

        let found = discover_projects(dir.path(), &DiscoveryConfig::default()).unwrap();
        let rel: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            rel,
            vec![PathBuf::from("a/A.csproj"), PathBuf::from("b/B.csproj")]
        );
    }

    #[test]
    fn test_skips_build_output_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/A.csproj");
        touch(dir.path(), "a/obj/A.csproj");
        touch(dir.path(), "a/bin/Debug/A.csproj");

        let found = discover_projects(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_ignore_files_are_not_honoured() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "a/\n").unwrap();
        touch(dir.path(), "a/A.csproj");

        let found = discover_projects(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_find_files_with_predicate() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/Properties/AssemblyInfo.cs");
        touch(dir.path(), "a/Program.cs");

        let found = find_files(dir.path(), &DiscoveryConfig::default(), |p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("Assembly") && n.ends_with(".cs"))
        })
        .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("AssemblyInfo.cs"));
    }
}
