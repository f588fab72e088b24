use std::env;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Anchor a relative path at the current directory.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Path of `target` as seen from directory `base`.
///
/// Falls back to `target` itself when no relative form exists, as happens
/// for paths on different Windows drives.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    pathdiff::diff_paths(target, base).unwrap_or_else(|| target.to_path_buf())
}

fn join_components(path: &Path, separator: &str) -> String {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| match c {
            Component::RootDir => String::new(),
            other => other.as_os_str().to_string_lossy().into_owned(),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// MSBuild item path: components joined with `\`.
pub fn to_backslashes(path: &Path) -> String {
    join_components(path, "\\")
}

pub fn to_forward_slashes(path: &Path) -> String {
    join_components(path, "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/src/a/b/c.dll"), Path::new("/src/out")),
            PathBuf::from("../a/b/c.dll")
        );
        assert_eq!(
            relative_to(Path::new("/src/out/c.dll"), Path::new("/src/out")),
            PathBuf::from("c.dll")
        );
    }

    #[test]
    fn test_to_backslashes() {
        assert_eq!(to_backslashes(Path::new("Grid/Grid.csproj")), "Grid\\Grid.csproj");
        assert_eq!(to_backslashes(Path::new("./Grid/./x.cs")), "Grid\\x.cs");
        assert_eq!(to_backslashes(Path::new("../Bin/a.dll")), "..\\Bin\\a.dll");
    }

    #[test]
    fn test_to_forward_slashes() {
        assert_eq!(to_forward_slashes(Path::new("a/b/c.txt")), "a/b/c.txt");
    }

    #[test]
    fn test_absolute_keeps_absolute() {
        let path = env::temp_dir();
        assert_eq!(absolute(&path).unwrap(), path);
        assert!(absolute(Path::new("x")).unwrap().is_absolute());
    }
}
