//! Path helpers for locating configuration and resolving relative paths

use envmatrix_core::{Error, Result};
use std::path::{Component, Path, PathBuf};

/// The current user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| Error::configuration("home directory could not be determined"))
}

/// Join `path` onto `base` unless it is already absolute, then drop `.` and
/// `..` components lexically
///
/// The result is not canonicalized: the path may not exist yet.
pub fn absolutize(base: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Walk from `start_dir` up to the filesystem root looking for `file_name`
pub fn find_upwards(start_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_absolutize_relative() {
        let base = Path::new("/project");
        assert_eq!(
            absolutize(base, Path::new("doc/../build")),
            PathBuf::from("/project/build")
        );
        assert_eq!(
            absolutize(base, Path::new("./tests")),
            PathBuf::from("/project/tests")
        );
    }

    #[test]
    fn test_absolutize_keeps_absolute() {
        assert_eq!(
            absolutize(Path::new("/project"), Path::new("/tmp/x")),
            PathBuf::from("/tmp/x")
        );
    }

    #[test]
    fn test_find_upwards() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tox.ini"), "[tox]\n").unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_upwards(&nested, "tox.ini").unwrap();
        assert_eq!(found, temp_dir.path().join("tox.ini"));

        assert!(find_upwards(&nested, "missing.ini").is_none());
    }
}
