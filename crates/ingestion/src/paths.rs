//! Listing the input files of a pipeline run.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::{LoadError, Result};

/// Every entry directly inside `dir`, as absolute paths sorted by file name.
///
/// Nothing is filtered out: subdirectories and files of any format are
/// returned, and the loader rejects what it cannot decode.
pub fn list_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let list_err = |message: String| LoadError::ListDir {
        path: dir.to_path_buf(),
        message,
    };
    let root = dir.canonicalize().map_err(|e| list_err(e.to_string()))?;
    if !root.is_dir() {
        return Err(list_err("not a directory".to_string()));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(&root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| list_err(e.to_string()))?;
        paths.push(entry.into_path());
    }

    debug!(dir = %root.display(), count = paths.len(), "Listed input paths");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_absolute_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pp", "a.nc", "c.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("nested.pp"), b"").unwrap();

        let paths = list_paths(dir.path()).unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.nc", "b.pp", "c.txt", "sub"]);
        assert!(paths.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_paths(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = list_paths(&dir.path().join("absent"));
        assert!(matches!(result, Err(LoadError::ListDir { .. })));
    }
}
