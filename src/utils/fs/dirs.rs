//! Directory creation, cross-platform and permission-aware.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Ensures a directory exists, creating it and all parent directories if
/// necessary. Used by the on-disk result cache (`.garden/cache/...`) and
/// by the atomic writer below.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!("Failed to create directory: {}\n\nCheck directory permissions and path validity", path.display())
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_nested_directories() {
        let temp = tempdir().unwrap();
        let nested = temp.path().join("a").join("b").join("c");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn errors_when_path_is_a_file() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();
        assert!(ensure_dir(&file).is_err());
    }
}
