//! Narrow abstraction over the VCS hash provider the core consumes.
//!
//! The version hash for an action folds in the content hash of every source
//! file its `include`/`exclude` globs match (see `graph::version`). The core
//! never shells out to `git` itself — it asks a [`VcsHashProvider`] for the
//! set of tracked files and their content hashes, so tests can supply a
//! deterministic in-memory implementation instead of a real repository.

use std::path::{Path, PathBuf};

/// A single source file contributing to an action's version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TrackedFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Content hash (hex-encoded), e.g. a git blob SHA or a plain sha256.
    pub hash: String,
}

/// Supplies the file+hash pairs matched by an action's include/exclude
/// globs. Implemented against the real VCS by the CLI's plugin layer;
/// implemented in-memory by tests.
pub trait VcsHashProvider: Send + Sync {
    /// Return every tracked file under `root` whose path (relative to
    /// `root`) matches at least one of `include` and none of `exclude`.
    /// Glob syntax follows the `glob` crate.
    fn tracked_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<TrackedFile>, crate::core::error::GardenError>;
}

/// A provider backed by plain filesystem reads and content hashing, used
/// when no VCS metadata is available (and by default in tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemHashProvider;

impl VcsHashProvider for FilesystemHashProvider {
    fn tracked_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<TrackedFile>, crate::core::error::GardenError> {
        use sha2::{Digest, Sha256};

        let include_patterns: Vec<glob::Pattern> = include
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();
        let exclude_patterns: Vec<glob::Pattern> = exclude
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        let mut files = Vec::new();
        if !root.exists() {
            return Ok(files);
        }
        for entry in walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            let rel_str = rel.to_string_lossy().replace('\\', "/");

            let included = include_patterns.is_empty()
                || include_patterns.iter().any(|p| p.matches(&rel_str));
            let excluded = exclude_patterns.iter().any(|p| p.matches(&rel_str));
            if !included || excluded {
                continue;
            }

            let content = std::fs::read(entry.path())?;
            let mut hasher = Sha256::new();
            hasher.update(&content);
            let hash = hex::encode(hasher.finalize());
            files.push(TrackedFile { path: rel, hash });
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn tracks_included_files_and_skips_excluded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();
        std::fs::write(dir.path().join("b.md"), "docs").unwrap();

        let provider = FilesystemHashProvider;
        let files = provider
            .tracked_files(dir.path(), &["**/*.rs".to_string()], &[])
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("a.rs"));
    }
}
