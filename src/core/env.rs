//! Explicit environment threaded through the Graph Builder and Solver.
//!
//! The original system reached for process-global state (a default
//! profiler, a module-level logger, environment variables read at import
//! time) in a handful of places. Per the core's design notes, all of that
//! becomes a single explicit [`CoreEnv`] value that callers construct and
//! pass down, so tests can run fully deterministically without touching
//! the process environment.

use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Per-task-kind concurrency ceilings for the solver.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrencyLimits {
    /// Maximum concurrent `Resolve` tasks.
    pub resolve: usize,
    /// Maximum concurrent `Status` tasks.
    pub status: usize,
    /// Maximum concurrent `Process` tasks, before any per-plugin partition.
    pub process: usize,
}

impl Default for ConcurrencyLimits {
    fn default() -> Self {
        Self {
            resolve: 10,
            status: 10,
            process: 4,
        }
    }
}

/// The cancellation policy applied when a task fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Cancel every unscheduled dependant of a failed task (default).
    AbortOnFailure,
    /// Isolate the failure to its own dependency closure; unrelated work
    /// continues.
    ContinueOnFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::AbortOnFailure
    }
}

/// Explicit, test-constructible environment for a single Garden operation.
#[derive(Debug, Clone)]
pub struct CoreEnv {
    /// Project root directory.
    pub project_root: PathBuf,
    /// Directory under which the on-disk result cache and diagnostics live,
    /// typically `<project_root>/.garden`.
    pub garden_dir: PathBuf,
    /// Dotted paths that are excluded from an action's version hash (see
    /// `cache.exclude` in the action config schema).
    pub cache_exclude: Vec<String>,
    /// Concurrency ceilings for the scheduler.
    pub concurrency: ConcurrencyLimits,
    /// Cancellation policy for the operation.
    pub failure_policy: FailurePolicy,
    /// Default per-task timeout used when an action does not declare one.
    pub default_timeout_secs: u64,
    /// A session identifier attached to every emitted event.
    pub session_id: Uuid,
}

impl CoreEnv {
    /// Build a `CoreEnv` rooted at `project_root` with otherwise-default
    /// settings and a freshly generated session id.
    #[must_use]
    pub fn new(project_root: impl Into<PathBuf>, session_id: Uuid) -> Self {
        let project_root = project_root.into();
        let garden_dir = project_root.join(".garden");
        Self {
            project_root,
            garden_dir,
            cache_exclude: Vec::new(),
            concurrency: ConcurrencyLimits::default(),
            failure_policy: FailurePolicy::default(),
            default_timeout_secs: 600,
            session_id,
        }
    }

    /// Directory the on-disk result cache lives under:
    /// `<garden_dir>/cache/<kind>/<name>/<version>.json`.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.garden_dir.join("cache")
    }

    /// Resolve a path relative to the project root.
    #[must_use]
    pub fn resolve_path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.project_root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_dir_is_under_garden_dir() {
        let env = CoreEnv::new("/tmp/proj", Uuid::nil());
        assert_eq!(env.cache_dir(), PathBuf::from("/tmp/proj/.garden/cache"));
    }
}
