//! The Solver's two caches (4.6): an in-memory `StatusCache` keyed by
//! action version (reused within a single run) and an on-disk
//! `ResultCache` under `.garden/cache/<kind>/<name>/<version>.json`,
//! written atomically the same way the teacher persists its lockfile.

use crate::core::model::ActionRef;
use crate::solver::{ResultState, TaskResult};
use crate::template::{from_json, to_json, TemplateValue};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// In-memory, per-run cache of `Status`/`Process` results keyed by
/// `(action, version)`. Never persisted; exists so repeated `Status(A)`
/// calls within one run reuse the first result unless `force`.
#[derive(Default)]
pub struct StatusCache {
    entries: DashMap<(ActionRef, String), TaskResult>,
}

impl StatusCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, action_ref: &ActionRef, version: &str) -> Option<TaskResult> {
        self.entries.get(&(action_ref.clone(), version.to_string())).map(|e| e.clone())
    }

    pub fn insert(&self, action_ref: &ActionRef, version: &str, result: TaskResult) {
        self.entries.insert((action_ref.clone(), version.to_string()), result);
    }
}

/// Only the cacheable slice of a [`TaskResult`] — one that succeeded and
/// is safe to replay on a future run without re-invoking the plugin.
#[derive(Debug, Serialize, Deserialize)]
struct CachedResult {
    state: ResultState,
    outputs: IndexMap<String, serde_json::Value>,
    detail: Option<String>,
}

/// The on-disk result cache, rooted at `<project>/.garden/cache`.
pub struct ResultCache {
    root: PathBuf,
}

impl ResultCache {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn path(&self, action_ref: &ActionRef, version: &str) -> PathBuf {
        self.root.join(action_ref.kind.as_str()).join(&action_ref.name).join(format!("{version}.json"))
    }

    /// Load a cached result, if one exists and can be parsed. A read/parse
    /// failure is treated as a cache miss (logged, never propagated) per
    /// the failure semantics summary's "Cache I/O error: Log and bypass
    /// cache; continue as if miss."
    #[must_use]
    pub fn load(&self, action_ref: &ActionRef, version: &str) -> Option<TaskResult> {
        let path = self.path(action_ref, version);
        let contents = std::fs::read_to_string(&path).ok()?;
        let cached: CachedResult = match serde_json::from_str(&contents) {
            Ok(c) => c,
            Err(err) => {
                tracing::warn!(target: "solver::cache", path = %path.display(), error = %err, "failed to parse cached result, treating as miss");
                return None;
            }
        };
        let outputs = cached
            .outputs
            .into_iter()
            .map(|(k, v)| (k, from_json(&v)))
            .collect::<IndexMap<String, TemplateValue>>();
        let now = SystemTime::now();
        Some(TaskResult {
            state: cached.state,
            outputs,
            detail: cached.detail,
            started_at: now,
            completed_at: now,
            error: None,
        })
    }

    /// Persist `result` under `<kind>/<name>/<version>.json`, via
    /// write-to-temp-then-rename. I/O failures are logged and swallowed,
    /// matching the "bypass cache on I/O error" policy — a failed cache
    /// write must never fail the task that produced the result.
    pub fn store(&self, action_ref: &ActionRef, version: &str, result: &TaskResult) {
        let path = self.path(action_ref, version);
        let cached = CachedResult {
            state: result.state,
            outputs: result.outputs.iter().map(|(k, v)| (k.clone(), to_json(v))).collect(),
            detail: result.detail.clone(),
        };
        let body = match serde_json::to_vec_pretty(&cached) {
            Ok(b) => b,
            Err(err) => {
                tracing::warn!(target: "solver::cache", error = %err, "failed to serialize result for caching");
                return;
            }
        };
        if let Err(err) = crate::utils::fs::atomic_write(&path, &body) {
            tracing::warn!(target: "solver::cache", path = %path.display(), error = %err, "failed to write result cache");
        }
    }
}

/// Directory a `ResultCache` should be rooted at for `project_root`.
#[must_use]
pub fn default_cache_root(project_root: &Path) -> PathBuf {
    project_root.join(".garden").join("cache")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::ActionKind;
    use tempfile::TempDir;

    fn result(state: ResultState) -> TaskResult {
        let now = SystemTime::now();
        let mut outputs = IndexMap::new();
        outputs.insert("imageId".to_string(), TemplateValue::String("sha256:abc".into()));
        TaskResult {
            state,
            outputs,
            detail: Some("built".to_string()),
            started_at: now,
            completed_at: now,
            error: None,
        }
    }

    #[test]
    fn status_cache_round_trips_within_a_run() {
        let cache = StatusCache::new();
        let action_ref = ActionRef::new(ActionKind::Build, "api");
        cache.insert(&action_ref, "v-abc", result(ResultState::Ready));
        assert!(cache.get(&action_ref, "v-abc").is_some());
        assert!(cache.get(&action_ref, "v-other").is_none());
    }

    #[test]
    fn result_cache_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(default_cache_root(dir.path()));
        let action_ref = ActionRef::new(ActionKind::Build, "api");
        cache.store(&action_ref, "v-abc", &result(ResultState::Cached));

        let loaded = cache.load(&action_ref, "v-abc").unwrap();
        assert_eq!(loaded.state, ResultState::Cached);
        assert_eq!(loaded.outputs.get("imageId"), Some(&TemplateValue::String("sha256:abc".into())));
    }

    #[test]
    fn missing_cache_entry_is_a_clean_miss() {
        let dir = TempDir::new().unwrap();
        let cache = ResultCache::new(default_cache_root(dir.path()));
        let action_ref = ActionRef::new(ActionKind::Build, "api");
        assert!(cache.load(&action_ref, "v-nonexistent").is_none());
    }
}
