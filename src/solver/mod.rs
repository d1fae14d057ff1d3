//! The Solver (4.6): turns a validated [`crate::graph::Graph`] into a task
//! graph of `Resolve`/`Status`/`Process` tasks per action, executes it with
//! bounded per-kind concurrency, and persists cacheable results.
//!
//! - [`cache`] - the in-memory `StatusCache` and on-disk `ResultCache`.
//! - [`context`] - builds the per-action Resolve context from the
//!   dependency outputs the scheduler has already produced.
//! - [`events`] - the bounded event bus task transitions are published to.
//! - [`plugin`] - the `Plugin` trait and registry the scheduler dispatches
//!   `getStatus`/`process` calls through.
//! - [`scheduler`] - the actual executor.

pub mod cache;
pub mod context;
pub mod events;
pub mod plugin;
pub mod scheduler;

use crate::core::model::ActionRef;
use crate::template::TemplateValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

pub use cache::{ResultCache, StatusCache, default_cache_root};
pub use context::build_resolve_context;
pub use events::{EventBus, EventReceiver, SolverEvent};
pub use plugin::{Plugin, PluginRegistry, ResolvedAction};
pub use scheduler::Scheduler;

/// The three task kinds the Solver schedules per action (4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Evaluate `spec`/`variables` to their final form against a context
    /// that now includes dependency outputs.
    Resolve,
    /// Query current state without mutating anything.
    Status,
    /// Perform the mutating build/deploy/run/test operation.
    Process,
}

impl TaskKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Status => "status",
            Self::Process => "process",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies one task in the schedule: one action, one kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId {
    pub action_ref: ActionRef,
    pub kind: TaskKind,
}

impl TaskId {
    #[must_use]
    pub fn new(action_ref: ActionRef, kind: TaskKind) -> Self {
        Self { action_ref, kind }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.action_ref)
    }
}

/// The outcome category of a completed task, independent of its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResultState {
    /// The action is already in its desired state; nothing further to do.
    Ready,
    /// The action is not yet in its desired state and needs processing.
    NotReady,
    /// Served from the on-disk result cache without invoking the plugin.
    Cached,
    /// The task's plugin handler returned an error, or the task timed out.
    Failed,
    /// A dependency this task needed was cancelled or never completed.
    Missing,
    /// The action is disabled; its dependants see this instead of `ready`
    /// (4.6's skip-on-disabled invariant, spec §8 "Skip-on-disabled").
    Skipped,
}

/// The result of one task execution (or cache hit).
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub state: ResultState,
    pub outputs: IndexMap<String, TemplateValue>,
    pub detail: Option<String>,
    pub started_at: SystemTime,
    pub completed_at: SystemTime,
    pub error: Option<String>,
}

impl TaskResult {
    /// Whether a dependent task may safely treat this result as "done" —
    /// the only two states worth building on top of. `NotReady` is a
    /// legitimate `Status` outcome that simply means "go ahead and
    /// process"; it is never itself a basis for a dependent's context.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.state, ResultState::Ready | ResultState::Cached)
    }
}

/// The aggregate outcome of one [`Scheduler::run`] call across every
/// requested target and its transitive dependencies.
#[derive(Debug, Clone)]
pub struct OperationResult {
    pub success: bool,
    /// Set once the abort-on-failure policy has cancelled the remainder of
    /// the run following some task's failure.
    pub aborted: bool,
    pub succeeded: Vec<ActionRef>,
    pub failed: Vec<ActionRef>,
    pub cancelled: Vec<ActionRef>,
    pub task_results: HashMap<TaskId, TaskResult>,
}
