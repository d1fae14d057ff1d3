//! The concrete, per-graph-node action configuration.
//!
//! [`ActionConfig`] is the output of the Config Loader & Templater (and of
//! the Module->Action Converter for legacy modules): every field the Graph
//! Builder needs to structurally place the action in the DAG is resolved
//! to a plain Rust value, while `spec` and `variables` stay as raw
//! [`Node`] trees — per the field-resolution-staging rule, those are only
//! evaluated later, by the Solver's `Resolve` task, against a context that
//! by then includes dependency outputs.

use crate::core::model::{ActionKind, ActionMode, ActionRef};
use crate::template::Node;
use std::path::PathBuf;

/// The `source: {path: ...}` field of an action config.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Path relative to the project root (or module root, for converted
    /// actions) that `include`/`exclude` are matched against.
    pub path: PathBuf,
}

/// A fully-discovered, graph-ready action config.
#[derive(Debug, Clone)]
pub struct ActionConfig {
    pub kind: ActionKind,
    pub name: String,
    pub type_name: String,
    pub description: Option<String>,
    pub source: Option<SourceConfig>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    /// Explicit `dependencies: ["kind.name", ...]`.
    pub dependencies: Vec<ActionRef>,
    /// For Deploy/Run/Test: the single Build this action's artifact comes
    /// from (data-model invariant: at most one).
    pub build: Option<String>,
    /// Raw, unevaluated `variables` tree.
    pub variables: Node,
    pub timeout: Option<u64>,
    pub mode: ActionMode,
    pub disabled: bool,
    /// Raw, unevaluated, plugin-opaque `spec` tree.
    pub spec: Node,
    /// Dotted paths excluded from this action's version hash
    /// (`cache.exclude`).
    pub cache_exclude: Vec<String>,
    /// The document this config was loaded (or converted) from, for error
    /// messages.
    pub document_path: PathBuf,
    /// If this action was produced by expanding a `RenderTemplate`, the
    /// resolved (possibly still-partial) input values that `spec`/
    /// `variables` may reference via `${inputs.*}`. Threaded into the
    /// action's context chain by the Graph Builder and Solver so those
    /// references resolve without any AST rewriting at expansion time.
    pub render_inputs: Option<indexmap::IndexMap<String, crate::template::TemplateValue>>,
}

impl ActionConfig {
    /// This action's identity as a `(kind, name)` pair.
    #[must_use]
    pub fn action_ref(&self) -> ActionRef {
        ActionRef::new(self.kind, self.name.clone())
    }
}
