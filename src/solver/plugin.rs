//! The plugin interface the Solver consumes (4.6): per action `type`, a
//! plugin supplies `getStatus`/`process` handlers, plus the optional
//! `convert` (C4) and `augmentGraph` (C5) hooks. The core never inspects
//! `spec` itself — it is opaque, plugin-typed data.

use crate::action::{ActionConfig, ModuleDoc};
use crate::core::error::GardenError;
use crate::core::model::ActionRef;
use crate::graph::Graph;
use crate::solver::TaskResult;
use crate::template::TemplateValue;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// An action with `spec`/`variables` fully resolved (no `Unresolved`
/// values remain) and its content-hash version attached — what a plugin
/// handler actually operates on.
#[derive(Debug, Clone)]
pub struct ResolvedAction {
    pub action_ref: ActionRef,
    pub type_name: String,
    pub version: String,
    pub spec: TemplateValue,
    pub variables: TemplateValue,
}

/// A plugin: the core's only point of contact with build/deploy/run/test
/// side effects.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The `type:` string this plugin handles (`container`, `kubernetes`,
    /// `exec`, ...).
    fn type_name(&self) -> &str;

    /// Query current state without mutating anything. A `getStatus` error
    /// is treated as `not-ready`, not propagated as a task failure (see
    /// the failure semantics summary).
    async fn get_status(&self, action: &ResolvedAction) -> Result<TaskResult, GardenError>;

    /// Perform the mutating operation (build/deploy/run/test/cleanup,
    /// depending on the action's kind).
    async fn process(&self, action: &ResolvedAction) -> Result<TaskResult, GardenError>;

    /// Override the default Module->Action fan-out (C4) for this plugin's
    /// module types. Returning `None` falls back to the default fan-out.
    fn convert(&self, _module: &ModuleDoc) -> Option<Vec<ActionConfig>> {
        None
    }

    /// Contribute additional actions after the initial graph is built
    /// (C5's augmentation step). Returning an empty `Vec` contributes
    /// nothing.
    fn augment_graph(&self, _graph: &Graph) -> Vec<ActionConfig> {
        Vec::new()
    }
}

/// Dispatch table from an action's `type:` string to the plugin that
/// handles it.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: HashMap<String, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.insert(plugin.type_name().to_string(), plugin);
    }

    #[must_use]
    pub fn get(&self, type_name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(type_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::ResultState;
    use indexmap::IndexMap;
    use std::time::SystemTime;

    struct NoopPlugin;

    #[async_trait]
    impl Plugin for NoopPlugin {
        fn type_name(&self) -> &str {
            "noop"
        }

        async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            Ok(TaskResult {
                state: ResultState::Ready,
                outputs: IndexMap::new(),
                detail: None,
                started_at: SystemTime::now(),
                completed_at: SystemTime::now(),
                error: None,
            })
        }

        async fn process(&self, action: &ResolvedAction) -> Result<TaskResult, GardenError> {
            self.get_status(action).await
        }
    }

    #[test]
    fn registry_dispatches_by_type_name() {
        let mut registry = PluginRegistry::new();
        registry.register(Arc::new(NoopPlugin));
        assert!(registry.get("noop").is_some());
        assert!(registry.get("other").is_none());
    }
}
