//! A `Run` action's second execution within a fresh `Scheduler` (same
//! project root, same version) is served from the on-disk result cache:
//! the plugin's `process` is invoked exactly once across both runs.

use async_trait::async_trait;
use garden_core::action::{ActionConfig, SourceConfig};
use garden_core::core::env::CoreEnv;
use garden_core::core::error::GardenError;
use garden_core::core::model::{ActionKind, ActionMode, ActionRef};
use garden_core::core::vcs::FilesystemHashProvider;
use garden_core::graph::build_graph;
use garden_core::solver::scheduler::{Operation, Scheduler};
use garden_core::solver::{EventBus, Plugin, PluginRegistry, ResolvedAction, ResultState, TaskResult};
use garden_core::template::{EvalContext, Node};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

struct CountingExecPlugin {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Plugin for CountingExecPlugin {
    fn type_name(&self) -> &str {
        "exec"
    }

    async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(TaskResult {
            state: ResultState::NotReady,
            outputs: IndexMap::new(),
            detail: None,
            started_at: SystemTime::now(),
            completed_at: SystemTime::now(),
            error: None,
        })
    }

    async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TaskResult {
            state: ResultState::Ready,
            outputs: IndexMap::new(),
            detail: None,
            started_at: SystemTime::now(),
            completed_at: SystemTime::now(),
            error: None,
        })
    }
}

fn run_action() -> ActionConfig {
    ActionConfig {
        kind: ActionKind::Run,
        name: "migrate".to_string(),
        type_name: "exec".to_string(),
        description: None,
        source: Some(SourceConfig { path: PathBuf::from(".") }),
        include: Vec::new(),
        exclude: Vec::new(),
        dependencies: Vec::new(),
        build: None,
        variables: Node::Object(Vec::new()),
        timeout: None,
        mode: ActionMode::default(),
        disabled: false,
        spec: Node::Object(Vec::new()),
        cache_exclude: Vec::new(),
        document_path: PathBuf::from("garden.yml"),
        render_inputs: None,
    }
}

fn base_context(root: &Path) -> Arc<dyn EvalContext> {
    Arc::new(garden_core::context::ProjectContext::new("demo", root.to_path_buf()))
}

#[tokio::test]
async fn second_run_is_served_from_the_result_cache() {
    let dir = TempDir::new().unwrap();
    let target = ActionRef::new(ActionKind::Run, "migrate");
    let calls = Arc::new(AtomicUsize::new(0));

    let graph = Arc::new(build_graph(vec![run_action()], dir.path(), &FilesystemHashProvider, &[], None).unwrap());

    let mut first_registry = PluginRegistry::new();
    first_registry.register(Arc::new(CountingExecPlugin { calls: Arc::clone(&calls) }));
    let env = CoreEnv::new(dir.path(), uuid::Uuid::nil());
    let first = Scheduler::new(Arc::clone(&graph), first_registry, env.clone(), EventBus::default());
    let first_result = first.run(Operation::Run, &[target.clone()], &HashSet::new(), base_context(dir.path())).await;
    assert!(first_result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut second_registry = PluginRegistry::new();
    second_registry.register(Arc::new(CountingExecPlugin { calls: Arc::clone(&calls) }));
    let second = Scheduler::new(Arc::clone(&graph), second_registry, env, EventBus::default());
    let second_result = second.run(Operation::Run, &[target], &HashSet::new(), base_context(dir.path())).await;

    assert!(second_result.success);
    assert_eq!(calls.load(Ordering::SeqCst), 1, "a fresh scheduler must read the on-disk cache rather than re-invoke the plugin");
}
