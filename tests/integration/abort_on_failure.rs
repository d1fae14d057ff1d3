//! Abort-on-failure cascading: A -> B -> C, where B's `process` fails.
//! B's failure must cancel C (its dependant) but never touches an
//! unrelated sibling D with no path to B.

use async_trait::async_trait;
use garden_core::action::{ActionConfig, SourceConfig};
use garden_core::core::env::CoreEnv;
use garden_core::core::error::GardenError;
use garden_core::core::model::{ActionKind, ActionMode, ActionRef};
use garden_core::core::vcs::{FilesystemHashProvider, TrackedFile, VcsHashProvider};
use garden_core::graph::build_graph;
use garden_core::solver::scheduler::{Operation, Scheduler};
use garden_core::solver::{EventBus, Plugin, PluginRegistry, ResolvedAction, ResultState, TaskResult};
use garden_core::template::{EvalContext, Node};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

struct NoFiles;
impl VcsHashProvider for NoFiles {
    fn tracked_files(&self, _root: &Path, _include: &[String], _exclude: &[String]) -> Result<Vec<TrackedFile>, GardenError> {
        Ok(Vec::new())
    }
}

fn terminal(state: ResultState) -> TaskResult {
    TaskResult {
        state,
        outputs: IndexMap::new(),
        detail: None,
        started_at: SystemTime::now(),
        completed_at: SystemTime::now(),
        error: None,
    }
}

struct FailingPlugin;

#[async_trait]
impl Plugin for FailingPlugin {
    fn type_name(&self) -> &str {
        "bad"
    }
    async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(terminal(ResultState::NotReady))
    }
    async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Err(GardenError::Plugin {
            kind: "build".to_string(),
            name: "b".to_string(),
            reason: "compile error".to_string(),
        })
    }
}

struct SucceedingPlugin;

#[async_trait]
impl Plugin for SucceedingPlugin {
    fn type_name(&self) -> &str {
        "good"
    }
    async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(terminal(ResultState::NotReady))
    }
    async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(terminal(ResultState::Ready))
    }
}

fn action(name: &str, type_name: &str, deps: Vec<ActionRef>) -> ActionConfig {
    ActionConfig {
        kind: ActionKind::Build,
        name: name.to_string(),
        type_name: type_name.to_string(),
        description: None,
        source: Some(SourceConfig { path: PathBuf::from(".") }),
        include: Vec::new(),
        exclude: Vec::new(),
        dependencies: deps,
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

#[tokio::test]
async fn failure_cancels_dependant_but_not_unrelated_sibling() {
    let a = action("a", "good", Vec::new());
    let b = action("b", "bad", vec![ActionRef::new(ActionKind::Build, "a")]);
    let c = action("c", "good", vec![ActionRef::new(ActionKind::Build, "b")]);
    let d = action("d", "good", Vec::new());

    let graph = Arc::new(build_graph(vec![a, b, c, d], Path::new("/tmp"), &NoFiles, &[], None).unwrap());

    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(SucceedingPlugin));
    registry.register(Arc::new(FailingPlugin));
    let env = CoreEnv::new("/tmp", uuid::Uuid::nil());
    let scheduler = Scheduler::new(Arc::clone(&graph), registry, env, EventBus::default());

    let a_ref = ActionRef::new(ActionKind::Build, "a");
    let b_ref = ActionRef::new(ActionKind::Build, "b");
    let c_ref = ActionRef::new(ActionKind::Build, "c");
    let d_ref = ActionRef::new(ActionKind::Build, "d");

    let ctx: Arc<dyn EvalContext> = Arc::new(garden_core::context::ProjectContext::new("demo", PathBuf::from("/tmp")));
    let result = scheduler
        .run(Operation::Build, &[c_ref.clone(), d_ref.clone()], &HashSet::new(), ctx)
        .await;

    assert!(!result.success);
    assert!(result.succeeded.contains(&a_ref), "a has no failing dependency and must succeed");
    assert!(result.failed.contains(&b_ref), "b's own process failed");
    assert!(result.cancelled.contains(&c_ref), "c depends on failed b and must be cancelled, not processed");
    assert!(result.succeeded.contains(&d_ref), "d shares no path with the failure and must still succeed");
}
