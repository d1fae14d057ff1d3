//! Full pipeline: discover/parse a small project, convert its one legacy
//! module, build the graph, and drive it through the solver — checking
//! dependency ordering, the status-vs-process edge distinction, and
//! skip-on-disabled along the way.

use async_trait::async_trait;
use garden_core::convert::convert_modules;
use garden_core::core::env::CoreEnv;
use garden_core::core::error::GardenError;
use garden_core::core::model::{ActionKind, ActionRef};
use garden_core::core::vcs::FilesystemHashProvider;
use garden_core::graph::{build_graph, EdgeKind};
use garden_core::loader::load_project;
use garden_core::solver::scheduler::{Operation, Scheduler};
use garden_core::solver::{EventBus, Plugin, PluginRegistry, ResolvedAction, ResultState, TaskResult};
use garden_core::template::EvalContext;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use tempfile::TempDir;

fn write(dir: &Path, rel: &str, contents: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
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

struct AlwaysReady;

#[async_trait]
impl Plugin for AlwaysReady {
    fn type_name(&self) -> &str {
        "container"
    }
    async fn get_status(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(terminal(ResultState::NotReady))
    }
    async fn process(&self, _action: &ResolvedAction) -> Result<TaskResult, GardenError> {
        Ok(terminal(ResultState::Ready))
    }
}

fn scaffold_project(dir: &Path) {
    write(
        dir,
        "garden.yml",
        "kind: Project\nname: demo\ndefaultEnvironment: local\n---\nkind: Environment\nname: local\n",
    );
    write(
        dir,
        "base/garden.yml",
        "kind: Build\nname: base\ntype: container\nspec:\n  dockerfile: Dockerfile\n",
    );
    write(
        dir,
        "app/garden.yml",
        "kind: Module\nname: app\ntype: container\nsource:\n  path: .\ndependencies: [\"build.base\"]\nservices:\n  - name: app\n",
    );
}

#[tokio::test]
async fn builds_and_runs_a_converted_module_graph() {
    let dir = TempDir::new().unwrap();
    scaffold_project(dir.path());

    let loaded = load_project(dir.path(), None).unwrap();
    let mut actions = loaded.actions.clone();
    convert_modules(&loaded.modules, &mut actions, None).unwrap();

    let graph = build_graph(actions, dir.path(), &FilesystemHashProvider, &[], None).unwrap();

    let deploy_ref = ActionRef::new(ActionKind::Deploy, "app");
    let app_build_ref = ActionRef::new(ActionKind::Build, "app");
    let base_build_ref = ActionRef::new(ActionKind::Build, "base");

    let deploy_edges = graph.dependencies(&deploy_ref);
    assert!(deploy_edges.iter().any(|e| e.to == app_build_ref && e.kind == EdgeKind::Status));

    let app_build_edges = graph.dependencies(&app_build_ref);
    assert!(app_build_edges.iter().any(|e| e.to == base_build_ref && e.kind == EdgeKind::Status));

    let topo = graph.topo_order();
    let base_pos = topo.iter().position(|r| *r == base_build_ref).unwrap();
    let app_build_pos = topo.iter().position(|r| *r == app_build_ref).unwrap();
    let deploy_pos = topo.iter().position(|r| *r == deploy_ref).unwrap();
    assert!(base_pos < app_build_pos, "a dependency must precede its dependant in topological order");
    assert!(app_build_pos < deploy_pos, "a dependency must precede its dependant in topological order");

    let mut registry = PluginRegistry::new();
    registry.register(Arc::new(AlwaysReady));
    let env = CoreEnv::new(dir.path(), uuid::Uuid::nil());
    let scheduler = Scheduler::new(Arc::new(graph), registry, env, EventBus::default());

    let project_ctx: Arc<dyn EvalContext> =
        Arc::new(garden_core::context::ProjectContext::new("demo", dir.path().to_path_buf()));
    let result = scheduler
        .run(Operation::Deploy, &[deploy_ref.clone()], &HashSet::new(), project_ctx)
        .await;

    assert!(result.success);
    assert!(result.succeeded.contains(&base_build_ref));
    assert!(result.succeeded.contains(&app_build_ref));
    assert!(result.succeeded.contains(&deploy_ref));
}
