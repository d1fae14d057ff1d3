//! Determinism property: building the same action set twice, supplied in
//! a different order, produces identical versions for every action
//! (dependency versions are folded in topological order regardless of
//! input order).

use garden_core::action::{ActionConfig, SourceConfig};
use garden_core::core::model::{ActionKind, ActionMode, ActionRef};
use garden_core::core::vcs::FilesystemHashProvider;
use garden_core::graph::build_graph;
use garden_core::template::Node;
use std::path::PathBuf;
use tempfile::TempDir;

fn build(name: &str, deps: Vec<ActionRef>) -> ActionConfig {
    ActionConfig {
        kind: ActionKind::Build,
        name: name.to_string(),
        type_name: "container".to_string(),
        description: None,
        source: Some(SourceConfig { path: PathBuf::from(".") }),
        include: vec!["Dockerfile".to_string()],
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

#[test]
fn input_order_does_not_affect_computed_versions() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();

    let base = build("base", Vec::new());
    let api = build("api", vec![ActionRef::new(ActionKind::Build, "base")]);

    let forward = build_graph(vec![base.clone(), api.clone()], dir.path(), &FilesystemHashProvider, &[], None).unwrap();
    let reversed = build_graph(vec![api, base], dir.path(), &FilesystemHashProvider, &[], None).unwrap();

    let base_ref = ActionRef::new(ActionKind::Build, "base");
    let api_ref = ActionRef::new(ActionKind::Build, "api");

    assert_eq!(forward.version(&base_ref), reversed.version(&base_ref));
    assert_eq!(forward.version(&api_ref), reversed.version(&api_ref));
}
