//! Version sensitivity property: an action's computed version changes when
//! a tracked source file's content changes, and is insensitive to files
//! excluded by its `exclude` globs.

use garden_core::action::{ActionConfig, SourceConfig};
use garden_core::core::model::{ActionKind, ActionMode};
use garden_core::core::vcs::FilesystemHashProvider;
use garden_core::graph::build_graph;
use garden_core::template::Node;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn action(include: Vec<String>, exclude: Vec<String>) -> ActionConfig {
    ActionConfig {
        kind: ActionKind::Build,
        name: "api".to_string(),
        type_name: "container".to_string(),
        description: None,
        source: Some(SourceConfig { path: PathBuf::from(".") }),
        include,
        exclude,
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

fn version_for(dir: &Path, include: Vec<String>, exclude: Vec<String>) -> String {
    let graph = build_graph(vec![action(include, exclude)], dir, &FilesystemHashProvider, &[], None).unwrap();
    let action_ref = garden_core::core::model::ActionRef::new(ActionKind::Build, "api");
    graph.version(&action_ref).unwrap().to_string()
}

#[test]
fn changing_tracked_file_content_changes_version() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();

    let before = version_for(dir.path(), vec!["Dockerfile".to_string()], vec![]);

    std::fs::write(dir.path().join("Dockerfile"), "FROM alpine:3.20\n").unwrap();
    let after = version_for(dir.path(), vec!["Dockerfile".to_string()], vec![]);

    assert_ne!(before, after);
}

#[test]
fn excluded_file_does_not_affect_version() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("Dockerfile"), "FROM alpine\n").unwrap();
    std::fs::write(dir.path().join("NOTES.md"), "first draft\n").unwrap();

    let before = version_for(dir.path(), vec!["**/*".to_string()], vec!["NOTES.md".to_string()]);

    std::fs::write(dir.path().join("NOTES.md"), "second draft, much longer\n").unwrap();
    let after = version_for(dir.path(), vec!["**/*".to_string()], vec!["NOTES.md".to_string()]);

    assert_eq!(before, after);
}
