//! The Config Loader & Templater (4.3): discovers every `garden.yml`
//! document under a project root, parses each into its typed
//! [`crate::action`] document, expands `ConfigTemplate`/`RenderTemplate`
//! pairs, and hands back a [`LoadedProject`] ready for the Module->Action
//! Converter (C4) and Graph Builder (C5).

pub mod context;
pub mod discover;
pub mod fields;
pub mod parse;
pub mod templater;

use crate::action::{
    ActionConfig, CommandDoc, ConfigTemplateDoc, EnvironmentDoc, ModuleDoc, ProjectDoc,
    ProviderDoc, RenderTemplateDoc, WorkflowDoc,
};
use crate::core::error::GardenError;
use crate::core::model::ActionKind;
use discover::RawDocument;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

/// Everything discovered and parsed out of a project's config documents,
/// before Module->Action conversion (C4) or graph construction (C5).
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub project: ProjectDoc,
    pub environment: EnvironmentDoc,
    pub providers: Vec<ProviderDoc>,
    pub workflows: Vec<WorkflowDoc>,
    pub commands: Vec<CommandDoc>,
    pub actions: Vec<ActionConfig>,
    pub modules: Vec<ModuleDoc>,
}

/// Discover, parse, and expand every config document under `root`,
/// selecting `environment_name` (or the project's `defaultEnvironment`
/// when `None`).
pub fn load_project(root: &Path, environment_name: Option<&str>) -> Result<LoadedProject, GardenError> {
    let bootstrap = context::bootstrap_context(root);

    let raw_docs = discover::discover(root, &[])?;

    let project_raw = find_one(&raw_docs, "Project")?.ok_or_else(|| GardenError::Configuration {
        document: root.display().to_string(),
        reason: "no Project document found".to_string(),
    })?;
    let project = parse::parse_project(project_raw, &bootstrap)?;

    // Additional source roots may themselves hold config documents, so
    // re-discover including them before parsing anything else.
    let raw_docs = if project.additional_source_roots.is_empty() {
        raw_docs
    } else {
        discover::discover(root, &project.additional_source_roots)?
    };

    let environment_docs: Vec<&RawDocument> = find_all(&raw_docs, "Environment");
    let selected_name = environment_name
        .map(str::to_string)
        .or_else(|| project.default_environment.clone())
        .ok_or_else(|| GardenError::Configuration {
            document: root.display().to_string(),
            reason: "no environment selected and project declares no defaultEnvironment".to_string(),
        })?;
    let environment_raw = environment_docs
        .iter()
        .find(|raw| matches_name(raw, &selected_name, &bootstrap).unwrap_or(false))
        .ok_or_else(|| GardenError::Configuration {
            document: root.display().to_string(),
            reason: format!("no Environment document named '{selected_name}'"),
        })?;
    let environment = parse::parse_environment(environment_raw, &bootstrap)?;

    let ctx = context::build_load_context(root, &project, &environment)?;

    let mut providers = Vec::new();
    for raw in find_all(&raw_docs, "Provider") {
        let provider = parse::parse_provider(raw, &ctx)?;
        if provider.environments.is_empty() || provider.environments.iter().any(|e| e == &environment.name) {
            providers.push(provider);
        }
    }

    let mut workflows = Vec::new();
    for raw in find_all(&raw_docs, "Workflow") {
        workflows.push(parse::parse_workflow(raw, &ctx)?);
    }

    let mut commands = Vec::new();
    for raw in find_all(&raw_docs, "Command") {
        commands.push(parse::parse_command(raw, &ctx)?);
    }

    let mut config_templates: Vec<ConfigTemplateDoc> = Vec::new();
    for raw in find_all(&raw_docs, "ConfigTemplate") {
        config_templates.push(parse::parse_config_template(raw, &ctx)?);
    }

    let mut render_templates: Vec<RenderTemplateDoc> = Vec::new();
    for raw in find_all(&raw_docs, "RenderTemplate") {
        render_templates.push(parse::parse_render_template(raw, &ctx)?);
    }

    let mut actions = Vec::new();
    let mut modules = Vec::new();
    for raw in &raw_docs {
        if let Ok(kind) = ActionKind::from_str(&raw.kind) {
            actions.push(parse::parse_action(kind, raw, &ctx)?);
        } else if raw.kind == "Module" {
            modules.push(parse::parse_module(raw, &ctx)?);
        }
    }

    templater::expand(&render_templates, &config_templates, &ctx, &mut actions, &mut modules)?;

    Ok(LoadedProject {
        project,
        environment,
        providers,
        workflows,
        commands,
        actions,
        modules,
    })
}

fn find_one<'a>(docs: &'a [RawDocument], kind: &str) -> Result<Option<&'a RawDocument>, GardenError> {
    let mut matches = docs.iter().filter(|d| d.kind == kind);
    let first = matches.next();
    if matches.next().is_some() {
        return Err(GardenError::Configuration {
            document: kind.to_string(),
            reason: format!("more than one {kind} document found; only one is permitted"),
        });
    }
    Ok(first)
}

fn find_all<'a>(docs: &'a [RawDocument], kind: &str) -> Vec<&'a RawDocument> {
    docs.iter().filter(|d| d.kind == kind).collect()
}

/// Cheaply check whether a raw `Environment` document's `name` field
/// (fully evaluated against the bootstrap context) matches `name`,
/// without fully parsing the document.
fn matches_name(raw: &RawDocument, name: &str, ctx: &Arc<dyn crate::template::EvalContext>) -> Result<bool, GardenError> {
    let document = format!("{} (Environment)", raw.path.display());
    let entries = fields::object_entries(&raw.node, &document)?;
    let Some(node) = fields::field(entries, "name") else {
        return Ok(false);
    };
    Ok(fields::eval_string(node, ctx, &document)? == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn loads_a_minimal_project() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "garden.yml",
            "kind: Project\nname: demo\ndefaultEnvironment: local\n---\nkind: Environment\nname: local\n",
        );
        write(
            dir.path(),
            "api/garden.yml",
            "kind: Build\nname: api\ntype: container\nspec:\n  dockerfile: Dockerfile\n",
        );

        let loaded = load_project(dir.path(), None).unwrap();
        assert_eq!(loaded.project.name, "demo");
        assert_eq!(loaded.environment.name, "local");
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(loaded.actions[0].name, "api");
    }

    #[test]
    fn missing_environment_selection_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "garden.yml", "kind: Project\nname: demo\n---\nkind: Environment\nname: local\n");

        let err = load_project(dir.path(), None).unwrap_err();
        assert!(matches!(err, GardenError::Configuration { .. }));
    }

    #[test]
    fn expands_render_template_into_a_named_action() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "garden.yml",
            "kind: Project\nname: demo\ndefaultEnvironment: local\n---\nkind: Environment\nname: local\n",
        );
        write(
            dir.path(),
            "templates/garden.yml",
            "kind: ConfigTemplate\nname: web-service\ninputsSchema: {}\nconfigs:\n  - kind: Build\n    name: image\n    type: container\n    spec:\n      dockerfile: \"${inputs.dockerfile}\"\n",
        );
        write(
            dir.path(),
            "app/garden.yml",
            "kind: RenderTemplate\nname: checkout\ntemplate: web-service\ninputs:\n  dockerfile: Dockerfile.checkout\n",
        );

        let loaded = load_project(dir.path(), None).unwrap();
        assert_eq!(loaded.actions.len(), 1);
        assert_eq!(loaded.actions[0].name, "checkout-image");
        assert!(loaded.actions[0].render_inputs.is_some());
    }
}
