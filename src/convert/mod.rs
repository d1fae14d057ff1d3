//! Module->Action Converter (4.4): fans a legacy `Module` document out into
//! the native actions it implies — one `Build`, one `Deploy` per service,
//! one `Test` per test config, one `Run` per task config — so the Graph
//! Builder (C5) only ever has to deal with native [`ActionConfig`]s.

use crate::action::{ActionConfig, ModuleDoc, SourceConfig};
use crate::core::error::GardenError;
use crate::core::model::{ActionKind, ActionMode, ActionRef};
use crate::template::Node;
use std::collections::HashSet;

/// A plugin's override of the default fan-out for one module type. Modeled
/// as a plain function pointer here; the Solver's `Plugin` trait exposes
/// the same shape as an optional `convert` method (see `solver::plugin`).
pub type ConvertHook = fn(&ModuleDoc) -> Option<Vec<ActionConfig>>;

/// Convert every module in `modules` into native actions and append them to
/// `actions`, calling `hook` (if any) first so a plugin can override the
/// default fan-out for its own module types. Fails if a converted action's
/// `(kind, name)` collides with an action already in `actions` (native
/// action documents take priority in the error message, per 4.4's "name
/// collisions... are hard errors").
pub fn convert_modules(
    modules: &[ModuleDoc],
    actions: &mut Vec<ActionConfig>,
    hook: Option<ConvertHook>,
) -> Result<(), GardenError> {
    let mut seen: HashSet<(ActionKind, String)> = actions.iter().map(|a| (a.kind, a.name.clone())).collect();

    for module in modules {
        let converted = hook
            .and_then(|f| f(module))
            .unwrap_or_else(|| default_fan_out(module));

        for action in converted {
            let key = (action.kind, action.name.clone());
            if !seen.insert(key) {
                return Err(GardenError::Configuration {
                    document: module.document_path.display().to_string(),
                    reason: format!(
                        "module '{}' converts to '{}.{}', which collides with an existing action",
                        module.name, action.kind, action.name
                    ),
                });
            }
            actions.push(action);
        }
    }
    Ok(())
}

/// The default fan-out described in 4.4: a Build carrying the module's
/// source and `copyFrom` directives, one Deploy per service (depending on
/// the Build plus its own explicit dependencies), one Test per test entry,
/// one Run per task entry.
fn default_fan_out(module: &ModuleDoc) -> Vec<ActionConfig> {
    let mut out = Vec::new();

    let has_build = !module.copy_from.is_empty() || !matches!(&module.build_spec, Node::Object(entries) if entries.is_empty());
    let build_name = module.name.clone();

    if has_build || module.source_path.is_some() {
        out.push(ActionConfig {
            kind: ActionKind::Build,
            name: build_name.clone(),
            type_name: module.type_name.clone(),
            description: module.description.clone(),
            source: module.source_path.clone().map(|path| SourceConfig { path }),
            include: module.include.clone(),
            exclude: module.exclude.clone(),
            dependencies: module.dependencies.clone(),
            build: None,
            variables: Node::Object(Vec::new()),
            timeout: None,
            mode: ActionMode::default(),
            disabled: false,
            spec: copy_from_spec(module),
            cache_exclude: Vec::new(),
            document_path: module.document_path.clone(),
            render_inputs: module.render_inputs.clone(),
        });
    }

    for service in &module.services {
        let mut dependencies = service.dependencies.clone();
        if has_build || module.source_path.is_some() {
            dependencies.push(ActionRef::new(ActionKind::Build, build_name.clone()));
        }
        out.push(ActionConfig {
            kind: ActionKind::Deploy,
            name: service.name.clone(),
            type_name: module.type_name.clone(),
            description: None,
            source: None,
            include: Vec::new(),
            exclude: Vec::new(),
            dependencies,
            build: (has_build || module.source_path.is_some()).then(|| build_name.clone()),
            variables: Node::Object(Vec::new()),
            timeout: None,
            mode: ActionMode::default(),
            disabled: false,
            spec: service.spec.clone(),
            cache_exclude: Vec::new(),
            document_path: module.document_path.clone(),
            render_inputs: module.render_inputs.clone(),
        });
    }

    for test in &module.tests {
        let mut dependencies = test.dependencies.clone();
        if has_build || module.source_path.is_some() {
            dependencies.push(ActionRef::new(ActionKind::Build, build_name.clone()));
        }
        out.push(ActionConfig {
            kind: ActionKind::Test,
            name: test.name.clone(),
            type_name: module.type_name.clone(),
            description: None,
            source: None,
            include: Vec::new(),
            exclude: Vec::new(),
            dependencies,
            build: (has_build || module.source_path.is_some()).then(|| build_name.clone()),
            variables: Node::Object(Vec::new()),
            timeout: None,
            mode: ActionMode::default(),
            disabled: false,
            spec: test.spec.clone(),
            cache_exclude: Vec::new(),
            document_path: module.document_path.clone(),
            render_inputs: module.render_inputs.clone(),
        });
    }

    for task in &module.tasks {
        let mut dependencies = task.dependencies.clone();
        if has_build || module.source_path.is_some() {
            dependencies.push(ActionRef::new(ActionKind::Build, build_name.clone()));
        }
        out.push(ActionConfig {
            kind: ActionKind::Run,
            name: task.name.clone(),
            type_name: module.type_name.clone(),
            description: None,
            source: None,
            include: Vec::new(),
            exclude: Vec::new(),
            dependencies,
            build: (has_build || module.source_path.is_some()).then(|| build_name.clone()),
            variables: Node::Object(Vec::new()),
            timeout: None,
            mode: ActionMode::default(),
            disabled: false,
            spec: task.spec.clone(),
            cache_exclude: Vec::new(),
            document_path: module.document_path.clone(),
            render_inputs: module.render_inputs.clone(),
        });
    }

    out
}

/// Merge the module's `build` spec with its `copyFrom` directives, under a
/// `copyFrom` key the Build plugin is expected to understand, exactly like
/// any other plugin-opaque `spec` field.
fn copy_from_spec(module: &ModuleDoc) -> Node {
    let mut entries = match &module.build_spec {
        Node::Object(entries) => entries.clone(),
        other => vec![("value".to_string(), other.clone())],
    };
    if !module.copy_from.is_empty() {
        let copy_from_items = module
            .copy_from
            .iter()
            .map(|entry| {
                Node::Object(vec![
                    ("source".to_string(), Node::Literal(entry.source.clone())),
                    ("target".to_string(), Node::Literal(entry.target.clone())),
                ])
            })
            .collect();
        entries.push(("copyFrom".to_string(), Node::Array(copy_from_items)));
    }
    Node::Object(entries)
}
