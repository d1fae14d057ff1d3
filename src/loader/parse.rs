//! Turns a [`RawDocument`] into a typed [`ConfigDocument`], evaluating the
//! fields each document kind needs resolved at load time (4.3) and leaving
//! `spec`/`variables` as raw [`Node`] trees for later stages.

use crate::action::{
    ActionConfig, CommandDoc, ConfigDocument, ConfigTemplateDoc, CopyFromEntry, EnvironmentDoc,
    ModuleDoc, ModuleServiceDoc, ModuleTaskDoc, ModuleTestDoc, ProjectDoc, ProviderDoc,
    RenderTemplateDoc, SourceConfig, WorkflowDoc,
};
use crate::core::error::GardenError;
use crate::core::model::{ActionKind, ActionMode, ActionRef};
use crate::context::ActionSpecContext;
use crate::loader::discover::RawDocument;
use crate::loader::fields::{self, eval_bool, eval_string, eval_string_list, eval_u64, field, object_entries};
use crate::template::{EvalContext, Node};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

fn doc_name(path: &std::path::Path, kind: &str) -> String {
    format!("{} ({kind})", path.display())
}

/// Parse a `"kind.name"` dependency reference.
fn parse_action_ref(s: &str, document: &str) -> Result<ActionRef, GardenError> {
    let (kind, name) = s.split_once('.').ok_or_else(|| GardenError::Configuration {
        document: document.to_string(),
        reason: format!("dependency '{s}' is not of the form 'kind.name'"),
    })?;
    let kind = ActionKind::from_str(kind).map_err(|reason| GardenError::Configuration {
        document: document.to_string(),
        reason,
    })?;
    Ok(ActionRef::new(kind, name.to_string()))
}

fn parse_dependencies(
    entries: &[(String, Node)],
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<Vec<ActionRef>, GardenError> {
    let Some(node) = field(entries, "dependencies") else {
        return Ok(Vec::new());
    };
    eval_string_list(node, ctx, document)?
        .iter()
        .map(|s| parse_action_ref(s, document))
        .collect()
}

fn parse_include_exclude(
    entries: &[(String, Node)],
    key: &str,
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<Vec<String>, GardenError> {
    match field(entries, key) {
        Some(node) => eval_string_list(node, ctx, document),
        None => Ok(Vec::new()),
    }
}

fn parse_source(
    entries: &[(String, Node)],
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<Option<SourceConfig>, GardenError> {
    let Some(node) = field(entries, "source") else {
        return Ok(None);
    };
    let sub = object_entries(node, document)?;
    let Some(path_node) = field(sub, "path") else {
        return Ok(None);
    };
    Ok(Some(SourceConfig {
        path: PathBuf::from(eval_string(path_node, ctx, document)?),
    }))
}

fn parse_cache_exclude(
    entries: &[(String, Node)],
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<Vec<String>, GardenError> {
    let Some(node) = field(entries, "cache") else {
        return Ok(Vec::new());
    };
    let sub = object_entries(node, document)?;
    match field(sub, "exclude") {
        Some(exclude_node) => eval_string_list(exclude_node, ctx, document),
        None => Ok(Vec::new()),
    }
}

/// Parse a `Build`/`Deploy`/`Run`/`Test` action document.
pub fn parse_action(
    kind: ActionKind,
    raw: &RawDocument,
    ctx: &Arc<dyn EvalContext>,
) -> Result<ActionConfig, GardenError> {
    let document = doc_name(&raw.path, kind.as_str_title());
    let entries = object_entries(&raw.node, &document)?;

    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "action document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let type_name = eval_string(
        field(entries, "type").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "action document is missing required field 'type'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let mode = match field(entries, "mode") {
        Some(node) => ActionMode::from_str(&eval_string(node, ctx, &document)?).map_err(|reason| {
            GardenError::Configuration {
                document: document.clone(),
                reason,
            }
        })?,
        None => ActionMode::default(),
    };

    let action_ctx: Arc<dyn EvalContext> = Arc::new(ActionSpecContext::new(Arc::clone(ctx), name.clone(), mode));

    let description = field(entries, "description")
        .map(|n| eval_string(n, &action_ctx, &document))
        .transpose()?;
    let source = parse_source(entries, &action_ctx, &document)?;
    let include = parse_include_exclude(entries, "include", &action_ctx, &document)?;
    let exclude = parse_include_exclude(entries, "exclude", &action_ctx, &document)?;
    let dependencies = parse_dependencies(entries, &action_ctx, &document)?;
    let build = field(entries, "build")
        .map(|n| eval_string(n, &action_ctx, &document))
        .transpose()?;
    let timeout = field(entries, "timeout")
        .map(|n| eval_u64(n, &action_ctx, &document))
        .transpose()?;
    let disabled = match field(entries, "disabled") {
        Some(node) => eval_bool(node, &action_ctx, &document)?,
        None => false,
    };
    let cache_exclude = parse_cache_exclude(entries, &action_ctx, &document)?;
    let variables = field(entries, "variables").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    let spec = field(entries, "spec")
        .cloned()
        .ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "action document is missing required field 'spec'".to_string(),
        })?;

    Ok(ActionConfig {
        kind,
        name,
        type_name,
        description,
        source,
        include,
        exclude,
        dependencies,
        build,
        variables,
        timeout,
        mode,
        disabled,
        spec,
        cache_exclude,
        document_path: raw.path.clone(),
        render_inputs: None,
    })
}

/// Parse a legacy `Module` document.
pub fn parse_module(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<ModuleDoc, GardenError> {
    let document = doc_name(&raw.path, "Module");
    let entries = object_entries(&raw.node, &document)?;

    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "module document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let type_name = eval_string(
        field(entries, "type").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "module document is missing required field 'type'".to_string(),
        })?,
        ctx,
        &document,
    )?;

    let description = field(entries, "description").map(|n| eval_string(n, ctx, &document)).transpose()?;
    let source_path = parse_source(entries, ctx, &document)?.map(|s| s.path);
    let include = parse_include_exclude(entries, "include", ctx, &document)?;
    let exclude = parse_include_exclude(entries, "exclude", ctx, &document)?;
    let dependencies = parse_dependencies(entries, ctx, &document)?;
    let build_spec = field(entries, "build").cloned().unwrap_or_else(|| Node::Object(Vec::new()));

    let copy_from = match field(entries, "copyFrom") {
        Some(Node::Array(items)) => items
            .iter()
            .map(|item| {
                let sub = object_entries(item, &document)?;
                let source = eval_string(
                    field(sub, "source").ok_or_else(|| GardenError::Configuration {
                        document: document.clone(),
                        reason: "'copyFrom' entry is missing 'source'".to_string(),
                    })?,
                    ctx,
                    &document,
                )?;
                let target = eval_string(
                    field(sub, "target").ok_or_else(|| GardenError::Configuration {
                        document: document.clone(),
                        reason: "'copyFrom' entry is missing 'target'".to_string(),
                    })?,
                    ctx,
                    &document,
                )?;
                Ok(CopyFromEntry { source, target })
            })
            .collect::<Result<Vec<_>, GardenError>>()?,
        _ => Vec::new(),
    };

    let services = parse_sub_list(entries, "services", ctx, &document, |name, deps, spec| ModuleServiceDoc {
        name,
        dependencies: deps,
        spec,
    })?;
    let tests = parse_sub_list(entries, "tests", ctx, &document, |name, deps, spec| ModuleTestDoc {
        name,
        dependencies: deps,
        spec,
    })?;
    let tasks = parse_sub_list(entries, "tasks", ctx, &document, |name, deps, spec| ModuleTaskDoc {
        name,
        dependencies: deps,
        spec,
    })?;

    Ok(ModuleDoc {
        name,
        type_name,
        description,
        source_path,
        include,
        exclude,
        dependencies,
        build_spec,
        copy_from,
        services,
        tests,
        tasks,
        document_path: raw.path.clone(),
        render_inputs: None,
    })
}

fn parse_sub_list<T>(
    entries: &[(String, Node)],
    key: &str,
    ctx: &Arc<dyn EvalContext>,
    document: &str,
    build: impl Fn(String, Vec<ActionRef>, Node) -> T,
) -> Result<Vec<T>, GardenError> {
    let Some(Node::Array(items)) = field(entries, key) else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .map(|item| {
            let sub = object_entries(item, document)?;
            let name = eval_string(
                field(sub, "name").ok_or_else(|| GardenError::Configuration {
                    document: document.to_string(),
                    reason: format!("a '{key}' entry is missing 'name'"),
                })?,
                ctx,
                document,
            )?;
            let deps = parse_dependencies(sub, ctx, document)?;
            let spec = item.clone();
            Ok(build(name, deps, spec))
        })
        .collect()
}

/// Parse a `Project` document.
pub fn parse_project(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<ProjectDoc, GardenError> {
    let document = doc_name(&raw.path, "Project");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Project document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let default_environment = field(entries, "defaultEnvironment").map(|n| eval_string(n, ctx, &document)).transpose()?;
    let variables = field(entries, "variables").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    let additional_source_roots = match field(entries, "sourceRoots") {
        Some(node) => fields::eval_string_list(node, ctx, &document)?.into_iter().map(PathBuf::from).collect(),
        None => Vec::new(),
    };
    let cache_exclude = parse_cache_exclude(entries, ctx, &document)?;

    Ok(ProjectDoc {
        name,
        default_environment,
        variables,
        additional_source_roots,
        cache_exclude,
    })
}

/// Parse an `Environment` document.
pub fn parse_environment(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<EnvironmentDoc, GardenError> {
    let document = doc_name(&raw.path, "Environment");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Environment document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let namespace = field(entries, "namespace").map(|n| eval_string(n, ctx, &document)).transpose()?;
    let variables = field(entries, "variables").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    let providers = match field(entries, "providers") {
        Some(node) => eval_string_list(node, ctx, &document)?,
        None => Vec::new(),
    };
    Ok(EnvironmentDoc {
        name,
        namespace,
        variables,
        providers,
    })
}

/// Parse a `Provider` document.
pub fn parse_provider(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<ProviderDoc, GardenError> {
    let document = doc_name(&raw.path, "Provider");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Provider document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let type_name = eval_string(
        field(entries, "type").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Provider document is missing required field 'type'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let environments = match field(entries, "environments") {
        Some(node) => eval_string_list(node, ctx, &document)?,
        None => Vec::new(),
    };
    let config = field(entries, "config").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    Ok(ProviderDoc {
        name,
        type_name,
        environments,
        config,
    })
}

/// Parse a `Workflow` document.
pub fn parse_workflow(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<WorkflowDoc, GardenError> {
    let document = doc_name(&raw.path, "Workflow");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Workflow document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let steps = field(entries, "steps").cloned().unwrap_or_else(|| Node::Array(Vec::new()));
    Ok(WorkflowDoc { name, steps })
}

/// Parse a `Command` document.
pub fn parse_command(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<CommandDoc, GardenError> {
    let document = doc_name(&raw.path, "Command");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "Command document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let spec = field(entries, "spec").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    Ok(CommandDoc { name, spec })
}

/// Parse a `ConfigTemplate` document. `configs` entries keep their own
/// `kind:` so expansion can dispatch them through the same per-kind
/// parsers once inputs are known.
pub fn parse_config_template(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<ConfigTemplateDoc, GardenError> {
    let document = doc_name(&raw.path, "ConfigTemplate");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "ConfigTemplate document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let inputs_schema = field(entries, "inputsSchema").cloned().unwrap_or_else(|| Node::Object(Vec::new()));
    let Some(Node::Array(raw_configs)) = field(entries, "configs") else {
        return Err(GardenError::Configuration {
            document,
            reason: "ConfigTemplate document is missing required array field 'configs'".to_string(),
        });
    };
    let mut configs = Vec::with_capacity(raw_configs.len());
    for config_node in raw_configs {
        let Node::Object(sub_entries) = config_node else {
            return Err(GardenError::Configuration {
                document,
                reason: "each 'configs' entry must be a mapping".to_string(),
            });
        };
        let kind_node = field(sub_entries, "kind").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "a 'configs' entry is missing 'kind'".to_string(),
        })?;
        // `kind` inside a template's configs is never itself templated off
        // inputs (it selects which parser to dispatch to), so it can be
        // read as a plain literal.
        let Node::Literal(kind) = kind_node else {
            return Err(GardenError::Configuration {
                document,
                reason: "a 'configs' entry's 'kind' must be a plain string".to_string(),
            });
        };
        let kind = kind.clone();
        configs.push((kind, config_node.clone()));
    }
    Ok(ConfigTemplateDoc {
        name,
        inputs_schema,
        configs,
        document_path: raw.path.clone(),
    })
}

/// Parse a `RenderTemplate` document. `inputs` stays raw so an input
/// referencing a dependency action's output can stay unresolved until
/// that dependency is known.
pub fn parse_render_template(raw: &RawDocument, ctx: &Arc<dyn EvalContext>) -> Result<RenderTemplateDoc, GardenError> {
    let document = doc_name(&raw.path, "RenderTemplate");
    let entries = object_entries(&raw.node, &document)?;
    let name = eval_string(
        field(entries, "name").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "RenderTemplate document is missing required field 'name'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let template = eval_string(
        field(entries, "template").ok_or_else(|| GardenError::Configuration {
            document: document.clone(),
            reason: "RenderTemplate document is missing required field 'template'".to_string(),
        })?,
        ctx,
        &document,
    )?;
    let inputs = match field(entries, "inputs") {
        Some(Node::Object(entries)) => entries.clone(),
        Some(_) => {
            return Err(GardenError::Configuration {
                document,
                reason: "'inputs' must be a mapping".to_string(),
            });
        }
        None => Vec::new(),
    };
    Ok(RenderTemplateDoc {
        name,
        template,
        inputs,
        document_path: raw.path.clone(),
    })
}
