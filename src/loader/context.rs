//! Builds the load-time evaluation context: `Project -> Environment ->
//! Provider`, with no `ActionRefContext` layer — per the field-resolution-
//! staging rule (4.3/4.5), the loader and the Graph Builder's preprocess
//! step never let a structural field see another action's outputs.

use crate::action::{EnvironmentDoc, ProjectDoc};
use crate::context::{EnvironmentContext, ProjectContext, ProviderContext};
use crate::core::error::GardenError;
use crate::loader::fields;
use crate::template::{EvalContext, Node, TemplateValue};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;

/// A minimal context (process environment only) used to evaluate a
/// `Project`/`Environment`/`Provider` document's own identity fields,
/// before the real project context can exist.
#[must_use]
pub fn bootstrap_context(root: &Path) -> Arc<dyn EvalContext> {
    Arc::new(ProjectContext::new(String::new(), root.to_path_buf()).with_process_env())
}

fn eval_vars(node: &Node, ctx: &Arc<dyn EvalContext>, document: &str) -> Result<IndexMap<String, TemplateValue>, GardenError> {
    match fields::eval(node, ctx, document)? {
        TemplateValue::Object(map) => Ok(map),
        TemplateValue::Null => Ok(IndexMap::new()),
        other => Err(GardenError::Configuration {
            document: document.to_string(),
            reason: format!("expected a mapping, found {}", other.type_name()),
        }),
    }
}

/// Build the full `Project -> Environment -> Provider` chain used to
/// evaluate every other document's structural fields.
pub fn build_load_context(
    root: &Path,
    project: &ProjectDoc,
    environment: &EnvironmentDoc,
) -> Result<Arc<dyn EvalContext>, GardenError> {
    let project_ctx: Arc<dyn EvalContext> =
        Arc::new(ProjectContext::new(project.name.clone(), root.to_path_buf()).with_process_env());

    let project_vars = eval_vars(&project.variables, &project_ctx, "project.variables")?;

    let staging: Arc<dyn EvalContext> = Arc::new(
        EnvironmentContext::new(Arc::clone(&project_ctx), environment.name.clone())
            .with_variables(project_vars.clone()),
    );
    let env_vars = eval_vars(&environment.variables, &staging, "environment.variables")?;

    let mut merged = project_vars;
    for (k, v) in env_vars {
        merged.insert(k, v);
    }

    let mut env_ctx = EnvironmentContext::new(project_ctx, environment.name.clone()).with_variables(merged);
    if let Some(namespace) = &environment.namespace {
        env_ctx = env_ctx.with_namespace(namespace.clone());
    }
    Ok(Arc::new(ProviderContext::new(Arc::new(env_ctx))))
}
