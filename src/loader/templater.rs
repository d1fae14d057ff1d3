//! Config template expansion (4.3): pairs each `RenderTemplate` with its
//! named `ConfigTemplate` and expands `configs` into concrete action and
//! module documents, substituting nothing at the AST level — instead, the
//! render's resolved inputs are threaded through as an extra
//! [`crate::context::RenderInputsContext`] layer so a `${inputs.x}`
//! reference that can't yet be computed (because `x` itself templates a
//! dependency action's output) is preserved as an ordinary unresolved
//! value rather than forced to resolve now.

use crate::action::{ActionConfig, ConfigTemplateDoc, ModuleDoc, RenderTemplateDoc};
use crate::context::RenderInputsContext;
use crate::core::error::GardenError;
use crate::core::model::ActionKind;
use crate::loader::discover::RawDocument;
use crate::loader::parse;
use crate::template::{self, EvalContext, Node, TemplateValue};
use indexmap::IndexMap;
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

/// Evaluate a `RenderTemplate`'s raw `inputs` entries against `ctx`,
/// allowing partiality so an input referencing a not-yet-known dependency
/// output stays `Unresolved` rather than erroring.
fn eval_inputs(
    inputs: &[(String, Node)],
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<IndexMap<String, TemplateValue>, GardenError> {
    let mut out = IndexMap::with_capacity(inputs.len());
    for (key, node) in inputs {
        let value = template::evaluate(node, ctx, true, document).map_err(|e| template::to_garden_error(&e))?;
        out.insert(key.clone(), value);
    }
    Ok(out)
}

/// Expand every `RenderTemplate` document against its `ConfigTemplate`,
/// appending the generated actions/modules to `actions`/`modules`.
/// `ctx` is the project's load-time context (Project -> Environment ->
/// Provider, per [`crate::loader::context::build_load_context`]).
pub fn expand(
    render_templates: &[RenderTemplateDoc],
    config_templates: &[ConfigTemplateDoc],
    ctx: &Arc<dyn EvalContext>,
    actions: &mut Vec<ActionConfig>,
    modules: &mut Vec<ModuleDoc>,
) -> Result<(), GardenError> {
    let mut seen: HashSet<(ActionKind, String)> = actions.iter().map(|a| (a.kind, a.name.clone())).collect();
    let mut seen_modules: HashSet<String> = modules.iter().map(|m| m.name.clone()).collect();

    for render in render_templates {
        let document = format!("{} (RenderTemplate)", render.document_path.display());
        let template = config_templates
            .iter()
            .find(|t| t.name == render.template)
            .ok_or_else(|| GardenError::Configuration {
                document: document.clone(),
                reason: format!("RenderTemplate '{}' references unknown ConfigTemplate '{}'", render.name, render.template),
            })?;

        let inputs = eval_inputs(&render.inputs, ctx, &document)?;
        let render_ctx: Arc<dyn EvalContext> = Arc::new(RenderInputsContext::new(Arc::clone(ctx), inputs.clone()));

        for (kind, config_node) in &template.configs {
            let synthetic = RawDocument {
                kind: kind.clone(),
                node: config_node.clone(),
                path: template.document_path.clone(),
            };

            if kind == "Module" {
                let mut module = parse::parse_module(&synthetic, &render_ctx)?;
                module.name = format!("{}-{}", render.name, module.name);
                module.render_inputs = Some(inputs.clone());
                if !seen_modules.insert(module.name.clone()) {
                    return Err(GardenError::Configuration {
                        document,
                        reason: format!("render '{}' produced a module name collision: '{}'", render.name, module.name),
                    });
                }
                modules.push(module);
                continue;
            }

            let action_kind = ActionKind::from_str(kind).map_err(|reason| GardenError::Configuration {
                document: document.clone(),
                reason,
            })?;
            let mut action = parse::parse_action(action_kind, &synthetic, &render_ctx)?;
            action.name = format!("{}-{}", render.name, action.name);
            action.render_inputs = Some(inputs.clone());
            if !seen.insert((action.kind, action.name.clone())) {
                return Err(GardenError::Configuration {
                    document,
                    reason: format!(
                        "render '{}' produced a name collision: '{}.{}'",
                        render.name, action.kind, action.name
                    ),
                });
            }
            actions.push(action);
        }
    }
    Ok(())
}
