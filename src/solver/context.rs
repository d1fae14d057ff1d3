//! Builds the per-action `Resolve` context (4.6): layers an
//! [`ActionRefContext`] restricted to exactly the sibling actions this
//! action declares or implicitly references, an optional
//! [`RenderInputsContext`] for actions expanded from a `RenderTemplate`,
//! and an [`ActionSpecContext`] for `this.name`/`this.mode`, on top of
//! whatever project/environment/provider context the caller already
//! built.

use crate::action::ActionConfig;
use crate::context::{ActionOutputs, ActionRefContext, ActionSpecContext, RenderInputsContext};
use crate::core::model::ActionRef;
use crate::graph::Graph;
use crate::template::EvalContext;
use std::collections::HashMap;
use std::sync::Arc;

/// Build the context a `Resolve(action)` task should evaluate `spec`/
/// `variables` against, given the outputs the scheduler has already
/// produced for `action`'s dependencies (both declared and implicit; a
/// dependency not yet processed is simply absent from `outputs`, which
/// `ActionRefContext` reports as `Lookup::Absent` rather than an error —
/// callers only invoke this once every dependency this action's edges
/// actually require has already completed).
#[must_use]
pub fn build_resolve_context(
    base: Arc<dyn EvalContext>,
    action: &ActionConfig,
    graph: &Graph,
    outputs: &HashMap<ActionRef, ActionOutputs>,
) -> Arc<dyn EvalContext> {
    let action_ref = action.action_ref();
    let mut visible: HashMap<ActionRef, ActionOutputs> = HashMap::new();
    for edge in graph.dependencies(&action_ref) {
        if let Some(entry) = outputs.get(&edge.to) {
            visible.insert(edge.to.clone(), entry.clone());
        }
    }

    let ctx: Arc<dyn EvalContext> = Arc::new(ActionRefContext::new(base, visible));
    let ctx: Arc<dyn EvalContext> = match &action.render_inputs {
        Some(inputs) => Arc::new(RenderInputsContext::new(ctx, inputs.clone())),
        None => ctx,
    };
    Arc::new(ActionSpecContext::new(ctx, action.name.clone(), action.mode))
}
