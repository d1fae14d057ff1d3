//! `RenderInputsContext` — adds `inputs.*` for an action produced by
//! expanding a `RenderTemplate`.
//!
//! Unlike the other scopes, the values here may themselves be
//! [`crate::template::TemplateValue::Unresolved`] (an input that templated
//! a dependency action's output): this context doesn't force them, it just
//! hands them back as-is, same as any other scope, so `${inputs.x}` re-uses
//! the ordinary unresolved/deep-evaluate machinery instead of needing its
//! own substitution pass at expansion time.

use crate::template::{EvalContext, Lookup, TemplateValue};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct RenderInputsContext {
    parent: Arc<dyn EvalContext>,
    inputs: IndexMap<String, TemplateValue>,
}

impl RenderInputsContext {
    #[must_use]
    pub fn new(parent: Arc<dyn EvalContext>, inputs: IndexMap<String, TemplateValue>) -> Self {
        Self { parent, inputs }
    }
}

impl EvalContext for RenderInputsContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        let [head, rest @ ..] = path else {
            return self.parent.lookup(path);
        };
        if head != "inputs" {
            return self.parent.lookup(path);
        }
        let Some((first, tail)) = rest.split_first() else {
            return Lookup::Absent;
        };
        let Some(mut current) = self.inputs.get(first).cloned() else {
            return Lookup::Absent;
        };
        for key in tail {
            match current {
                TemplateValue::Object(mut map) => match map.shift_remove(key) {
                    Some(v) => current = v,
                    None => return Lookup::Absent,
                },
                // Drilling into an unresolved or non-object input can't be
                // done statically; hand the whole thing back unresolved
                // rather than erroring, consistent with lookup's contract.
                _ => return Lookup::Found(current),
            }
        }
        Lookup::Found(current)
    }
}
