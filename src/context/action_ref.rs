//! `ActionRefContext` — adds `actions.<kind>.<name>.outputs` and
//! `actions.<kind>.<name>.version`.
//!
//! The set of visible sibling actions is fixed at construction time by the
//! Graph Builder, which only wires in the actions a given action actually
//! declares a dependency on (or implicitly references) — this is how
//! "restricted by action kind" from the data model is enforced: the
//! context itself is just a lookup table over whatever it was given.

use crate::core::model::ActionRef;
use crate::template::{EvalContext, Lookup, TemplateValue};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;

/// The resolved outputs and version of one visible sibling action.
#[derive(Debug, Clone)]
pub struct ActionOutputs {
    pub outputs: IndexMap<String, TemplateValue>,
    pub version: String,
}

#[derive(Debug)]
pub struct ActionRefContext {
    parent: Arc<dyn EvalContext>,
    visible: HashMap<ActionRef, ActionOutputs>,
}

impl ActionRefContext {
    #[must_use]
    pub fn new(parent: Arc<dyn EvalContext>, visible: HashMap<ActionRef, ActionOutputs>) -> Self {
        Self { parent, visible }
    }
}

impl EvalContext for ActionRefContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        let [head, kind, name, rest @ ..] = path else {
            return self.parent.lookup(path);
        };
        if head != "actions" {
            return self.parent.lookup(path);
        }
        let Ok(kind) = kind.parse() else {
            return Lookup::Absent;
        };
        let Some(entry) = self.visible.get(&ActionRef::new(kind, name.clone())) else {
            return Lookup::Absent;
        };
        match rest {
            [field] if field == "version" => {
                Lookup::Found(TemplateValue::String(entry.version.clone()))
            }
            [field] if field == "outputs" => {
                Lookup::Found(TemplateValue::Object(entry.outputs.clone()))
            }
            ["outputs", keys @ ..] => {
                let Some((first, tail)) = keys.split_first() else {
                    return Lookup::Absent;
                };
                let Some(mut current) = entry.outputs.get(first).cloned() else {
                    return Lookup::Absent;
                };
                for key in tail {
                    match current {
                        TemplateValue::Object(mut map) => match map.shift_remove(key) {
                            Some(v) => current = v,
                            None => return Lookup::Absent,
                        },
                        _ => return Lookup::Absent,
                    }
                }
                Lookup::Found(current)
            }
            _ => Lookup::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::project::ProjectContext;
    use crate::core::model::ActionKind;
    use std::path::PathBuf;

    fn root() -> Arc<dyn EvalContext> {
        Arc::new(ProjectContext::new("demo", PathBuf::from("/srv/demo")))
    }

    #[test]
    fn resolves_dependency_output_and_version() {
        let mut outputs = IndexMap::new();
        outputs.insert("imageId".to_string(), TemplateValue::String("sha256:abc".into()));
        let mut visible = HashMap::new();
        visible.insert(
            ActionRef::new(ActionKind::Build, "api"),
            ActionOutputs {
                outputs,
                version: "v-deadbeef".to_string(),
            },
        );
        let ctx = ActionRefContext::new(root(), visible);

        let outputs_path = ["actions", "build", "api", "outputs", "imageId"].map(str::to_string).to_vec();
        assert!(matches!(
            ctx.lookup(&outputs_path),
            Lookup::Found(TemplateValue::String(ref s)) if s == "sha256:abc"
        ));

        let version_path = ["actions", "build", "api", "version"].map(str::to_string).to_vec();
        assert!(matches!(
            ctx.lookup(&version_path),
            Lookup::Found(TemplateValue::String(ref s)) if s == "v-deadbeef"
        ));
    }

    #[test]
    fn action_not_wired_in_is_absent() {
        let ctx = ActionRefContext::new(root(), HashMap::new());
        let path = ["actions", "build", "api", "outputs", "imageId"].map(str::to_string).to_vec();
        assert!(matches!(ctx.lookup(&path), Lookup::Absent));
    }
}
