//! `ActionSpecContext` — the innermost scope, adding `this.mode` and
//! `this.name` for the action whose `spec` is currently being resolved.

use crate::core::model::ActionMode;
use crate::template::{EvalContext, Lookup, TemplateValue};
use std::sync::Arc;

#[derive(Debug)]
pub struct ActionSpecContext {
    parent: Arc<dyn EvalContext>,
    name: String,
    mode: ActionMode,
}

impl ActionSpecContext {
    #[must_use]
    pub fn new(parent: Arc<dyn EvalContext>, name: impl Into<String>, mode: ActionMode) -> Self {
        Self {
            parent,
            name: name.into(),
            mode,
        }
    }
}

impl EvalContext for ActionSpecContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        if path.first().map(String::as_str) == Some("this") {
            return match path.get(1).map(String::as_str) {
                Some("name") if path.len() == 2 => {
                    Lookup::Found(TemplateValue::String(self.name.clone()))
                }
                Some("mode") if path.len() == 2 => {
                    Lookup::Found(TemplateValue::String(self.mode.to_string()))
                }
                _ => Lookup::Absent,
            };
        }
        self.parent.lookup(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::project::ProjectContext;
    use std::path::PathBuf;

    #[test]
    fn resolves_this_name_and_mode() {
        let parent: Arc<dyn EvalContext> =
            Arc::new(ProjectContext::new("demo", PathBuf::from("/srv/demo")));
        let ctx = ActionSpecContext::new(parent, "api", ActionMode::Sync);
        assert!(matches!(
            ctx.lookup(&["this".to_string(), "name".to_string()]),
            Lookup::Found(TemplateValue::String(ref s)) if s == "api"
        ));
        assert!(matches!(
            ctx.lookup(&["this".to_string(), "mode".to_string()]),
            Lookup::Found(TemplateValue::String(ref s)) if s == "sync"
        ));
    }
}
