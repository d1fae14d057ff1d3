//! `ProviderContext` — adds `providers.<name>.outputs.*`.

use crate::template::{EvalContext, Lookup, TemplateValue};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct ProviderContext {
    parent: Arc<dyn EvalContext>,
    outputs: IndexMap<String, IndexMap<String, TemplateValue>>,
}

impl ProviderContext {
    #[must_use]
    pub fn new(parent: Arc<dyn EvalContext>) -> Self {
        Self {
            parent,
            outputs: IndexMap::new(),
        }
    }

    /// Record the resolved outputs of `provider`, overwriting any previous
    /// value for the same name (construction-time only; the context itself
    /// stays immutable once wrapped in an `Arc`).
    #[must_use]
    pub fn with_provider_outputs(
        mut self,
        provider: impl Into<String>,
        outputs: IndexMap<String, TemplateValue>,
    ) -> Self {
        self.outputs.insert(provider.into(), outputs);
        self
    }
}

impl EvalContext for ProviderContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        if path.first().map(String::as_str) == Some("providers") {
            if let [_, name, rest @ ..] = path {
                if let Some(outputs) = self.outputs.get(name) {
                    let Some((head, tail)) = rest.split_first() else {
                        return Lookup::Absent;
                    };
                    if head != "outputs" {
                        return Lookup::Absent;
                    }
                    let mut current = match tail.split_first() {
                        Some((key, _)) => match outputs.get(key) {
                            Some(v) => v.clone(),
                            None => return Lookup::Absent,
                        },
                        None => {
                            return Lookup::Found(TemplateValue::Object(outputs.clone()));
                        }
                    };
                    for key in &tail[1..] {
                        match current {
                            TemplateValue::Object(mut map) => match map.shift_remove(key) {
                                Some(v) => current = v,
                                None => return Lookup::Absent,
                            },
                            _ => return Lookup::Absent,
                        }
                    }
                    return Lookup::Found(current);
                }
            }
            return Lookup::Absent;
        }
        self.parent.lookup(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::project::ProjectContext;
    use std::path::PathBuf;

    fn root() -> Arc<dyn EvalContext> {
        Arc::new(ProjectContext::new("demo", PathBuf::from("/srv/demo")))
    }

    #[test]
    fn resolves_nested_provider_output() {
        let mut outputs = IndexMap::new();
        outputs.insert("clusterName".to_string(), TemplateValue::String("prod-1".into()));
        let ctx = ProviderContext::new(root()).with_provider_outputs("kubernetes", outputs);
        let path = ["providers", "kubernetes", "outputs", "clusterName"]
            .map(str::to_string)
            .to_vec();
        assert!(matches!(
            ctx.lookup(&path),
            Lookup::Found(TemplateValue::String(ref s)) if s == "prod-1"
        ));
    }

    #[test]
    fn unknown_provider_is_absent() {
        let ctx = ProviderContext::new(root());
        let path = ["providers", "kubernetes", "outputs", "x"].map(str::to_string).to_vec();
        assert!(matches!(ctx.lookup(&path), Lookup::Absent));
    }
}
