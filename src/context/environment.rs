//! `EnvironmentContext` — adds `environment.name`, `environment.namespace`,
//! and the project's `variables` (exposed under both `variables.*` and the
//! `var.*` alias templates commonly use).

use crate::template::{EvalContext, Lookup, TemplateValue};
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug)]
pub struct EnvironmentContext {
    parent: Arc<dyn EvalContext>,
    pub name: String,
    pub namespace: Option<String>,
    pub variables: IndexMap<String, TemplateValue>,
}

impl EnvironmentContext {
    #[must_use]
    pub fn new(parent: Arc<dyn EvalContext>, name: impl Into<String>) -> Self {
        Self {
            parent,
            name: name.into(),
            namespace: None,
            variables: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    #[must_use]
    pub fn with_variables(mut self, variables: IndexMap<String, TemplateValue>) -> Self {
        self.variables = variables;
        self
    }

    fn lookup_in_variables(&self, keys: &[String]) -> Lookup {
        let Some((first, rest)) = keys.split_first() else {
            return Lookup::Absent;
        };
        let Some(mut current) = self.variables.get(first).cloned() else {
            return Lookup::Absent;
        };
        for key in rest {
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
}

impl EvalContext for EnvironmentContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        match path.first().map(String::as_str) {
            Some("environment") => match path.get(1).map(String::as_str) {
                Some("name") if path.len() == 2 => {
                    Lookup::Found(TemplateValue::String(self.name.clone()))
                }
                Some("namespace") if path.len() == 2 => self
                    .namespace
                    .clone()
                    .map(TemplateValue::String)
                    .map(Lookup::Found)
                    .unwrap_or(Lookup::Absent),
                _ => Lookup::Absent,
            },
            Some("variables") | Some("var") => self.lookup_in_variables(&path[1..]),
            _ => self.parent.lookup(path),
        }
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
    fn variables_resolve_through_both_aliases() {
        let mut vars = IndexMap::new();
        vars.insert("replicas".to_string(), TemplateValue::Number(3.0));
        let ctx = EnvironmentContext::new(root(), "dev").with_variables(vars);
        assert!(matches!(
            ctx.lookup(&["var".to_string(), "replicas".to_string()]),
            Lookup::Found(TemplateValue::Number(n)) if n == 3.0
        ));
        assert!(matches!(
            ctx.lookup(&["variables".to_string(), "replicas".to_string()]),
            Lookup::Found(TemplateValue::Number(n)) if n == 3.0
        ));
    }

    #[test]
    fn falls_through_to_parent_for_project_keys() {
        let ctx = EnvironmentContext::new(root(), "dev");
        assert!(matches!(
            ctx.lookup(&["project".to_string(), "name".to_string()]),
            Lookup::Found(TemplateValue::String(ref s)) if s == "demo"
        ));
    }

    #[test]
    fn shadowing_does_not_mutate_parent() {
        let parent = root();
        let ctx = EnvironmentContext::new(Arc::clone(&parent), "dev");
        // EnvironmentContext doesn't define `project.name` itself, but even
        // if it did, the parent Arc would be untouched — there is no
        // mutation path on `EvalContext::lookup(&self, ...)`.
        assert!(matches!(
            parent.lookup(&["project".to_string(), "name".to_string()]),
            Lookup::Found(_)
        ));
        let _ = ctx;
    }
}
