//! `ProjectContext` — the root scope. Carries no parent; anything outside
//! its known keys is simply absent.

use crate::template::{EvalContext, Lookup, TemplateValue};
use std::collections::HashMap;
use std::path::PathBuf;

/// The root of a context chain: project identity, paths, environment
/// variables, and the invoking user.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub name: String,
    pub root: PathBuf,
    pub env_vars: HashMap<String, String>,
    pub user: Option<String>,
}

impl ProjectContext {
    #[must_use]
    pub fn new(name: impl Into<String>, root: PathBuf) -> Self {
        Self {
            name: name.into(),
            root,
            env_vars: HashMap::new(),
            user: None,
        }
    }

    /// Populate `env_vars` from the process environment. Kept separate from
    /// `new` so tests can build a context with a fixed, hermetic set of
    /// variables instead.
    #[must_use]
    pub fn with_process_env(mut self) -> Self {
        self.env_vars = std::env::vars().collect();
        self
    }
}

impl EvalContext for ProjectContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        match path.first().map(String::as_str) {
            Some("project") => match path.get(1).map(String::as_str) {
                Some("name") if path.len() == 2 => {
                    Lookup::Found(TemplateValue::String(self.name.clone()))
                }
                Some("path") if path.len() == 2 => Lookup::Found(TemplateValue::String(
                    self.root.to_string_lossy().into_owned(),
                )),
                _ => Lookup::Absent,
            },
            Some("local") => match path.get(1).map(String::as_str) {
                Some("username") if path.len() == 2 => self
                    .user
                    .clone()
                    .map(TemplateValue::String)
                    .map(Lookup::Found)
                    .unwrap_or(Lookup::Absent),
                Some("env") if path.len() == 3 => path
                    .get(2)
                    .and_then(|var| self.env_vars.get(var))
                    .map(|v| TemplateValue::String(v.clone()))
                    .map(Lookup::Found)
                    .unwrap_or(Lookup::Absent),
                _ => Lookup::Absent,
            },
            _ => Lookup::Absent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_project_name_and_path() {
        let ctx = ProjectContext::new("demo", PathBuf::from("/srv/demo"));
        assert!(matches!(
            ctx.lookup(&["project".to_string(), "name".to_string()]),
            Lookup::Found(TemplateValue::String(ref s)) if s == "demo"
        ));
    }

    #[test]
    fn env_var_lookup_is_absent_when_unset() {
        let ctx = ProjectContext::new("demo", PathBuf::from("/srv/demo"));
        assert!(matches!(
            ctx.lookup(&["local".to_string(), "env".to_string(), "MISSING_VAR".to_string()]),
            Lookup::Absent
        ));
    }
}
