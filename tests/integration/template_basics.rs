//! Interpolation against the real layered context stack (project ->
//! environment), as a loaded project would build it, rather than a test
//! double `EvalContext`.

use garden_core::context::{EnvironmentContext, ProjectContext};
use garden_core::template::{evaluate_template, EvalContext, TemplateValue};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

fn layered_context() -> Arc<dyn EvalContext> {
    let mut variables = IndexMap::new();
    variables.insert("replicas".to_string(), TemplateValue::Number(3.0));

    let project: Arc<dyn EvalContext> = Arc::new(ProjectContext::new("demo", PathBuf::from("/srv/demo")));
    Arc::new(
        EnvironmentContext::new(project, "staging")
            .with_namespace("demo-staging")
            .with_variables(variables),
    )
}

#[test]
fn interpolates_environment_and_variable_lookups() {
    let ctx = layered_context();
    let result = evaluate_template("${environment.name}: ${environment.namespace}", &ctx, false).unwrap();
    assert_eq!(result, TemplateValue::String("staging: demo-staging".to_string()));
}

#[test]
fn arithmetic_over_a_layered_variable() {
    let ctx = layered_context();
    let result = evaluate_template("${var.replicas * 2}", &ctx, false).unwrap();
    assert_eq!(result, TemplateValue::Number(6.0));
}

#[test]
fn unknown_key_is_a_hard_error_without_partial_evaluation() {
    let ctx = layered_context();
    let err = evaluate_template("${environment.missing}", &ctx, false).unwrap_err();
    assert!(err.reason.contains("not found"));
}
