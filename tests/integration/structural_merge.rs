//! End-to-end: a raw YAML document using `$merge`/`$if`, loaded through
//! [`garden_core::template::operators::load`] and evaluated against a real
//! context, produces the expected merged object.

use garden_core::context::{EnvironmentContext, ProjectContext};
use garden_core::template::{evaluate, operators, EvalContext, TemplateValue};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

fn ctx() -> Arc<dyn EvalContext> {
    let mut variables = IndexMap::new();
    let mut common = IndexMap::new();
    common.insert("LOG_LEVEL".to_string(), TemplateValue::String("info".to_string()));
    variables.insert("common".to_string(), TemplateValue::Object(common));

    let project: Arc<dyn EvalContext> = Arc::new(ProjectContext::new("demo", PathBuf::from("/srv/demo")));
    Arc::new(EnvironmentContext::new(project, "prod").with_variables(variables))
}

#[test]
fn merge_overlays_sibling_keys_onto_the_base() {
    let doc: serde_yaml::Value = serde_yaml::from_str(
        "env:\n  $merge: \"${var.common}\"\n  EXTRA: \"set\"\n",
    )
    .unwrap();
    let node = operators::load(&doc).unwrap();
    let value = evaluate(&node, &ctx(), false, "env").unwrap();

    let TemplateValue::Object(top) = value else { panic!("expected object") };
    let TemplateValue::Object(env) = top.get("env").cloned().unwrap() else { panic!("expected object") };
    assert_eq!(env.get("LOG_LEVEL"), Some(&TemplateValue::String("info".to_string())));
    assert_eq!(env.get("EXTRA"), Some(&TemplateValue::String("set".to_string())));
}

#[test]
fn if_without_else_and_false_condition_is_skipped() {
    let doc: serde_yaml::Value = serde_yaml::from_str("$if: \"${false}\"\nthen: \"yes\"\n").unwrap();
    let node = operators::load(&doc).unwrap();
    let value = evaluate(&node, &ctx(), false, "if").unwrap();
    assert!(matches!(value, TemplateValue::Unresolved(_)));
}

#[test]
fn if_true_condition_takes_then_branch() {
    let doc: serde_yaml::Value = serde_yaml::from_str("$if: \"${true}\"\nthen: \"yes\"\nelse: \"no\"\n").unwrap();
    let node = operators::load(&doc).unwrap();
    let value = evaluate(&node, &ctx(), false, "if").unwrap();
    assert_eq!(value, TemplateValue::String("yes".to_string()));
}
