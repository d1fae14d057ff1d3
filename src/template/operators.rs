//! Structural-operator-aware loading of raw YAML documents into the
//! template AST.
//!
//! When loading a container node (map or list), reserved sibling keys
//! (`$merge`, `$concat`, `$if`, `$forEach`) are recognized and rewritten
//! into the corresponding [`Node`] variant; every other scalar is run
//! through [`crate::template::parser::parse_template`] so `${...}`
//! interpolations inside plain strings still work.

use crate::template::ast::Node;
use crate::template::error::{TemplateError, TemplateResult};
use crate::template::parser::parse_template;

const MERGE: &str = "$merge";
const CONCAT: &str = "$concat";
const IF: &str = "$if";
const FOR_EACH: &str = "$forEach";

/// Load a `serde_yaml::Value` document into a [`Node`] tree, rewriting
/// structural operators as it goes.
pub fn load(value: &serde_yaml::Value) -> TemplateResult<Node> {
    match value {
        serde_yaml::Value::Null => Ok(Node::Null),
        serde_yaml::Value::Bool(b) => Ok(Node::Bool(*b)),
        serde_yaml::Value::Number(n) => Ok(Node::Number(n.as_f64().unwrap_or(f64::NAN))),
        serde_yaml::Value::String(s) => parse_template(s),
        serde_yaml::Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Some(concat_arg) = single_key(item, CONCAT) {
                    out.push(Node::ConcatSplice(Box::new(load(concat_arg)?)));
                } else {
                    out.push(load(item)?);
                }
            }
            Ok(Node::Array(out))
        }
        serde_yaml::Value::Mapping(map) => load_mapping(map),
        serde_yaml::Value::Tagged(tagged) => load(&tagged.value),
    }
}

/// If `value` is a mapping with exactly one key equal to `key`, return its
/// value.
fn single_key<'a>(value: &'a serde_yaml::Value, key: &str) -> Option<&'a serde_yaml::Value> {
    let serde_yaml::Value::Mapping(map) = value else {
        return None;
    };
    if map.len() != 1 {
        return None;
    }
    map.get(serde_yaml::Value::String(key.to_string()))
}

fn load_mapping(map: &serde_yaml::Mapping) -> TemplateResult<Node> {
    let has = |key: &str| map.contains_key(serde_yaml::Value::String(key.to_string()));

    if has(IF) {
        let cond_raw = map
            .get(serde_yaml::Value::String(IF.to_string()))
            .expect("checked above");
        let then_raw = map
            .get(serde_yaml::Value::String("then".to_string()))
            .ok_or_else(|| TemplateError::new("$if", 0, "'$if' requires a 'then' field"))?;
        let else_raw = map.get(serde_yaml::Value::String("else".to_string()));
        return Ok(Node::If {
            cond: Box::new(load(cond_raw)?),
            then_branch: Box::new(load(then_raw)?),
            else_branch: else_raw.map(load).transpose()?.map(Box::new),
        });
    }

    if has(FOR_EACH) {
        let value_raw = map
            .get(serde_yaml::Value::String(FOR_EACH.to_string()))
            .expect("checked above");
        let into_raw = map
            .get(serde_yaml::Value::String("into".to_string()))
            .ok_or_else(|| {
                TemplateError::new("$forEach", 0, "'$forEach' requires an 'into' field")
            })?;
        return Ok(Node::ForEach {
            value: Box::new(load(value_raw)?),
            into: Box::new(load(into_raw)?),
        });
    }

    if has(MERGE) {
        let base_raw = map
            .get(serde_yaml::Value::String(MERGE.to_string()))
            .expect("checked above");
        let mut overlay = Vec::new();
        for (k, v) in map {
            if let serde_yaml::Value::String(key) = k {
                if key == MERGE {
                    continue;
                }
                overlay.push((key.clone(), load(v)?));
            }
        }
        return Ok(Node::Merge {
            base: Box::new(load(base_raw)?),
            overlay,
        });
    }

    let mut entries = Vec::with_capacity(map.len());
    for (k, v) in map {
        let serde_yaml::Value::String(key) = k else {
            continue;
        };
        entries.push((key.clone(), load(v)?));
    }
    Ok(Node::Object(entries))
}
