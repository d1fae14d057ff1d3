//! Small helpers for pulling typed, fully-resolved values out of a raw
//! document's [`Node`] tree during the loader's "field resolution staging"
//! (4.3): only the fields a document's shape requires at load time are
//! evaluated here: eagerly, against the project/environment/provider
//! context, never partially.
//!
//! By design, a structural field handled here (`name`, `kind`, `type`,
//! `dependencies`, `include`/`exclude`, `disabled`, `timeout`, `mode`) may
//! not reference another action's outputs — every example in the core
//! specification that templates off an action's outputs does so from
//! `spec` or `variables`, which this module never touches. See
//! `DESIGN.md` for this Open Question resolution.

use crate::core::error::GardenError;
use crate::template::{self, EvalContext, Node, TemplateValue};
use std::sync::Arc;

fn err(document: &str, reason: impl Into<String>) -> GardenError {
    GardenError::Configuration {
        document: document.to_string(),
        reason: reason.into(),
    }
}

/// Evaluate `node` fully (no partial evaluation) against `ctx`.
pub fn eval(node: &Node, ctx: &Arc<dyn EvalContext>, document: &str) -> Result<TemplateValue, GardenError> {
    template::evaluate(node, ctx, false, document).map_err(|e| template::to_garden_error(&e))
}

/// Evaluate and coerce to a `String`.
pub fn eval_string(node: &Node, ctx: &Arc<dyn EvalContext>, document: &str) -> Result<String, GardenError> {
    eval(node, ctx, document)?
        .as_interpolated_string()
        .map_err(|reason| err(document, reason))
}

/// Evaluate and coerce to a `bool`.
pub fn eval_bool(node: &Node, ctx: &Arc<dyn EvalContext>, document: &str) -> Result<bool, GardenError> {
    match eval(node, ctx, document)? {
        TemplateValue::Bool(b) => Ok(b),
        other => Err(err(document, format!("expected a boolean, found {}", other.type_name()))),
    }
}

/// Evaluate and coerce to a `u64` (used for `timeout`).
pub fn eval_u64(node: &Node, ctx: &Arc<dyn EvalContext>, document: &str) -> Result<u64, GardenError> {
    match eval(node, ctx, document)? {
        TemplateValue::Number(n) if n >= 0.0 => Ok(n as u64),
        other => Err(err(document, format!("expected a non-negative number, found {}", other.type_name()))),
    }
}

/// Evaluate an array node into a `Vec<String>` (used for `include`,
/// `exclude`, `cache.exclude`).
pub fn eval_string_list(
    node: &Node,
    ctx: &Arc<dyn EvalContext>,
    document: &str,
) -> Result<Vec<String>, GardenError> {
    match eval(node, ctx, document)? {
        TemplateValue::Array(items) => items
            .iter()
            .map(|v| v.as_interpolated_string().map_err(|reason| err(document, reason)))
            .collect(),
        other => Err(err(document, format!("expected an array of strings, found {}", other.type_name()))),
    }
}

/// Extract the raw `Node` at `key` from a mapping's entries, if present.
#[must_use]
pub fn field<'a>(entries: &'a [(String, Node)], key: &str) -> Option<&'a Node> {
    entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
}

/// Destructure a document's top-level `Node` into its `Object` entries, or
/// fail with a configuration error.
pub fn object_entries<'a>(node: &'a Node, document: &str) -> Result<&'a [(String, Node)], GardenError> {
    match node {
        Node::Object(entries) => Ok(entries),
        _ => Err(err(document, "expected a mapping at the document root")),
    }
}
