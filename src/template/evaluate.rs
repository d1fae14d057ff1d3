//! Evaluation of the template AST against a layered context.
//!
//! `evaluate` walks a single [`Node`] and produces a [`TemplateValue`].
//! With `allow_partial = false` a missing key or type mismatch is a hard
//! [`TemplateError`]. With `allow_partial = true`, a node that cannot be
//! computed because of a missing context key instead returns
//! [`TemplateValue::Unresolved`], preserving the original node (and a
//! snapshot of the context it was evaluated against) so a later call
//! against a richer context can complete it.
//!
//! Array/object *container* nodes never bubble partiality up past
//! themselves — only individual leaves may be unresolved, so siblings stay
//! concrete. Operator/expression nodes (arithmetic, calls, concatenation,
//! coalesce, ternary, `$merge`/`$if`/`$forEach`) do bubble up: if an input
//! they need is unresolved, the whole sub-expression becomes unresolved,
//! because there is no way to partially add two numbers.

use crate::template::ast::{BinaryOp, Node, PathSegment};
use crate::template::error::{TemplateError, TemplateResult};
use crate::template::functions;
use crate::template::parser::parse_template;
use crate::template::value::{EvalContext, Lookup, TemplateValue, UnresolvedValue};
use indexmap::IndexMap;
use std::sync::Arc;

/// Parse and evaluate `source` as a full template string in one call.
pub fn evaluate_template(
    source: &str,
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
) -> TemplateResult<TemplateValue> {
    let node = parse_template(source)?;
    evaluate(&node, ctx, allow_partial, source)
}

fn unresolved(node: &Node, ctx: &Arc<dyn EvalContext>) -> TemplateValue {
    TemplateValue::Unresolved(UnresolvedValue {
        node: Arc::new(node.clone()),
        context: Some(Arc::clone(ctx)),
    })
}

fn is_unresolved(value: &TemplateValue) -> bool {
    matches!(value, TemplateValue::Unresolved(_))
}

/// Evaluate a single AST node. `source` is the original template string
/// this node was parsed from, used only to anchor error offsets.
pub fn evaluate(
    node: &Node,
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
    source: &str,
) -> TemplateResult<TemplateValue> {
    match node {
        Node::Literal(s) => Ok(TemplateValue::String(s.clone())),
        Node::Number(n) => Ok(TemplateValue::Number(*n)),
        Node::Bool(b) => Ok(TemplateValue::Bool(*b)),
        Node::Null => Ok(TemplateValue::Null),

        Node::Path(segments) => eval_path(node, segments, ctx, allow_partial, source),

        Node::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if let Node::ConcatSplice(inner) = item {
                    let spliced = evaluate(inner, ctx, allow_partial, source)?;
                    match spliced {
                        TemplateValue::Array(values) => out.extend(values),
                        TemplateValue::Unresolved(_) if allow_partial => out.push(spliced),
                        other => {
                            return Err(TemplateError::new(
                                source,
                                0,
                                format!("'$concat' argument must be an array, found {}", other.type_name()),
                            ));
                        }
                    }
                } else {
                    out.push(evaluate(item, ctx, allow_partial, source)?);
                }
            }
            Ok(TemplateValue::Array(out))
        }

        Node::Object(entries) => {
            let mut out = IndexMap::with_capacity(entries.len());
            for (key, value_node) in entries {
                out.insert(key.clone(), evaluate(value_node, ctx, allow_partial, source)?);
            }
            Ok(TemplateValue::Object(out))
        }

        Node::Call { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, ctx, allow_partial, source)?);
            }
            if values.iter().any(is_unresolved) {
                return if allow_partial {
                    Ok(unresolved(node, ctx))
                } else {
                    Err(TemplateError::new(source, 0, format!("'{name}': argument is unresolved")))
                };
            }
            functions::call(name, &values, source, 0).map_err(|mut e| {
                e.source = source.to_string();
                e
            })
        }

        Node::Not(inner) => {
            let value = evaluate(inner, ctx, allow_partial, source)?;
            if is_unresolved(&value) {
                return propagate(node, &value, ctx, allow_partial);
            }
            Ok(TemplateValue::Bool(!value.is_truthy()))
        }

        Node::Binary { op, lhs, rhs } => eval_binary(node, *op, lhs, rhs, ctx, allow_partial, source),

        Node::Ternary {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_val = evaluate(cond, ctx, allow_partial, source)?;
            if is_unresolved(&cond_val) {
                return propagate(node, &cond_val, ctx, allow_partial);
            }
            if cond_val.is_truthy() {
                evaluate(then_branch, ctx, allow_partial, source)
            } else {
                evaluate(else_branch, ctx, allow_partial, source)
            }
        }

        Node::Coalesce { lhs, rhs } => {
            let lhs_val = evaluate(lhs, ctx, true, source)?;
            if is_unresolved(&lhs_val) {
                let rhs_val = evaluate(rhs, ctx, allow_partial, source)?;
                if is_unresolved(&rhs_val) {
                    // Both sides unresolved: preserve as unresolved (see
                    // Open Question #2 in the design notes).
                    return Ok(unresolved(node, ctx));
                }
                Ok(rhs_val)
            } else {
                Ok(lhs_val)
            }
        }

        Node::Concat(parts) => {
            let mut values = Vec::with_capacity(parts.len());
            for part in parts {
                values.push(evaluate(part, ctx, allow_partial, source)?);
            }
            if values.iter().any(is_unresolved) {
                return if allow_partial {
                    Ok(unresolved(node, ctx))
                } else {
                    Err(TemplateError::new(source, 0, "concatenation operand is unresolved".to_string()))
                };
            }
            let mut joined = String::new();
            for value in &values {
                joined.push_str(
                    &value
                        .as_interpolated_string()
                        .map_err(|e| TemplateError::new(source, 0, e))?,
                );
            }
            Ok(TemplateValue::String(joined))
        }

        Node::Merge { base, overlay } => {
            let base_val = evaluate(base, ctx, allow_partial, source)?;
            if is_unresolved(&base_val) {
                return propagate(node, &base_val, ctx, allow_partial);
            }
            let TemplateValue::Object(base_map) = base_val else {
                return Err(TemplateError::new(
                    source,
                    0,
                    format!("'$merge' argument must evaluate to a map, found {}", base_val.type_name()),
                ));
            };
            let mut merged = base_map;
            for (key, value_node) in overlay {
                merged.insert(key.clone(), evaluate(value_node, ctx, allow_partial, source)?);
            }
            Ok(TemplateValue::Object(merged))
        }

        Node::ConcatSplice(inner) => evaluate(inner, ctx, allow_partial, source),

        Node::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let cond_val = evaluate(cond, ctx, allow_partial, source)?;
            if is_unresolved(&cond_val) {
                return propagate(node, &cond_val, ctx, allow_partial);
            }
            if cond_val.is_truthy() {
                evaluate(then_branch, ctx, allow_partial, source)
            } else if let Some(else_branch) = else_branch {
                evaluate(else_branch, ctx, allow_partial, source)
            } else {
                Ok(TemplateValue::skip(Arc::new(node.clone())))
            }
        }

        Node::ForEach { value, into } => {
            let value_val = evaluate(value, ctx, allow_partial, source)?;
            if is_unresolved(&value_val) {
                return propagate(node, &value_val, ctx, allow_partial);
            }
            let TemplateValue::Array(items) = value_val else {
                return Err(TemplateError::new(
                    source,
                    0,
                    format!("'$forEach' value must evaluate to an array, found {}", value_val.type_name()),
                ));
            };
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let item_ctx: Arc<dyn EvalContext> = Arc::new(ItemContext {
                    parent: Arc::clone(ctx),
                    item,
                    index,
                });
                out.push(evaluate(into, &item_ctx, allow_partial, source)?);
            }
            Ok(TemplateValue::Array(out))
        }
    }
}

fn propagate(
    node: &Node,
    inner_unresolved: &TemplateValue,
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
) -> TemplateResult<TemplateValue> {
    if allow_partial {
        Ok(unresolved(node, ctx))
    } else {
        // Only reachable if the inner evaluation itself was called with
        // allow_partial=true (e.g. Coalesce's speculative lhs probe); any
        // other unresolved leaf under allow_partial=false would already
        // have errored at its own lookup site.
        let _ = inner_unresolved;
        Err(TemplateError::new(
            "<expression>",
            0,
            "operand is unresolved under allowPartial=false".to_string(),
        ))
    }
}

fn eval_path(
    node: &Node,
    segments: &[PathSegment],
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
    source: &str,
) -> TemplateResult<TemplateValue> {
    let mut i = 0;
    let mut keys = Vec::new();
    while let Some(PathSegment::Key(k)) = segments.get(i) {
        keys.push(k.clone());
        i += 1;
    }

    let base = match ctx.lookup(&keys) {
        Lookup::Found(v) => v,
        Lookup::Absent => {
            return if allow_partial {
                Ok(unresolved(node, ctx))
            } else {
                Err(TemplateError::new(
                    source,
                    0,
                    format!("key '{}' not found", keys.join(".")),
                ))
            };
        }
    };

    let mut current = base;
    for seg in &segments[i..] {
        if is_unresolved(&current) {
            return if allow_partial {
                Ok(unresolved(node, ctx))
            } else {
                Err(TemplateError::new(source, 0, "cannot index into an unresolved value".to_string()))
            };
        }
        current = match seg {
            PathSegment::Key(k) => match current {
                TemplateValue::Object(mut map) => map.shift_remove(k).ok_or_else(|| {
                    TemplateError::new(source, 0, format!("key '{k}' not found"))
                })?,
                other => {
                    return Err(TemplateError::new(
                        source,
                        0,
                        format!("cannot look up '{k}' on a {}", other.type_name()),
                    ));
                }
            },
            PathSegment::Index(expr) => {
                let idx_val = evaluate(expr, ctx, allow_partial, source)?;
                if is_unresolved(&idx_val) {
                    return if allow_partial {
                        Ok(unresolved(node, ctx))
                    } else {
                        Err(TemplateError::new(source, 0, "index expression is unresolved".to_string()))
                    };
                }
                match (current, idx_val) {
                    (TemplateValue::Array(items), TemplateValue::Number(n)) => {
                        let idx = n as usize;
                        items.into_iter().nth(idx).ok_or_else(|| {
                            TemplateError::new(source, 0, format!("index {idx} out of bounds"))
                        })?
                    }
                    (TemplateValue::Object(mut map), TemplateValue::String(key)) => map
                        .shift_remove(&key)
                        .ok_or_else(|| TemplateError::new(source, 0, format!("key '{key}' not found")))?,
                    (other, _) => {
                        return Err(TemplateError::new(
                            source,
                            0,
                            format!("cannot index a {}", other.type_name()),
                        ));
                    }
                }
            }
        };
    }
    Ok(current)
}

fn eval_binary(
    node: &Node,
    op: BinaryOp,
    lhs: &Node,
    rhs: &Node,
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
    source: &str,
) -> TemplateResult<TemplateValue> {
    // Short-circuit && / || before evaluating the other side.
    if matches!(op, BinaryOp::And | BinaryOp::Or) {
        let lhs_val = evaluate(lhs, ctx, allow_partial, source)?;
        if is_unresolved(&lhs_val) {
            return propagate(node, &lhs_val, ctx, allow_partial);
        }
        let short_circuit = match op {
            BinaryOp::And => !lhs_val.is_truthy(),
            BinaryOp::Or => lhs_val.is_truthy(),
            _ => unreachable!(),
        };
        if short_circuit {
            return Ok(TemplateValue::Bool(lhs_val.is_truthy()));
        }
        let rhs_val = evaluate(rhs, ctx, allow_partial, source)?;
        if is_unresolved(&rhs_val) {
            return propagate(node, &rhs_val, ctx, allow_partial);
        }
        return Ok(TemplateValue::Bool(rhs_val.is_truthy()));
    }

    let lhs_val = evaluate(lhs, ctx, allow_partial, source)?;
    let rhs_val = evaluate(rhs, ctx, allow_partial, source)?;
    if is_unresolved(&lhs_val) || is_unresolved(&rhs_val) {
        return propagate(node, &lhs_val, ctx, allow_partial);
    }

    match op {
        BinaryOp::Eq => Ok(TemplateValue::Bool(lhs_val == rhs_val)),
        BinaryOp::Ne => Ok(TemplateValue::Bool(lhs_val != rhs_val)),
        BinaryOp::Contains => Ok(TemplateValue::Bool(eval_contains(&lhs_val, &rhs_val))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (a, b) = (as_number(&lhs_val, source)?, as_number(&rhs_val, source)?);
            Ok(TemplateValue::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Le => a <= b,
                BinaryOp::Gt => a > b,
                BinaryOp::Ge => a >= b,
                _ => unreachable!(),
            }))
        }
        BinaryOp::Add => {
            let either_string =
                matches!(lhs_val, TemplateValue::String(_)) || matches!(rhs_val, TemplateValue::String(_));
            if either_string {
                let a = lhs_val.as_interpolated_string().map_err(|e| TemplateError::new(source, 0, e))?;
                let b = rhs_val.as_interpolated_string().map_err(|e| TemplateError::new(source, 0, e))?;
                Ok(TemplateValue::String(format!("{a}{b}")))
            } else {
                Ok(TemplateValue::Number(
                    as_number(&lhs_val, source)? + as_number(&rhs_val, source)?,
                ))
            }
        }
        BinaryOp::Sub => Ok(TemplateValue::Number(
            as_number(&lhs_val, source)? - as_number(&rhs_val, source)?,
        )),
        BinaryOp::Mul => Ok(TemplateValue::Number(
            as_number(&lhs_val, source)? * as_number(&rhs_val, source)?,
        )),
        BinaryOp::Div => {
            let b = as_number(&rhs_val, source)?;
            if b == 0.0 {
                return Err(TemplateError::new(source, 0, "division by zero".to_string()));
            }
            Ok(TemplateValue::Number(as_number(&lhs_val, source)? / b))
        }
        BinaryOp::Mod => {
            let b = as_number(&rhs_val, source)?;
            if b == 0.0 {
                return Err(TemplateError::new(source, 0, "modulo by zero".to_string()));
            }
            Ok(TemplateValue::Number(as_number(&lhs_val, source)? % b))
        }
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

fn as_number(value: &TemplateValue, source: &str) -> TemplateResult<f64> {
    match value {
        TemplateValue::Number(n) => Ok(*n),
        other => Err(TemplateError::new(
            source,
            0,
            format!("expected a number, found {}", other.type_name()),
        )),
    }
}

fn eval_contains(haystack: &TemplateValue, needle: &TemplateValue) -> bool {
    match haystack {
        TemplateValue::Array(items) => items.contains(needle),
        TemplateValue::String(s) => match needle {
            TemplateValue::String(n) => s.contains(n.as_str()),
            _ => false,
        },
        TemplateValue::Object(map) => match needle {
            TemplateValue::String(k) => map.contains_key(k),
            _ => false,
        },
        _ => false,
    }
}

/// Deeply evaluate a value tree, forcing every [`TemplateValue::Unresolved`]
/// leaf to re-evaluate against `ctx`. Used at demand sites (e.g. just
/// before handing an action's `spec` to its plugin) once a richer context
/// is available. Preserves mapping key order.
pub fn deep_evaluate(
    value: &TemplateValue,
    ctx: &Arc<dyn EvalContext>,
    allow_partial: bool,
) -> TemplateResult<TemplateValue> {
    match value {
        TemplateValue::Unresolved(u) => {
            let result = evaluate(&u.node, ctx, allow_partial, "<unresolved>")?;
            if is_unresolved(&result) {
                Ok(result)
            } else {
                deep_evaluate(&result, ctx, allow_partial)
            }
        }
        TemplateValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(deep_evaluate(item, ctx, allow_partial)?);
            }
            Ok(TemplateValue::Array(out))
        }
        TemplateValue::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), deep_evaluate(v, ctx, allow_partial)?);
            }
            Ok(TemplateValue::Object(out))
        }
        other => Ok(other.clone()),
    }
}

/// A context that shadows a single top-level key (`item`, plus `item.index`)
/// on top of a parent — built fresh for each iteration of `$forEach`.
#[derive(Debug)]
struct ItemContext {
    parent: Arc<dyn EvalContext>,
    item: TemplateValue,
    index: usize,
}

impl EvalContext for ItemContext {
    fn lookup(&self, path: &[String]) -> Lookup {
        match path.first().map(String::as_str) {
            Some("item") => {
                if path.len() == 1 {
                    return Lookup::Found(self.item.clone());
                }
                if path.get(1).map(String::as_str) == Some("index") && path.len() == 2 {
                    return Lookup::Found(TemplateValue::Number(self.index as f64));
                }
                let mut current = self.item.clone();
                for key in &path[1..] {
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
            _ => self.parent.lookup(path),
        }
    }
}
