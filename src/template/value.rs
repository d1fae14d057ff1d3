//! The runtime value type produced by template evaluation, and the trait
//! contexts must implement to supply lookups to it.
//!
//! [`TemplateValue`] is the single concrete/unresolved union described in
//! the data model: ordinary JSON-ish leaves (`Null`/`Bool`/`Number`/
//! `String`/`Array`/`Object`) plus an [`Unresolved`](TemplateValue::Unresolved)
//! variant that stands in for a not-yet-evaluated expression or structural
//! operator. A fully-resolved tree, by invariant, contains zero
//! `Unresolved` leaves.

use crate::template::ast::Node;
use crate::template::error::TemplateError;
use indexmap::IndexMap;
use std::sync::Arc;

/// Outcome of looking a dotted path up in a context.
pub enum Lookup {
    /// The path resolved to a value (which may itself be
    /// [`TemplateValue::Unresolved`] if the context is layering partial
    /// evaluation).
    Found(TemplateValue),
    /// No scope in the chain defines this path.
    Absent,
}

/// The contract a layered configuration context exposes to the template
/// evaluator. Defined here (rather than in `context`) so that an
/// [`UnresolvedValue`] can hold a context snapshot without the `template`
/// and `context` modules depending on each other circularly — `context`'s
/// scope types implement this trait.
pub trait EvalContext: std::fmt::Debug + Send + Sync {
    /// Look up a dotted path (e.g. `actions.build.api.outputs.imageId`).
    fn lookup(&self, path: &[String]) -> Lookup;
}

/// A not-yet-evaluated expression or structural operator, carrying enough
/// information (its AST plus the context it was found against) to be
/// re-evaluated later against a richer context.
#[derive(Debug, Clone)]
pub struct UnresolvedValue {
    /// The AST node that produced this unresolved marker.
    pub node: Arc<Node>,
    /// The context snapshot to re-evaluate `node` against once more keys
    /// are available. `None` for a bare structural "skip" marker that
    /// carries nothing to retry.
    pub context: Option<Arc<dyn EvalContext>>,
}

impl PartialEq for UnresolvedValue {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

/// A concrete value, or a leaf standing in for an unresolved expression.
#[derive(Debug, Clone)]
pub enum TemplateValue {
    /// YAML/JSON `null`.
    Null,
    /// A boolean.
    Bool(bool),
    /// A number. Garden templates do not distinguish int/float at the
    /// value-model level; integral results still print without a
    /// trailing `.0` (see `Display`).
    Number(f64),
    /// A string.
    String(String),
    /// An ordered array of values.
    Array(Vec<TemplateValue>),
    /// An ordered mapping of values, insertion order preserved.
    Object(IndexMap<String, TemplateValue>),
    /// A value that could not be fully evaluated under the supplied
    /// context and `allowPartial = true`.
    Unresolved(UnresolvedValue),
}

impl PartialEq for TemplateValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Unresolved(a), Self::Unresolved(b)) => a == b,
            _ => false,
        }
    }
}

impl TemplateValue {
    /// `true` if this value (recursively, for containers) has zero
    /// `Unresolved` leaves.
    #[must_use]
    pub fn is_fully_resolved(&self) -> bool {
        match self {
            Self::Unresolved(_) => false,
            Self::Array(items) => items.iter().all(Self::is_fully_resolved),
            Self::Object(map) => map.values().all(Self::is_fully_resolved),
            _ => true,
        }
    }

    /// View this value as a string for interpolation/concatenation
    /// contexts. Containers are not stringifiable this way.
    pub fn as_interpolated_string(&self) -> Result<String, String> {
        match self {
            Self::Null => Ok(String::new()),
            Self::Bool(b) => Ok(b.to_string()),
            Self::Number(n) => Ok(format_number(*n)),
            Self::String(s) => Ok(s.clone()),
            other => Err(format!("cannot interpolate a {} value as a string", other.type_name())),
        }
    }

    /// A short type name for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Unresolved(_) => "unresolved",
        }
    }

    /// Truthiness used by `!`, `&&`, `||`, and `$if`.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Object(o) => !o.is_empty(),
            Self::Unresolved(_) => false,
        }
    }

    /// Construct an unresolved marker that simply "skips" — used for an
    /// `$if` with no matching branch and no `else`.
    #[must_use]
    pub fn skip(node: Arc<Node>) -> Self {
        Self::Unresolved(UnresolvedValue { node, context: None })
    }

    /// Build an error for a type mismatch encountered mid-evaluation.
    pub fn type_error(&self, expected: &str) -> String {
        format!("expected {expected}, found {}", self.type_name())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl std::fmt::Display for TemplateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.as_interpolated_string() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<{}>", self.type_name()),
        }
    }
}

/// Convert a `serde_json`/`serde_yaml`-compatible scalar into a
/// [`TemplateValue`]. Used when loading raw config documents before any
/// structural-operator rewriting happens.
pub fn from_yaml(value: &serde_yaml::Value) -> TemplateValue {
    match value {
        serde_yaml::Value::Null => TemplateValue::Null,
        serde_yaml::Value::Bool(b) => TemplateValue::Bool(*b),
        serde_yaml::Value::Number(n) => TemplateValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_yaml::Value::String(s) => TemplateValue::String(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            TemplateValue::Array(items.iter().map(from_yaml).collect())
        }
        serde_yaml::Value::Mapping(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                if let Some(key) = k.as_str() {
                    out.insert(key.to_string(), from_yaml(v));
                }
            }
            TemplateValue::Object(out)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(&tagged.value),
    }
}

/// Convert a fully-resolved `TemplateValue` into `serde_json::Value`, for
/// persisting task outputs to the on-disk result cache. Any remaining
/// `Unresolved` leaf is an internal-invariant violation at this point (the
/// solver never persists a result before its outputs are fully resolved),
/// so it serializes as JSON `null` rather than panicking.
#[must_use]
pub fn to_json(value: &TemplateValue) -> serde_json::Value {
    match value {
        TemplateValue::Null | TemplateValue::Unresolved(_) => serde_json::Value::Null,
        TemplateValue::Bool(b) => serde_json::Value::Bool(*b),
        TemplateValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        TemplateValue::String(s) => serde_json::Value::String(s.clone()),
        TemplateValue::Array(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        TemplateValue::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), to_json(v));
            }
            serde_json::Value::Object(out)
        }
    }
}

/// The inverse of [`to_json`], used when reading a persisted result back
/// off disk.
#[must_use]
pub fn from_json(value: &serde_json::Value) -> TemplateValue {
    match value {
        serde_json::Value::Null => TemplateValue::Null,
        serde_json::Value::Bool(b) => TemplateValue::Bool(*b),
        serde_json::Value::Number(n) => TemplateValue::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => TemplateValue::String(s.clone()),
        serde_json::Value::Array(items) => TemplateValue::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), from_json(v));
            }
            TemplateValue::Object(out)
        }
    }
}

/// Wrap a `TemplateError` as a `GardenError::Template` for callers outside
/// the template module.
pub fn to_garden_error(err: &TemplateError) -> crate::core::error::GardenError {
    crate::core::error::GardenError::Template {
        expression: err.source.clone(),
        source_name: None,
        offset: err.offset,
        reason: err.reason.clone(),
    }
}
