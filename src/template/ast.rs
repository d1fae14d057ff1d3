//! The template AST.
//!
//! A template string parses into a tree of [`Node`]s exactly once per
//! unique source string (parsing is pure; callers may memoize via
//! [`crate::template::cache::AstCache`]). Binary operators are
//! right-recursive in the grammar but built left-associative here via
//! precedence climbing in the parser — the tree itself just nests
//! [`Node::Binary`] nodes.

use std::sync::Arc;

/// One segment of a dotted lookup path: `a.b[0]["x"]`.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A plain or quoted identifier (`b`, `"x"`).
    Key(String),
    /// A computed index/key (`[0]`, `["x"]`, `[var.i]`).
    Index(Box<Node>),
}

/// Binary operators, in ascending precedence order as grouped by the
/// parser (`||` lowest, `*`/`/`/`%` highest before unary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Contains,
}

/// A template AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A literal string produced by parsing plain (non-`${}`) text.
    Literal(String),
    /// A numeric literal.
    Number(f64),
    /// A boolean literal.
    Bool(bool),
    /// The `null` literal.
    Null,
    /// A dotted context lookup.
    Path(Vec<PathSegment>),
    /// An array literal `[a, b, c]`.
    Array(Vec<Node>),
    /// An object literal `{a: 1, b: 2}`, order-preserving.
    Object(Vec<(String, Node)>),
    /// A helper function call.
    Call { name: String, args: Vec<Node> },
    /// Logical negation `!expr`.
    Not(Box<Node>),
    /// A binary operator application.
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    /// `cond ? then : else`.
    Ternary {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    /// `lhs ?? rhs` — coalesce with unresolved/absent.
    Coalesce { lhs: Box<Node>, rhs: Box<Node> },
    /// A template string made of interleaved literal and interpolated
    /// parts. When it has exactly one part and that part is not a plain
    /// `Literal`, evaluation preserves the part's native type instead of
    /// stringifying it.
    Concat(Vec<Node>),

    // --- Structural operators (recognized at the container-loading layer,
    // never produced by the expression parser itself). ---
    /// `{$merge: <base>, k: v, ...}` — evaluate `base` to a map, then
    /// overlay the evaluated ordinary keys on top.
    Merge {
        base: Box<Node>,
        overlay: Vec<(String, Node)>,
    },
    /// A list element `{$concat: <list>}` that splices the evaluated list
    /// into the surrounding array in place.
    ConcatSplice(Box<Node>),
    /// `{$if: <cond>, then: <node>, else: <node>?}`.
    If {
        cond: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Option<Box<Node>>,
    },
    /// `{$forEach: <value>, into: <template>}`.
    ForEach {
        value: Box<Node>,
        into: Box<Node>,
    },
}

impl Node {
    /// Wrap this node in an `Arc`, for storage inside an
    /// [`crate::template::value::UnresolvedValue`].
    #[must_use]
    pub fn into_arc(self) -> Arc<Node> {
        Arc::new(self)
    }

    /// Recursively scan this node for `actions.<kind>.<name>.version` and
    /// `actions.<kind>.<name>.outputs[...]` lookups, used by the Graph
    /// Builder to discover implicit dependencies hiding inside a `spec` or
    /// `variables` tree that was left unresolved at preprocess time.
    ///
    /// Only plain (unquoted-or-quoted) key segments are recognized; a
    /// computed `actions[x].build[y]`-style index is invisible to this
    /// static scan (an acceptable gap: such a reference degrades to "no
    /// implicit edge recorded" rather than a false edge).
    pub fn scan_action_refs(&self, out: &mut Vec<ActionPathRef>) {
        if let Node::Path(segments) = self {
            if let [PathSegment::Key(head), PathSegment::Key(kind), PathSegment::Key(name), rest @ ..] =
                segments.as_slice()
            {
                if head == "actions" {
                    let field = match rest.first() {
                        Some(PathSegment::Key(f)) if f == "version" => Some(ActionPathField::Version),
                        Some(PathSegment::Key(f)) if f == "outputs" => {
                            let key = match rest.get(1) {
                                Some(PathSegment::Key(key)) => key.clone(),
                                _ => String::new(),
                            };
                            Some(ActionPathField::Outputs { key })
                        }
                        _ => None,
                    };
                    if let Some(field) = field {
                        out.push(ActionPathRef {
                            kind: kind.clone(),
                            name: name.clone(),
                            field,
                        });
                    }
                }
            }
            for seg in segments {
                if let PathSegment::Index(inner) = seg {
                    inner.scan_action_refs(out);
                }
            }
            return;
        }
        match self {
            Node::Array(items) | Node::Concat(items) => {
                for item in items {
                    item.scan_action_refs(out);
                }
            }
            Node::Object(entries) => {
                for (_, v) in entries {
                    v.scan_action_refs(out);
                }
            }
            Node::Call { args, .. } => {
                for arg in args {
                    arg.scan_action_refs(out);
                }
            }
            Node::Not(inner) | Node::ConcatSplice(inner) => inner.scan_action_refs(out),
            Node::Binary { lhs, rhs, .. } | Node::Coalesce { lhs, rhs } => {
                lhs.scan_action_refs(out);
                rhs.scan_action_refs(out);
            }
            Node::Ternary {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.scan_action_refs(out);
                then_branch.scan_action_refs(out);
                else_branch.scan_action_refs(out);
            }
            Node::Merge { base, overlay } => {
                base.scan_action_refs(out);
                for (_, v) in overlay {
                    v.scan_action_refs(out);
                }
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
            } => {
                cond.scan_action_refs(out);
                then_branch.scan_action_refs(out);
                if let Some(else_branch) = else_branch {
                    else_branch.scan_action_refs(out);
                }
            }
            Node::ForEach { value, into } => {
                value.scan_action_refs(out);
                into.scan_action_refs(out);
            }
            Node::Path(_) => unreachable!("handled above"),
            Node::Literal(_) | Node::Number(_) | Node::Bool(_) | Node::Null => {}
        }
    }
}

/// One `actions.<kind>.<name>` reference found inside a template tree, and
/// which field of that action it reaches into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPathRef {
    pub kind: String,
    pub name: String,
    pub field: ActionPathField,
}

/// Whether a discovered reference reaches a statically-known field
/// (`version`) or a named entry of the action's `outputs` map. `Outputs`
/// carries the referenced key (`actions.build.api.outputs.imageId` ->
/// `"imageId"`) so the Graph Builder can classify the reference as a
/// *static* or *runtime* output per 3. *Version*/4.5 (an empty key means
/// `outputs` was referenced wholesale, e.g. `actions.build.api.outputs`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionPathField {
    Version,
    Outputs { key: String },
}

/// Render a [`Node`] produced by [`crate::template::parser::parse_template`]
/// back into template source such that re-parsing it with `parse_template`
/// yields an equal AST (8. "Round-trip": `parseTemplate(serialize(ast)) ==
/// ast`). A top-level [`Node::Literal`] or a [`Node::Concat`]'s literal
/// parts are emitted as raw text; every other node renders as an
/// expression (quoting string literals, fully parenthesizing operators so
/// reparsing is insensitive to precedence) and is wrapped in `${ }` when it
/// sits at template level.
///
/// Structural-operator variants (`Merge`/`ConcatSplice`/`If`/`ForEach`) are
/// never produced by the expression parser — they're rewritten directly
/// from YAML by [`crate::template::operators::load`] — so they have no
/// serialize form; reaching one here is a caller error.
#[must_use]
pub fn serialize(node: &Node) -> String {
    match node {
        Node::Literal(s) => s.clone(),
        Node::Concat(parts) => parts.iter().map(serialize_template_part).collect(),
        other => format!("${{{}}}", serialize_expr(other)),
    }
}

fn serialize_template_part(node: &Node) -> String {
    match node {
        Node::Literal(s) => s.clone(),
        other => format!("${{{}}}", serialize_expr(other)),
    }
}

fn serialize_expr(node: &Node) -> String {
    match node {
        Node::Literal(s) => quote_string(s),
        Node::Number(n) => serialize_number(*n),
        Node::Bool(b) => b.to_string(),
        Node::Null => "null".to_string(),
        Node::Path(segments) => serialize_path(segments),
        Node::Array(items) => format!("[{}]", items.iter().map(serialize_expr).collect::<Vec<_>>().join(", ")),
        Node::Object(entries) => {
            let body = entries
                .iter()
                .map(|(k, v)| format!("{}: {}", serialize_key(k), serialize_expr(v)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{{{body}}}")
        }
        Node::Call { name, args } => {
            format!("{name}({})", args.iter().map(serialize_expr).collect::<Vec<_>>().join(", "))
        }
        Node::Not(inner) => format!("!({})", serialize_expr(inner)),
        Node::Binary { op, lhs, rhs } => {
            format!("({} {} {})", serialize_expr(lhs), binary_op_str(*op), serialize_expr(rhs))
        }
        Node::Ternary {
            cond,
            then_branch,
            else_branch,
        } => format!(
            "({} ? {} : {})",
            serialize_expr(cond),
            serialize_expr(then_branch),
            serialize_expr(else_branch)
        ),
        Node::Coalesce { lhs, rhs } => format!("({} ?? {})", serialize_expr(lhs), serialize_expr(rhs)),
        Node::Concat(_) => unreachable!("Concat never nests inside an expression"),
        Node::Merge { .. } | Node::ConcatSplice(_) | Node::If { .. } | Node::ForEach { .. } => {
            unreachable!("structural operators are rewritten by the container loader, never produced by the expression parser")
        }
    }
}

fn binary_op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Or => "||",
        BinaryOp::And => "&&",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Contains => "contains",
    }
}

fn serialize_path(segments: &[PathSegment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        match seg {
            PathSegment::Key(name) if i == 0 => out.push_str(name),
            PathSegment::Key(name) if is_bare_ident(name) => {
                out.push('.');
                out.push_str(name);
            }
            PathSegment::Key(name) => {
                out.push('[');
                out.push_str(&quote_string(name));
                out.push(']');
            }
            PathSegment::Index(inner) => {
                out.push('[');
                out.push_str(&serialize_expr(inner));
                out.push(']');
            }
        }
    }
    out
}

fn serialize_key(name: &str) -> String {
    if is_bare_ident(name) {
        name.to_string()
    } else {
        quote_string(name)
    }
}

/// Whether `name` lexes as a single bare identifier token usable directly
/// after a `.` or as an object key (`lexer::Lexer::lex_ident`'s charset),
/// excluding the three reserved words that lex as their own token instead.
fn is_bare_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else { return false };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return false;
    }
    !matches!(name, "true" | "false" | "null")
}

fn serialize_number(n: f64) -> String {
    if n < 0.0 {
        format!("(0 - {})", serialize_number(-n))
    } else {
        format!("{n}")
    }
}

fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parser::parse_template;

    #[test]
    fn scan_action_refs_captures_the_outputs_key() {
        let node = parse_template("${actions.build.api.outputs.imageId}").unwrap();
        let mut refs = Vec::new();
        node.scan_action_refs(&mut refs);
        assert_eq!(
            refs,
            vec![ActionPathRef {
                kind: "build".to_string(),
                name: "api".to_string(),
                field: ActionPathField::Outputs { key: "imageId".to_string() },
            }]
        );
    }

    #[test]
    fn scan_action_refs_captures_a_version_reference() {
        let node = parse_template("${actions.build.api.version}").unwrap();
        let mut refs = Vec::new();
        node.scan_action_refs(&mut refs);
        assert_eq!(
            refs,
            vec![ActionPathRef {
                kind: "build".to_string(),
                name: "api".to_string(),
                field: ActionPathField::Version,
            }]
        );
    }

    #[test]
    fn serialize_quotes_string_literals_nested_in_an_expression() {
        // A bare top-level `${"hello"}` collapses to the same `Literal` a
        // plain-text template parses to, so it round-trips through raw
        // text rather than a re-quoted interpolation — but a string
        // literal *nested* inside a call still needs quoting to parse back.
        let node = parse_template(r#"${join(["hello", "world"])}"#).unwrap();
        let out = serialize(&node);
        assert_eq!(parse_template(&out).unwrap(), node);
        assert!(out.contains("\"hello\""));
    }

    #[test]
    fn serialize_bare_path_round_trips() {
        let node = parse_template("${environment.name}").unwrap();
        let out = serialize(&node);
        assert_eq!(parse_template(&out).unwrap(), node);
    }

    #[test]
    fn serialize_binary_round_trips_regardless_of_original_parens() {
        let node = parse_template("${var.x * 2 + 1}").unwrap();
        let out = serialize(&node);
        assert_eq!(parse_template(&out).unwrap(), node);
    }

    #[test]
    fn serialize_concat_round_trips_literal_and_interpolation() {
        let node = parse_template("${environment.name}-${var.x * 2}").unwrap();
        let out = serialize(&node);
        assert_eq!(parse_template(&out).unwrap(), node);
    }

    #[test]
    fn serialize_quoted_index_round_trips() {
        let node = parse_template(r#"${a["my-key"]}"#).unwrap();
        let out = serialize(&node);
        assert_eq!(parse_template(&out).unwrap(), node);
    }
}
