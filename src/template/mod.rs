//! The template engine: lexing, parsing, and evaluating `${ ... }`
//! expressions and structural operators (`$merge`, `$concat`, `$if`,
//! `$forEach`) with support for partial evaluation.
//!
//! The pipeline is: raw YAML document -> [`operators::load`] rewrites
//! reserved keys into AST nodes and parses every scalar string with
//! [`parser::parse_template`] -> [`evaluate::evaluate`] walks the tree
//! against a context implementing [`value::EvalContext`].

pub mod ast;
pub mod cache;
pub mod error;
pub mod evaluate;
pub mod functions;
pub mod lexer;
pub mod operators;
pub mod parser;
pub mod value;

pub use ast::{serialize, ActionPathField, ActionPathRef, Node};
pub use error::{TemplateError, TemplateResult};
pub use evaluate::{deep_evaluate, evaluate, evaluate_template};
pub use value::{EvalContext, Lookup, TemplateValue, UnresolvedValue, from_json, from_yaml, to_json, to_garden_error};
