//! Errors raised while parsing or evaluating templates.

use thiserror::Error;

/// A parse or evaluation failure, always carrying the offending source text
/// and a byte offset into it so the failure can be pinpointed without
/// re-parsing (per the core error-handling design, template errors always
/// include the source expression and position).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} (at byte {offset} in `{source}`)")]
pub struct TemplateError {
    /// The full template/expression source that was being processed.
    pub source: String,
    /// Byte offset into `source` where the failure was detected.
    pub offset: usize,
    /// Human-readable description of the failure.
    pub reason: String,
}

impl TemplateError {
    /// Construct a new error anchored at `offset` in `source`.
    pub fn new(source: impl Into<String>, offset: usize, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            offset,
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the template module.
pub type TemplateResult<T> = Result<T, TemplateError>;
