//! Error taxonomy for the Garden core.
//!
//! This module defines [`GardenError`], the strongly-typed error enum used
//! throughout the Config->Graph->Solver pipeline, and [`ErrorContext`], a
//! wrapper that attaches a user-facing suggestion and extra detail for
//! callers (such as the `garden` CLI shim) that want to render a friendlier
//! message than `Display` alone provides.
//!
//! # Error categories
//!
//! The variants map 1:1 onto the taxonomy table in the core specification:
//!
//! | Kind | Meaning |
//! |------|---------|
//! | [`Configuration`] | Invalid config document, schema violation |
//! | [`Template`] | Template parse or evaluation failure |
//! | [`Validation`] | Graph invariant violated (cycle, bad reference) |
//! | [`Plugin`] | A plugin handler returned an error |
//! | [`Timeout`] | A task exceeded its effective timeout |
//! | [`Cancellation`] | A task was cancelled by a peer failure or signal |
//! | [`Internal`] | An unexpected core invariant was violated |
//!
//! [`Configuration`]: GardenError::Configuration
//! [`Template`]: GardenError::Template
//! [`Validation`]: GardenError::Validation
//! [`Plugin`]: GardenError::Plugin
//! [`Timeout`]: GardenError::Timeout
//! [`Cancellation`]: GardenError::Cancellation
//! [`Internal`]: GardenError::Internal

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The primary error type returned by Garden core operations.
#[derive(Error, Debug, Clone)]
pub enum GardenError {
    /// An action/module/provider config document failed to parse or violated
    /// its schema.
    #[error("configuration error in {document}: {reason}")]
    Configuration {
        /// The document (file path, or a synthetic name for generated docs)
        /// in which the error was found.
        document: String,
        /// Human-readable description of what was wrong.
        reason: String,
    },

    /// A template failed to parse, or evaluation hit a missing key, type
    /// mismatch, or function-argument error.
    ///
    /// Always carries the offending expression text and its byte offset so
    /// the failure can be pinpointed without re-parsing.
    #[error("template error at byte {offset} in {}: {reason}", source_name.as_deref().unwrap_or("<expr>"))]
    Template {
        /// The source expression text that failed.
        expression: String,
        /// Name of the field/file the expression came from, if known.
        source_name: Option<String>,
        /// Byte offset into `expression` where the failure occurred.
        offset: usize,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// A graph invariant was violated: a dependency cycle, a reference to a
    /// nonexistent action, or a kind-constraint mismatch (e.g. a `build`
    /// field pointing at a non-Build action).
    #[error("graph validation failed: {reason}")]
    Validation {
        /// Description of the violated invariant.
        reason: String,
    },

    /// A plugin handler (`getStatus`, `build`, `deploy`, ...) returned an
    /// error while processing the named action.
    #[error("plugin error for {kind}.{name}: {reason}")]
    Plugin {
        /// The action kind (`build`, `deploy`, `run`, `test`).
        kind: String,
        /// The action name.
        name: String,
        /// The plugin-reported failure reason.
        reason: String,
    },

    /// A task's effective timeout elapsed before it completed.
    #[error("{kind}.{name} timed out after {seconds}s")]
    Timeout {
        /// The action kind.
        kind: String,
        /// The action name.
        name: String,
        /// The effective timeout that elapsed.
        seconds: u64,
    },

    /// A task was cancelled because a peer it (transitively) depended on
    /// failed under the abort-on-failure policy, or because the caller
    /// requested cancellation. Not surfaced as a failure to end users.
    #[error("{kind}.{name} was cancelled")]
    Cancellation {
        /// The action kind.
        kind: String,
        /// The action name.
        name: String,
    },

    /// An unexpected internal invariant was violated. Indicates a bug in
    /// Garden itself rather than in user configuration.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the violated invariant.
        message: String,
    },

    /// Wraps a lower-level I/O failure encountered while reading config
    /// documents or persisting cache entries.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for GardenError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for GardenError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Configuration {
            document: "<yaml>".to_string(),
            reason: err.to_string(),
        }
    }
}

/// A `GardenError` enriched with a suggestion and extra detail, for
/// presentation to a human. The core never needs this internally; it exists
/// for the CLI shim and tests that assert on user-facing text.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    error: GardenError,
    details: Option<String>,
    suggestion: Option<String>,
}

impl ErrorContext {
    /// Wrap an error with no additional context yet.
    #[must_use]
    pub fn new(error: GardenError) -> Self {
        Self {
            error,
            details: None,
            suggestion: None,
        }
    }

    /// Attach background detail explaining why the error occurred.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach an actionable suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Access the underlying error.
    #[must_use]
    pub fn error(&self) -> &GardenError {
        &self.error
    }

    /// Print the error, its detail and its suggestion to stderr in color.
    pub fn display(&self) {
        eprintln!("{}", format!("error: {}", self.error).red().bold());
        if let Some(details) = &self.details {
            eprintln!("  {}", details.dimmed());
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("  {} {}", "hint:".cyan().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n  {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  hint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error implementing `std::error::Error` into a user-friendly
/// [`ErrorContext`], attaching a suggestion for the categories that have an
/// obvious one.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(garden_err) = error.downcast_ref::<GardenError>() {
        let ctx = ErrorContext::new(garden_err.clone());
        return match garden_err {
            GardenError::Configuration { .. } => {
                ctx.with_suggestion("check the document's `kind`/`type`/`name` fields against the action config schema")
            }
            GardenError::Template { .. } => {
                ctx.with_suggestion("check the referenced context key exists at this resolution stage")
            }
            GardenError::Validation { .. } => {
                ctx.with_suggestion("inspect `dependencies` and template references for a cycle or a typo'd action name")
            }
            GardenError::Plugin { .. } => ctx.with_suggestion("see the plugin's own output above for detail"),
            GardenError::Timeout { .. } => ctx.with_suggestion("increase the action's `timeout` field if the operation is expected to run long"),
            _ => ctx,
        };
    }
    ErrorContext::new(GardenError::Internal {
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_error_display_includes_offset() {
        let err = GardenError::Template {
            expression: "${actions.build.api.outputs.missing}".to_string(),
            source_name: Some("spec.image".to_string()),
            offset: 9,
            reason: "key 'missing' not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("byte 9"));
        assert!(text.contains("spec.image"));
    }

    #[test]
    fn user_friendly_error_wraps_garden_error_with_suggestion() {
        let err: anyhow::Error = GardenError::Validation {
            reason: "cycle: build.api -> deploy.api -> build.api".to_string(),
        }
        .into();
        let ctx = user_friendly_error(err);
        assert!(ctx.suggestion.is_some());
    }
}
