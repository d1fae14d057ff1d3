//! Core types shared across the Config->Graph->Solver pipeline.
//!
//! - [`error`] — the [`GardenError`] taxonomy and [`ErrorContext`] wrapper.
//! - [`env`] — [`CoreEnv`], the explicit environment threaded through the
//!   Graph Builder and Solver in place of global mutable state.
//! - [`vcs`] — the narrow [`vcs::VcsHashProvider`] trait the Graph Builder
//!   consumes to compute action versions.

pub mod env;
pub mod error;
pub mod model;
pub mod vcs;

pub use env::{ConcurrencyLimits, CoreEnv, FailurePolicy};
pub use error::{ErrorContext, GardenError, user_friendly_error};
pub use model::{ActionKind, ActionMode, ActionRef};
pub use vcs::{FilesystemHashProvider, TrackedFile, VcsHashProvider};
