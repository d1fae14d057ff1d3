//! The layered Config Context: an immutable, composable chain of scopes
//! that supplies values to template evaluation.
//!
//! Leaves first: [`project::ProjectContext`] (root) ->
//! [`environment::EnvironmentContext`] -> [`provider::ProviderContext`] ->
//! [`action_ref::ActionRefContext`] -> [`action_spec::ActionSpecContext`].
//! Each scope wraps its parent behind an `Arc<dyn EvalContext>`; a lookup
//! tries the scope's own keys first, then falls through to the parent.
//! Nothing here ever mutates a parent scope — a "shadowing" scope is just a
//! new struct holding an `Arc` to the one underneath, cheap to construct
//! and clone, and safe to share across concurrent readers and `await`
//! points.

pub mod action_ref;
pub mod action_spec;
pub mod environment;
pub mod project;
pub mod provider;
pub mod render_inputs;

pub use action_ref::{ActionOutputs, ActionRefContext};
pub use action_spec::ActionSpecContext;
pub use environment::EnvironmentContext;
pub use project::ProjectContext;
pub use provider::ProviderContext;
pub use render_inputs::RenderInputsContext;
