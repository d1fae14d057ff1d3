//! Integration test suite for garden-core.
//!
//! End-to-end scenarios driving the full Config->Graph->Solver pipeline
//! through its public API, the way the `garden` CLI does.
//!
//! # Running
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! Organized by scenario:
//! - **template_basics**: interpolation and layered context lookup
//! - **structural_merge**: `$merge`/`$if` structural operators
//! - **pipeline**: load -> convert -> graph -> solver, status vs process edges
//! - **cache_hit**: a `Run` action's second execution is served from the
//!   on-disk result cache without invoking the plugin again
//! - **abort_on_failure**: a failed dependency cancels its dependants but
//!   not unrelated siblings

mod abort_on_failure;
mod cache_hit;
mod pipeline;
mod structural_merge;
mod template_basics;
