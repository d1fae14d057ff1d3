//! garden-core - the Config->Graph->Solver engine behind the `garden` CLI.
//!
//! A project's actions (builds, deploys, runs, tests) are declared across
//! `garden.yml` documents, resolved into a dependency graph, and executed
//! by a concurrency-bounded solver with on-disk result caching.
//!
//! # Pipeline
//!
//! - [`template`] - the structural-operator-aware expression/value engine
//!   (`$merge`, `$concat`, `$if`, `$forEach`, `${...}` interpolation)
//! - [`context`] - the layered evaluation context (project -> environment
//!   -> provider -> action)
//! - [`action`] - typed config documents produced by the loader
//! - [`loader`] - discovers and parses `garden.yml` documents, expands
//!   `ConfigTemplate`/`RenderTemplate` pairs
//! - [`convert`] - fans legacy `Module` documents out into native actions
//! - [`graph`] - builds the validated action dependency graph
//! - [`solver`] - schedules and executes graph tasks, with caching
//! - [`core`] - shared types, error taxonomy, environment, and VCS hashing
//! - [`cli`] - the thin command-line entry point used by `src/main.rs`
//! - [`utils`] - atomic filesystem helpers carried from the original
//!   package manager core

pub mod action;
pub mod cli;
pub mod context;
pub mod convert;
pub mod core;
pub mod graph;
pub mod loader;
pub mod solver;
pub mod template;
pub mod utils;
