//! Small cross-cutting helpers shared by the loader, graph, and solver
//! layers: atomic file writes and directory creation.
//!
//! # Modules
//!
//! - [`fs`] - atomic writes and directory creation, used by the on-disk
//!   result cache and the project discovery walk.

pub mod fs;

pub use fs::{atomic_write, ensure_dir};
