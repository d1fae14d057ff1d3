//! Atomic, cross-platform file and directory operations.
//!
//! The Solver's on-disk result cache and the loader's discovery walk are
//! the only consumers left in this tree; everything else the teacher's
//! `fs` module offered (parallel copy, checksum batching, format-specific
//! readers) belonged to the installer pipeline and isn't needed here.

pub mod atomic;
pub mod dirs;

pub use atomic::atomic_write;
pub use dirs::ensure_dir;
