//! Shared infrastructure utilities for Comfort Kit.
//!
//! - **`atomic_write`**: Crash-safe file persistence (temp + rename) used by the
//!   durable store so a torn write never leaves a half-written scope file.

pub mod atomic_write;

pub use atomic_write::{PersistMode, atomic_write, recover_bak_file};
