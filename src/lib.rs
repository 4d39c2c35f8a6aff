//! Side-by-side line diff and merge engine.
//!
//! Two files are aligned into classified rows (`diff`), grouped into chunks,
//! and merged line by line or chunk by chunk through an [`engine::Engine`]
//! that keeps every edit undoable.

pub mod buffer;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod history;
pub mod merge;
pub mod watch;

pub use engine::{Comparison, Engine, Reconciliation, Target};
pub use error::{MergeError, Result};
