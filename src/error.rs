//! Error types for the diff/merge engine.
//!
//! Alignment, classification and grouping are pure and never fail. Everything
//! here originates at the buffer, history or engine boundary and is passed to
//! the caller unchanged.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MergeError>;

#[derive(Debug, Error)]
pub enum MergeError {
    /// A row or chunk reference that does not exist in the current comparison,
    /// or a row without a line on the side the operation needs.
    #[error("Invalid line index {index}: {reason}")]
    InvalidLineIndex { index: usize, reason: String },

    /// A 1-based buffer position outside the file.
    #[error("Line {index} is out of range for {} ({len} lines)", path.display())]
    InvalidIndex {
        path: PathBuf,
        index: usize,
        len: usize,
    },

    #[error("Failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not valid UTF-8 text: {source}", path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("Cannot compare binary file: {}", path.display())]
    BinaryFile { path: PathBuf },

    #[error("File too large for comparison: {} has {lines} lines (max {max})", path.display())]
    FileTooLarge {
        path: PathBuf,
        lines: usize,
        max: usize,
    },

    #[error("Nothing to undo")]
    NothingToUndo,

    #[error("Nothing to redo")]
    NothingToRedo,

    #[error("No comparison loaded")]
    NoComparison,

    #[error("No buffer loaded for {}", path.display())]
    NotLoaded { path: PathBuf },

    /// One or more files of a batch save failed. Every path was attempted.
    #[error("Failed to save {} file(s): {}", .failures.len(), join_messages(.failures))]
    SaveAll { failures: Vec<MergeError> },

    /// An undo/redo that stopped part-way through its group. The files are
    /// left in whatever state the completed steps produced.
    #[error("Failed to {action} '{description}': {source}")]
    Replay {
        action: &'static str,
        description: String,
        #[source]
        source: Box<MergeError>,
    },
}

impl MergeError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MergeError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_row(index: usize, reason: impl Into<String>) -> Self {
        MergeError::InvalidLineIndex {
            index,
            reason: reason.into(),
        }
    }

    /// Empty-history errors are expected; the UI just disables the control.
    pub fn is_benign(&self) -> bool {
        matches!(self, MergeError::NothingToUndo | MergeError::NothingToRedo)
    }
}

fn join_messages(errors: &[MergeError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
