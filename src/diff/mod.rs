mod align;
pub mod chunk;
mod classify;
mod line;

pub use align::align;
pub use chunk::{group, DiffChunk};
pub use classify::{classify, inline_highlight};
pub use line::{ClassifiedLine, Direction, InlineHighlight, Line, LineKind, Side};

use crate::config::DiffConfig;
use serde::{Deserialize, Serialize};

/// Align and classify two files. Pure; never fails.
pub fn diff_lines(left: &[Line], right: &[Line], config: &DiffConfig) -> Vec<ClassifiedLine> {
    classify(align(left, right, config.algorithm), config)
}

/// Row counts per kind, for status display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

impl DiffStats {
    pub fn from_rows(rows: &[ClassifiedLine]) -> Self {
        rows.iter().fold(DiffStats::default(), |mut stats, row| {
            match row.kind {
                LineKind::Added => stats.added += 1,
                LineKind::Removed => stats.removed += 1,
                LineKind::Modified => stats.modified += 1,
                LineKind::Same => {}
            }
            stats
        })
    }
}
