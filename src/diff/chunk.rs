use super::line::ClassifiedLine;
use serde::{Deserialize, Serialize};

/// A maximal run of non-`same` rows, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    pub start_index: usize,
    pub end_index: usize,
}

impl DiffChunk {
    pub fn row_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    pub fn contains(&self, row: usize) -> bool {
        (self.start_index..=self.end_index).contains(&row)
    }
}

/// Fold classified rows into chunks with a single left-to-right scan.
pub fn group(rows: &[ClassifiedLine]) -> Vec<DiffChunk> {
    let mut chunks = Vec::new();
    let mut open: Option<usize> = None;

    for (i, row) in rows.iter().enumerate() {
        match (row.is_change(), open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                chunks.push(DiffChunk {
                    start_index: start,
                    end_index: i - 1,
                });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        chunks.push(DiffChunk {
            start_index: start,
            end_index: rows.len() - 1,
        });
    }

    chunks
}

// ── Navigation ──

pub fn first(chunks: &[DiffChunk]) -> Option<usize> {
    if chunks.is_empty() {
        None
    } else {
        Some(0)
    }
}

pub fn last(chunks: &[DiffChunk]) -> Option<usize> {
    chunks.len().checked_sub(1)
}

/// Index of the chunk covering `row`
pub fn containing(chunks: &[DiffChunk], row: usize) -> Option<usize> {
    chunks.iter().position(|c| c.contains(row))
}

/// First chunk that starts after `row`
pub fn next_after(chunks: &[DiffChunk], row: usize) -> Option<usize> {
    chunks.iter().position(|c| c.start_index > row)
}

/// Last chunk that ends before `row`
pub fn prev_before(chunks: &[DiffChunk], row: usize) -> Option<usize> {
    chunks.iter().rposition(|c| c.end_index < row)
}
