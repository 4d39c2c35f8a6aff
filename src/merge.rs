//! Copy and delete operations over a classified alignment.
//!
//! Every function takes row or chunk positions in the *current* row
//! sequence and translates them to file line numbers at call time. They are
//! stateless: history and re-alignment belong to the caller, and any row or
//! chunk list is stale once one of these has run.

use crate::diff::{ClassifiedLine, DiffChunk, Direction, Line, LineKind, Side};
use crate::error::{MergeError, Result};

/// Line-level mutation of the two compared files, 1-based like `FileBuffer`.
pub trait LineEditor {
    /// Insert before the line at `index`. Returns where the line landed.
    fn insert_line(&mut self, side: Side, index: usize, content: &str) -> Result<usize>;
    /// Remove the line at `index`, returning its content.
    fn remove_line(&mut self, side: Side, index: usize) -> Result<Line>;
}

/// Make the destination match the source for one row.
///
/// A source-only row is inserted after the nearest preceding row that has a
/// destination line, which may be a changed row rather than a `same` one, so
/// repeated single-line copies inside a chunk keep the source's order.
/// A destination-only row is deleted. A modified row replaces the destination
/// line in place. `same` rows are left alone.
pub fn copy_line(
    rows: &[ClassifiedLine],
    direction: Direction,
    index: usize,
    editor: &mut impl LineEditor,
) -> Result<()> {
    let row = row_at(rows, index)?;
    let (src, dst) = (direction.source(), direction.target());

    match (row.number(src), row.number(dst)) {
        (Some(_), Some(_)) if row.kind == LineKind::Same => Ok(()),
        (Some(_), Some(at)) => replace(editor, dst, at, row.text(src)),
        (Some(_), None) => {
            let at = anchor(rows, index, dst) + 1;
            editor.insert_line(dst, at, row.text(src))?;
            Ok(())
        }
        (None, Some(_)) => delete_line(rows, dst, index, editor),
        (None, None) => Err(MergeError::invalid_row(index, "row has no line on either side")),
    }
}

/// Make the destination match the source across a whole chunk.
///
/// Rows are processed top to bottom with a running destination cursor, so
/// inserted lines keep the source's order and deletions never invalidate a
/// later row's position.
pub fn copy_chunk(
    rows: &[ClassifiedLine],
    direction: Direction,
    chunk: DiffChunk,
    editor: &mut impl LineEditor,
) -> Result<()> {
    let span = chunk_rows(rows, chunk)?;
    let (src, dst) = (direction.source(), direction.target());

    if span.iter().all(|row| row.number(src).is_none()) {
        return delete_chunk(rows, dst, chunk, editor);
    }

    let mut cursor = anchor(rows, chunk.start_index, dst) + 1;
    for row in span {
        match (row.number(src), row.number(dst)) {
            (Some(_), Some(_)) if row.kind == LineKind::Same => cursor += 1,
            (Some(_), Some(_)) => {
                replace(editor, dst, cursor, row.text(src))?;
                cursor += 1;
            }
            (Some(_), None) => {
                cursor = editor.insert_line(dst, cursor, row.text(src))? + 1;
            }
            (None, Some(_)) => {
                editor.remove_line(dst, cursor)?;
            }
            (None, None) => {}
        }
    }
    Ok(())
}

/// Remove the row's line from `side`. Rows with no line there are a no-op.
pub fn delete_line(
    rows: &[ClassifiedLine],
    side: Side,
    index: usize,
    editor: &mut impl LineEditor,
) -> Result<()> {
    if let Some(number) = row_at(rows, index)?.number(side) {
        editor.remove_line(side, number)?;
    }
    Ok(())
}

/// Remove every line the chunk has on `side`, highest line number first.
pub fn delete_chunk(
    rows: &[ClassifiedLine],
    side: Side,
    chunk: DiffChunk,
    editor: &mut impl LineEditor,
) -> Result<()> {
    let mut numbers: Vec<usize> = chunk_rows(rows, chunk)?
        .iter()
        .filter_map(|row| row.number(side))
        .collect();
    numbers.sort_unstable_by(|a, b| b.cmp(a));

    for number in numbers {
        editor.remove_line(side, number)?;
    }
    Ok(())
}

/// Replace each modified row's destination line with the source line.
/// Added and removed rows in the chunk are left untouched.
pub fn copy_modified_chunk(
    rows: &[ClassifiedLine],
    direction: Direction,
    chunk: DiffChunk,
    editor: &mut impl LineEditor,
) -> Result<()> {
    let (src, dst) = (direction.source(), direction.target());
    for row in chunk_rows(rows, chunk)? {
        if row.kind != LineKind::Modified {
            continue;
        }
        if let Some(at) = row.number(dst) {
            replace(editor, dst, at, row.text(src))?;
        }
    }
    Ok(())
}

fn replace(editor: &mut impl LineEditor, side: Side, at: usize, content: &str) -> Result<()> {
    editor.remove_line(side, at)?;
    editor.insert_line(side, at, content)?;
    Ok(())
}

fn row_at(rows: &[ClassifiedLine], index: usize) -> Result<&ClassifiedLine> {
    rows.get(index).ok_or_else(|| {
        MergeError::invalid_row(index, format!("only {} rows in comparison", rows.len()))
    })
}

fn chunk_rows(rows: &[ClassifiedLine], chunk: DiffChunk) -> Result<&[ClassifiedLine]> {
    if chunk.start_index > chunk.end_index || chunk.end_index >= rows.len() {
        return Err(MergeError::invalid_row(
            chunk.end_index,
            format!(
                "chunk {}..={} outside {} rows",
                chunk.start_index,
                chunk.end_index,
                rows.len()
            ),
        ));
    }
    Ok(&rows[chunk.start_index..=chunk.end_index])
}

/// Last line number on `side` above row `before`, or 0 at the top of the file
fn anchor(rows: &[ClassifiedLine], before: usize, side: Side) -> usize {
    rows[..before.min(rows.len())]
        .iter()
        .rev()
        .find_map(|row| row.number(side))
        .unwrap_or(0)
}
