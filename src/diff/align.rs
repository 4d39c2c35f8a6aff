use super::line::{ClassifiedLine, Line};
use crate::config::DiffAlgorithm;
use similar::{capture_diff_slices, Algorithm, DiffOp};

impl DiffAlgorithm {
    fn to_similar(self) -> Algorithm {
        match self {
            DiffAlgorithm::Myers => Algorithm::Myers,
            DiffAlgorithm::Lcs => Algorithm::Lcs,
            DiffAlgorithm::Patience => Algorithm::Patience,
        }
    }
}

/// Align two files line by line using exact line equality.
///
/// Emits a `same` row for every matched pair, a `removed` row for every
/// left-only line and an `added` row for every right-only line, in document
/// order. Between two matched pairs all removed rows come before all added
/// rows, so disjoint files produce every left line followed by every right line.
/// No `modified` rows are produced here.
pub fn align(left: &[Line], right: &[Line], algorithm: DiffAlgorithm) -> Vec<ClassifiedLine> {
    let ops = capture_diff_slices(algorithm.to_similar(), left, right);

    let mut rows = Vec::with_capacity(left.len().max(right.len()));
    let mut pending_removed: Vec<usize> = Vec::new();
    let mut pending_added: Vec<usize> = Vec::new();

    for op in ops {
        match op {
            DiffOp::Equal {
                old_index,
                new_index,
                len,
            } => {
                flush_gap(&mut rows, left, right, &mut pending_removed, &mut pending_added);
                for k in 0..len {
                    rows.push(ClassifiedLine::same(
                        old_index + k + 1,
                        new_index + k + 1,
                        &left[old_index + k],
                    ));
                }
            }
            DiffOp::Delete {
                old_index, old_len, ..
            } => {
                pending_removed.extend(old_index..old_index + old_len);
            }
            DiffOp::Insert {
                new_index, new_len, ..
            } => {
                pending_added.extend(new_index..new_index + new_len);
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                pending_removed.extend(old_index..old_index + old_len);
                pending_added.extend(new_index..new_index + new_len);
            }
        }
    }
    flush_gap(&mut rows, left, right, &mut pending_removed, &mut pending_added);

    rows
}

/// Emit the unmatched lines between two anchors: removed first, then added.
fn flush_gap(
    rows: &mut Vec<ClassifiedLine>,
    left: &[Line],
    right: &[Line],
    removed: &mut Vec<usize>,
    added: &mut Vec<usize>,
) {
    for i in removed.drain(..) {
        rows.push(ClassifiedLine::removed(i + 1, &left[i]));
    }
    for j in added.drain(..) {
        rows.push(ClassifiedLine::added(j + 1, &right[j]));
    }
}
