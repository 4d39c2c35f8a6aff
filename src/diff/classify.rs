use super::line::{ClassifiedLine, InlineHighlight, LineKind};
use crate::config::DiffConfig;
use similar::TextDiff;

/// Re-pair removed/added blocks into modified rows.
///
/// For every run of removed rows immediately followed by a run of added rows,
/// the first removed row is paired with the first added row, the second with
/// the second, and so on up to the shorter run. Leftovers keep their kind.
/// With `min_similarity` set, a block is only paired when every pair reaches
/// that similarity ratio.
pub fn classify(rows: Vec<ClassifiedLine>, config: &DiffConfig) -> Vec<ClassifiedLine> {
    let mut out = Vec::with_capacity(rows.len());
    let mut iter = rows.into_iter().peekable();

    while let Some(row) = iter.next() {
        if row.kind != LineKind::Removed {
            out.push(row);
            continue;
        }

        let mut removed = vec![row];
        while let Some(next) = iter.next_if(|r| r.kind == LineKind::Removed) {
            removed.push(next);
        }
        let mut added = Vec::new();
        while let Some(next) = iter.next_if(|r| r.kind == LineKind::Added) {
            added.push(next);
        }

        let paired = removed.len().min(added.len());
        if paired == 0 || !block_is_similar(&removed[..paired], &added[..paired], config) {
            out.extend(removed);
            out.extend(added);
            continue;
        }

        let mut removed = removed.into_iter();
        let mut added = added.into_iter();
        for (left, right) in removed.by_ref().zip(added.by_ref()).take(paired) {
            out.push(modified(left, right, config.inline_length_ratio));
        }
        out.extend(removed);
        out.extend(added);
    }

    out
}

fn block_is_similar(removed: &[ClassifiedLine], added: &[ClassifiedLine], config: &DiffConfig) -> bool {
    let Some(threshold) = config.min_similarity else {
        return true;
    };
    removed
        .iter()
        .zip(added)
        .all(|(l, r)| TextDiff::from_chars(l.left_text.as_str(), r.right_text.as_str()).ratio() >= threshold)
}

fn modified(left: ClassifiedLine, right: ClassifiedLine, length_ratio: f64) -> ClassifiedLine {
    let highlight = inline_highlight(&left.left_text, &right.right_text, length_ratio);
    ClassifiedLine {
        kind: LineKind::Modified,
        left_number: left.left_number,
        right_number: right.right_number,
        left_text: left.left_text,
        right_text: right.right_text,
        highlight: Some(highlight),
    }
}

/// Differing span of a modified pair, by common prefix/suffix trimming.
///
/// Ranges are byte offsets on char boundaries. Prefix and suffix never overlap.
/// When the lengths differ by more than `length_ratio` of the shorter line the
/// whole of both lines is returned.
pub fn inline_highlight(left: &str, right: &str, length_ratio: f64) -> InlineHighlight {
    let left_chars = left.chars().count();
    let right_chars = right.chars().count();
    let shorter = left_chars.min(right_chars);

    if left_chars.abs_diff(right_chars) as f64 > shorter as f64 * length_ratio {
        return InlineHighlight {
            left: 0..left.len(),
            right: 0..right.len(),
        };
    }

    let mut prefix_chars = 0;
    let mut prefix_bytes = 0;
    for (a, b) in left.chars().zip(right.chars()) {
        if a != b {
            break;
        }
        prefix_chars += 1;
        prefix_bytes += a.len_utf8();
    }

    let mut suffix_bytes = 0;
    for (a, b) in left
        .chars()
        .rev()
        .zip(right.chars().rev())
        .take(shorter - prefix_chars)
    {
        if a != b {
            break;
        }
        suffix_bytes += a.len_utf8();
    }

    InlineHighlight {
        left: prefix_bytes..left.len() - suffix_bytes,
        right: prefix_bytes..right.len() - suffix_bytes,
    }
}
