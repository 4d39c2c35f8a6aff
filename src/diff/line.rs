use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A single line of text with its terminator stripped.
pub type Line = String;

/// How a row of the alignment relates the two files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Same,
    Added,
    Removed,
    Modified,
}

impl LineKind {
    /// Gutter mark used by the text renderer
    pub fn symbol(&self) -> char {
        match self {
            LineKind::Same => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
            LineKind::Modified => '~',
        }
    }
}

/// Which file of the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Direction of a copy between the two files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn source(self) -> Side {
        match self {
            Direction::LeftToRight => Side::Left,
            Direction::RightToLeft => Side::Right,
        }
    }

    pub fn target(self) -> Side {
        self.source().other()
    }
}

/// Byte ranges of the differing text inside a modified pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineHighlight {
    pub left: Range<usize>,
    pub right: Range<usize>,
}

/// One row of the alignment between two files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedLine {
    pub kind: LineKind,
    pub left_number: Option<usize>,
    pub right_number: Option<usize>,
    pub left_text: String,
    pub right_text: String,
    /// Present only for `Modified` rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<InlineHighlight>,
}

impl ClassifiedLine {
    pub fn same(left_number: usize, right_number: usize, text: &str) -> Self {
        ClassifiedLine {
            kind: LineKind::Same,
            left_number: Some(left_number),
            right_number: Some(right_number),
            left_text: text.to_string(),
            right_text: text.to_string(),
            highlight: None,
        }
    }

    pub fn removed(left_number: usize, text: &str) -> Self {
        ClassifiedLine {
            kind: LineKind::Removed,
            left_number: Some(left_number),
            right_number: None,
            left_text: text.to_string(),
            right_text: String::new(),
            highlight: None,
        }
    }

    pub fn added(right_number: usize, text: &str) -> Self {
        ClassifiedLine {
            kind: LineKind::Added,
            left_number: None,
            right_number: Some(right_number),
            left_text: String::new(),
            right_text: text.to_string(),
            highlight: None,
        }
    }

    /// Line number on `side`, if the row has a line there
    pub fn number(&self, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.left_number,
            Side::Right => self.right_number,
        }
    }

    pub fn text(&self, side: Side) -> &str {
        match side {
            Side::Left => &self.left_text,
            Side::Right => &self.right_text,
        }
    }

    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Same
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_source_and_target_are_opposite() {
        assert_eq!(Direction::LeftToRight.source(), Side::Left);
        assert_eq!(Direction::LeftToRight.target(), Side::Right);
        assert_eq!(Direction::RightToLeft.source(), Side::Right);
        assert_eq!(Direction::RightToLeft.target(), Side::Left);
    }

    #[test]
    fn removed_row_has_no_right_number() {
        let row = ClassifiedLine::removed(4, "gone");
        assert_eq!(row.number(Side::Left), Some(4));
        assert_eq!(row.number(Side::Right), None);
        assert_eq!(row.text(Side::Right), "");
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ClassifiedLine::added(1, "x")).unwrap();
        assert!(json.contains("\"kind\":\"added\""));
        assert!(!json.contains("highlight"));
    }
}
