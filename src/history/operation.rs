use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One primitive mutation, with enough detail to replay or invert it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SingleOperation {
    /// A line inserted into `target`. `line_number` is the requested position,
    /// `insert_index` where the line actually landed.
    Copy {
        source: Option<PathBuf>,
        target: PathBuf,
        line_number: usize,
        content: String,
        insert_index: usize,
    },
    /// A line removed from `target` at `line_number`
    Remove {
        target: PathBuf,
        line_number: usize,
        content: String,
    },
}

/// A buffer primitive to run during undo/redo replay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a> {
    Insert {
        path: &'a Path,
        index: usize,
        content: &'a str,
    },
    Remove {
        path: &'a Path,
        index: usize,
    },
}

impl SingleOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            SingleOperation::Copy { .. } => "copy",
            SingleOperation::Remove { .. } => "remove",
        }
    }

    pub fn target(&self) -> &Path {
        match self {
            SingleOperation::Copy { target, .. } | SingleOperation::Remove { target, .. } => target,
        }
    }

    /// The step that cancels this operation
    pub fn inverse(&self) -> Step<'_> {
        match self {
            SingleOperation::Copy {
                target, insert_index, ..
            } => Step::Remove {
                path: target,
                index: *insert_index,
            },
            SingleOperation::Remove {
                target,
                line_number,
                content,
            } => Step::Insert {
                path: target,
                index: *line_number,
                content,
            },
        }
    }

    /// The step that re-applies this operation exactly as recorded
    pub fn forward(&self) -> Step<'_> {
        match self {
            SingleOperation::Copy {
                target,
                insert_index,
                content,
                ..
            } => Step::Insert {
                path: target,
                index: *insert_index,
                content,
            },
            SingleOperation::Remove {
                target, line_number, ..
            } => Step::Remove {
                path: target,
                index: *line_number,
            },
        }
    }
}

/// Operations undone and redone as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationGroup {
    pub id: Uuid,
    pub description: String,
    pub operations: Vec<SingleOperation>,
    pub timestamp: DateTime<Utc>,
}

impl OperationGroup {
    pub fn new(description: impl Into<String>) -> Self {
        OperationGroup {
            id: Uuid::new_v4(),
            description: description.into(),
            operations: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Group for a mutation recorded outside any explicit transaction
    pub fn single(op: SingleOperation) -> Self {
        let mut group = OperationGroup::new(format!("{} line", op.kind()));
        group.operations.push(op);
        group
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copy_op() -> SingleOperation {
        SingleOperation::Copy {
            source: Some(PathBuf::from("left.txt")),
            target: PathBuf::from("right.txt"),
            line_number: 7,
            content: "hello".to_string(),
            insert_index: 4,
        }
    }

    fn remove_op() -> SingleOperation {
        SingleOperation::Remove {
            target: PathBuf::from("left.txt"),
            line_number: 2,
            content: "bye".to_string(),
        }
    }

    #[test]
    fn copy_is_inverted_by_removing_where_it_landed() {
        let op = copy_op();
        assert_eq!(
            op.inverse(),
            Step::Remove {
                path: Path::new("right.txt"),
                index: 4
            }
        );
        assert_eq!(
            op.forward(),
            Step::Insert {
                path: Path::new("right.txt"),
                index: 4,
                content: "hello"
            }
        );
    }

    #[test]
    fn remove_is_inverted_by_reinserting_content() {
        let op = remove_op();
        assert_eq!(
            op.inverse(),
            Step::Insert {
                path: Path::new("left.txt"),
                index: 2,
                content: "bye"
            }
        );
        assert_eq!(
            op.forward(),
            Step::Remove {
                path: Path::new("left.txt"),
                index: 2
            }
        );
    }

    #[test]
    fn single_group_is_named_after_operation() {
        let group = OperationGroup::single(remove_op());
        assert_eq!(group.description, "remove line");
        assert_eq!(group.operations.len(), 1);
    }

    #[test]
    fn operation_serializes_with_type_tag() {
        let json = serde_json::to_string(&copy_op()).unwrap();
        assert!(json.contains("\"type\":\"copy\""));
        assert!(json.contains("\"insert_index\":4"));
    }
}
