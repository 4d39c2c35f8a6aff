//! The surface a front end drives: compare two files, merge between them,
//! undo/redo, save, and react to changes on disk.
//!
//! Every merge call runs inside its own operation group and re-aligns the
//! pair before returning, so `comparison()` is always current.

use crate::buffer::{normalize_path, BufferCache, FileBuffer};
use crate::config::Config;
use crate::diff::{self, ClassifiedLine, DiffChunk, DiffStats, Direction, Line, Side};
use crate::error::{MergeError, Result};
use crate::history::{OperationLog, SingleOperation, Step};
use crate::merge::{self, LineEditor};
use crate::watch::{ChangeKind, FileChange};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// The current alignment of two files
#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub left: PathBuf,
    pub right: PathBuf,
    pub lines: Vec<ClassifiedLine>,
    pub chunks: Vec<DiffChunk>,
    pub stats: DiffStats,
}

impl Comparison {
    pub fn is_identical(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn path(&self, side: Side) -> &Path {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// What a merge call acts on, as positions in the current comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Index into `Comparison::lines`
    Line(usize),
    /// Index into `Comparison::chunks`
    Chunk(usize),
}

impl Target {
    fn label(self) -> &'static str {
        match self {
            Target::Line(_) => "line",
            Target::Chunk(_) => "chunk",
        }
    }
}

/// Outcome of a file change reported by the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not a compared file, or the disk content is what we already hold
    Ignored,
    /// The side had no unsaved edits and was re-read
    Reloaded,
    /// The side has unsaved edits; nothing was touched. `confirm_reload` discards them.
    Conflict { path: PathBuf },
    /// The file is gone; its buffer, if any, is kept
    Missing { path: PathBuf },
}

pub struct Engine {
    config: Config,
    cache: BufferCache,
    history: OperationLog,
    current: Option<Comparison>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        Engine {
            history: OperationLog::new(config.history.max_size),
            config,
            cache: BufferCache::new(),
            current: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn comparison(&self) -> Option<&Comparison> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &OperationLog {
        &self.history
    }

    /// Lines currently held for `path`, including unsaved edits
    pub fn buffer_lines(&self, path: &Path) -> Option<&[Line]> {
        self.cache.get(&normalize_path(path)).map(FileBuffer::lines)
    }

    // ── Comparison ──

    /// Load both files (reusing cached buffers) and align them.
    pub fn compare(&mut self, left: &Path, right: &Path) -> Result<&Comparison> {
        let (left, right) = (normalize_path(left), normalize_path(right));
        self.rebuild(left, right)?;
        self.current.as_ref().ok_or(MergeError::NoComparison)
    }

    /// Re-align the current pair from the cached buffers.
    pub fn refresh(&mut self) -> Result<&Comparison> {
        let current = self.current.as_ref().ok_or(MergeError::NoComparison)?;
        let (left, right) = (current.left.clone(), current.right.clone());
        self.rebuild(left, right)?;
        self.current.as_ref().ok_or(MergeError::NoComparison)
    }

    fn rebuild(&mut self, left: PathBuf, right: PathBuf) -> Result<()> {
        let max = self.config.files.max_lines;
        for path in [&left, &right] {
            let buffer = self.cache.load(path)?;
            if buffer.len() > max {
                return Err(MergeError::FileTooLarge {
                    path: path.clone(),
                    lines: buffer.len(),
                    max,
                });
            }
        }

        let not_loaded = |path: &Path| MergeError::NotLoaded {
            path: path.to_path_buf(),
        };
        let l = self.cache.get(&left).ok_or_else(|| not_loaded(left.as_path()))?;
        let r = self.cache.get(&right).ok_or_else(|| not_loaded(right.as_path()))?;

        let lines = diff::diff_lines(l.lines(), r.lines(), &self.config.diff);
        let chunks = diff::group(&lines);
        let stats = DiffStats::from_rows(&lines);
        log::debug!(
            "Compared {} and {}: {} rows, {} chunks",
            left.display(),
            right.display(),
            lines.len(),
            chunks.len()
        );

        self.current = Some(Comparison {
            left,
            right,
            lines,
            chunks,
            stats,
        });
        Ok(())
    }

    // ── Merge ──

    /// Make the target side match the source for one row or chunk.
    pub fn copy(&mut self, direction: Direction, target: Target) -> Result<()> {
        let description = format!("Copy {} to {}", target.label(), direction.target().label());
        self.gesture(description, |comparison, editor| match target {
            Target::Line(i) => merge::copy_line(&comparison.lines, direction, i, editor),
            Target::Chunk(c) => {
                merge::copy_chunk(&comparison.lines, direction, chunk_at(comparison, c)?, editor)
            }
        })
    }

    /// Replace the modified rows of a chunk on the target side, leaving its
    /// added and removed rows alone.
    pub fn copy_modified(&mut self, direction: Direction, chunk: usize) -> Result<()> {
        let description = format!("Replace modified lines in {}", direction.target().label());
        self.gesture(description, |comparison, editor| {
            merge::copy_modified_chunk(&comparison.lines, direction, chunk_at(comparison, chunk)?, editor)
        })
    }

    /// Remove a row's or chunk's lines from one side.
    pub fn delete(&mut self, side: Side, target: Target) -> Result<()> {
        let description = format!("Delete {} from {}", target.label(), side.label());
        self.gesture(description, |comparison, editor| match target {
            Target::Line(i) => merge::delete_line(&comparison.lines, side, i, editor),
            Target::Chunk(c) => {
                merge::delete_chunk(&comparison.lines, side, chunk_at(comparison, c)?, editor)
            }
        })
    }

    /// Run one user action as one operation group. A failure reverts the
    /// steps already applied and leaves no history entry.
    fn gesture<F>(&mut self, description: String, action: F) -> Result<()>
    where
        F: FnOnce(&Comparison, &mut Session<'_>) -> Result<()>,
    {
        let Engine {
            cache,
            history,
            current,
            ..
        } = self;
        let comparison = current.as_ref().ok_or(MergeError::NoComparison)?;

        history.begin(description.as_str());
        let mut session = Session::new(cache, history, Some(comparison));
        let result = action(comparison, &mut session);
        match &result {
            Ok(()) => {
                history.commit();
            }
            Err(e) => {
                log::warn!("{description} failed: {e}");
                if let Err(revert) = history.revert_open(|step| session.apply(step)) {
                    log::warn!("Could not revert partial '{description}': {revert}");
                }
            }
        }

        self.finish(result)
    }

    // ── History ──

    /// Revert the most recent group. Returns its description.
    pub fn undo(&mut self) -> Result<String> {
        let Engine {
            cache,
            history,
            current,
            ..
        } = self;
        let mut session = Session::new(cache, history, current.as_ref());
        let result = history.undo(|step| session.apply(step));
        if let Ok(description) = &result {
            log::info!("Undid '{description}'");
        }
        self.finish(result)
    }

    /// Re-apply the most recently undone group. Returns its description.
    pub fn redo(&mut self) -> Result<String> {
        let Engine {
            cache,
            history,
            current,
            ..
        } = self;
        let mut session = Session::new(cache, history, current.as_ref());
        let result = history.redo(|step| session.apply(step));
        if let Ok(description) = &result {
            log::info!("Redid '{description}'");
        }
        self.finish(result)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<String> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<String> {
        self.history.redo_description()
    }

    /// Re-align after a mutation. A refresh failure only wins over a
    /// successful result; an earlier error is returned as is.
    fn finish<T>(&mut self, result: Result<T>) -> Result<T> {
        if self.current.is_none() {
            return result;
        }
        let refreshed = self.refresh().map(|_| ());
        match (result, refreshed) {
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Err(refresh)) => {
                log::warn!("Refresh after failed operation also failed: {refresh}");
                Err(e)
            }
            (result, Ok(())) => result,
        }
    }

    // ── Saving ──

    pub fn has_unsaved_changes(&self, path: &Path) -> bool {
        self.cache.has_unsaved_changes(&normalize_path(path))
    }

    /// Every path with unsaved edits, sorted
    pub fn unsaved_files(&self) -> Vec<PathBuf> {
        self.cache.unsaved_paths()
    }

    /// Write the buffer for `path` to disk and evict it.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.cache.save(&normalize_path(path))
    }

    /// Save each path, attempting all of them before reporting failures.
    pub fn save_all(&mut self, paths: &[PathBuf]) -> Result<()> {
        let failures: Vec<MergeError> = paths.iter().filter_map(|p| self.save(p).err()).collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(MergeError::SaveAll { failures })
        }
    }

    /// Drop every buffer without writing and forget history, then
    /// re-compare from disk. Returns how many buffers were dropped.
    pub fn discard_all(&mut self) -> usize {
        let count = self.cache.discard_all();
        self.history.clear();
        log::info!("Discarded {count} buffer(s)");

        if self.current.is_some() {
            let refreshed = self.refresh().map(|_| ());
            if let Err(e) = refreshed {
                log::warn!("Could not reload comparison: {e}");
                self.current = None;
            }
        }
        count
    }

    // ── External changes ──

    /// Decide what to do about a file that changed on disk. Never touches a
    /// buffer with unsaved edits.
    pub fn file_changed(&mut self, change: &FileChange) -> Result<Reconciliation> {
        let path = normalize_path(&change.path);
        let Some(current) = &self.current else {
            return Ok(Reconciliation::Ignored);
        };
        if path != current.left && path != current.right {
            return Ok(Reconciliation::Ignored);
        }

        if change.kind == ChangeKind::Removed || !path.exists() {
            log::warn!("{} was removed", path.display());
            return Ok(Reconciliation::Missing { path });
        }

        let bytes = std::fs::read(&path).map_err(|e| MergeError::io("read", &path, e))?;
        match self.cache.get(&path) {
            Some(buffer) if buffer.matches_disk(&bytes) => Ok(Reconciliation::Ignored),
            Some(buffer) if buffer.is_dirty() => {
                log::warn!("{} changed on disk but has unsaved edits", path.display());
                Ok(Reconciliation::Conflict { path })
            }
            _ => {
                self.cache.discard(&path);
                self.history.forget(&path);
                self.refresh()?;
                log::info!("Reloaded {}", path.display());
                Ok(Reconciliation::Reloaded)
            }
        }
    }

    /// Discard the buffer for `path`, unsaved edits included, and re-read it.
    /// History touching `path` is dropped with it.
    pub fn confirm_reload(&mut self, path: &Path) -> Result<()> {
        let path = normalize_path(path);
        self.cache.discard(&path);
        self.history.forget(&path);
        log::info!("Reloading {} at user request", path.display());
        if self.current.is_some() {
            self.refresh()?;
        }
        Ok(())
    }
}

fn chunk_at(comparison: &Comparison, index: usize) -> Result<DiffChunk> {
    comparison.chunks.get(index).copied().ok_or_else(|| {
        MergeError::invalid_row(
            index,
            format!("no such chunk ({} in comparison)", comparison.chunks.len()),
        )
    })
}

/// Buffer access for one merge or replay: applies primitives to the cache and
/// records each one. Records made during replay are dropped by the log.
struct Session<'a> {
    cache: &'a mut BufferCache,
    history: &'a OperationLog,
    pair: Option<(&'a Path, &'a Path)>,
}

impl<'a> Session<'a> {
    fn new(cache: &'a mut BufferCache, history: &'a OperationLog, comparison: Option<&'a Comparison>) -> Self {
        Session {
            cache,
            history,
            pair: comparison.map(|c| (c.left.as_path(), c.right.as_path())),
        }
    }

    fn path(&self, side: Side) -> Result<&'a Path> {
        let (left, right) = self.pair.ok_or(MergeError::NoComparison)?;
        Ok(match side {
            Side::Left => left,
            Side::Right => right,
        })
    }

    /// The other file of the pair, if `path` is one of them
    fn counterpart(&self, path: &Path) -> Option<PathBuf> {
        let (left, right) = self.pair?;
        if path == left {
            Some(right.to_path_buf())
        } else if path == right {
            Some(left.to_path_buf())
        } else {
            None
        }
    }

    fn insert(&mut self, path: &Path, index: usize, content: &str) -> Result<usize> {
        let landed = self.cache.insert_line(path, index, content.to_string())?;
        self.history.record(SingleOperation::Copy {
            source: self.counterpart(path),
            target: path.to_path_buf(),
            line_number: index,
            content: content.to_string(),
            insert_index: landed,
        });
        Ok(landed)
    }

    fn remove(&mut self, path: &Path, index: usize) -> Result<Line> {
        let content = self.cache.remove_line(path, index)?;
        self.history.record(SingleOperation::Remove {
            target: path.to_path_buf(),
            line_number: index,
            content: content.clone(),
        });
        Ok(content)
    }

    fn apply(&mut self, step: Step<'_>) -> Result<()> {
        match step {
            Step::Insert {
                path,
                index,
                content,
            } => self.insert(path, index, content).map(|_| ()),
            Step::Remove { path, index } => self.remove(path, index).map(|_| ()),
        }
    }
}

impl LineEditor for Session<'_> {
    fn insert_line(&mut self, side: Side, index: usize, content: &str) -> Result<usize> {
        let path = self.path(side)?;
        self.insert(path, index, content)
    }

    fn remove_line(&mut self, side: Side, index: usize) -> Result<Line> {
        let path = self.path(side)?;
        self.remove(path, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        left: PathBuf,
        right: PathBuf,
        engine: Engine,
    }

    impl Fixture {
        fn new(left: &str, right: &str) -> Self {
            Self::with_config(left, right, Config::default())
        }

        fn with_config(left: &str, right: &str, config: Config) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let l = dir.path().join("left.txt");
            let r = dir.path().join("right.txt");
            std::fs::write(&l, left).unwrap();
            std::fs::write(&r, right).unwrap();
            Fixture {
                _dir: dir,
                left: l,
                right: r,
                engine: Engine::new(config),
            }
        }

        fn compare(&mut self) -> Comparison {
            self.engine.compare(&self.left, &self.right).unwrap().clone()
        }

        fn lines(&self, side: Side) -> Vec<String> {
            let path = match side {
                Side::Left => &self.left,
                Side::Right => &self.right,
            };
            self.engine.buffer_lines(path).unwrap().to_vec()
        }
    }

    // ── compare ──

    #[test]
    fn identical_files_compare_identical() {
        let mut fx = Fixture::new("a\nb\nc\n", "a\nb\nc\n");
        let cmp = fx.compare();
        assert!(cmp.is_identical());
        assert_eq!(cmp.lines.len(), 3);
    }

    #[test]
    fn compare_reports_chunks_and_stats() {
        let mut fx = Fixture::new("a\nb\nc\n", "a\nX\nc\nd\n");
        let cmp = fx.compare();
        assert_eq!(cmp.chunks.len(), 2);
        assert_eq!(cmp.stats.modified, 1);
        assert_eq!(cmp.stats.added, 1);
    }

    #[test]
    fn compare_rejects_binary_file() {
        let mut fx = Fixture::new("a\n", "b\n");
        std::fs::write(&fx.right, [0u8, 1, 2]).unwrap();
        let err = fx.engine.compare(&fx.left, &fx.right).unwrap_err();
        assert!(matches!(err, MergeError::BinaryFile { .. }));
    }

    #[test]
    fn compare_rejects_file_over_line_cap() {
        let mut config = Config::default();
        config.files.max_lines = 2;
        let mut fx = Fixture::with_config("a\nb\nc\n", "a\n", config);
        let err = fx.engine.compare(&fx.left, &fx.right).unwrap_err();
        assert!(matches!(err, MergeError::FileTooLarge { lines: 3, max: 2, .. }));
    }

    #[test]
    fn merge_before_compare_is_no_comparison() {
        let mut engine = Engine::new(Config::default());
        let err = engine.copy(Direction::LeftToRight, Target::Line(0)).unwrap_err();
        assert!(matches!(err, MergeError::NoComparison));
    }

    // ── copy / delete ──

    #[test]
    fn copy_added_line_left_then_undo_and_redo() {
        let mut fx = Fixture::new("a\nb\n", "a\nb\nc\n");
        let cmp = fx.compare();
        assert_eq!(cmp.chunks.len(), 1);

        fx.engine.copy(Direction::RightToLeft, Target::Line(2)).unwrap();
        assert_eq!(fx.lines(Side::Left), ["a", "b", "c"]);
        assert!(fx.engine.comparison().unwrap().is_identical());
        assert!(fx.engine.has_unsaved_changes(&fx.left));
        assert_eq!(fx.engine.undo_description().as_deref(), Some("Copy line to left"));

        assert_eq!(fx.engine.undo().unwrap(), "Copy line to left");
        assert_eq!(fx.lines(Side::Left), ["a", "b"]);
        assert_eq!(fx.engine.comparison().unwrap().chunks.len(), 1);

        assert_eq!(fx.engine.redo().unwrap(), "Copy line to left");
        assert_eq!(fx.lines(Side::Left), ["a", "b", "c"]);
        assert!(!fx.engine.can_redo());
    }

    #[test]
    fn copy_chunk_is_one_undo_step() {
        let mut fx = Fixture::new("a\nb\nc\nd\nz\n", "a\nX\nz\n");
        fx.compare();
        fx.engine.copy(Direction::LeftToRight, Target::Chunk(0)).unwrap();
        assert_eq!(fx.lines(Side::Right), ["a", "b", "c", "d", "z"]);
        assert_eq!(fx.engine.history().undo_len(), 1);

        fx.engine.undo().unwrap();
        assert_eq!(fx.lines(Side::Right), ["a", "X", "z"]);
        assert!(!fx.engine.can_undo());
    }

    #[test]
    fn delete_added_chunk_and_undo_restores_order() {
        let mut fx = Fixture::new("a\nz\n", "a\nb\nc\nz\n");
        fx.compare();
        fx.engine.delete(Side::Right, Target::Chunk(0)).unwrap();
        assert_eq!(fx.lines(Side::Right), ["a", "z"]);

        fx.engine.undo().unwrap();
        assert_eq!(fx.lines(Side::Right), ["a", "b", "c", "z"]);
    }

    #[test]
    fn copy_modified_replaces_without_inserting() {
        let mut fx = Fixture::new("a\nb\nc\nz\n", "a\nB\nz\n");
        fx.compare();
        fx.engine.copy_modified(Direction::LeftToRight, 0).unwrap();
        assert_eq!(fx.lines(Side::Right), ["a", "b", "z"]);
        assert_eq!(
            fx.engine.undo_description().as_deref(),
            Some("Replace modified lines in right")
        );
    }

    #[test]
    fn invalid_target_leaves_no_history() {
        let mut fx = Fixture::new("a\n", "b\n");
        fx.compare();
        let err = fx.engine.copy(Direction::LeftToRight, Target::Chunk(3)).unwrap_err();
        assert!(matches!(err, MergeError::InvalidLineIndex { index: 3, .. }));
        let err = fx.engine.delete(Side::Left, Target::Line(9)).unwrap_err();
        assert!(matches!(err, MergeError::InvalidLineIndex { index: 9, .. }));
        assert!(!fx.engine.can_undo());
        assert!(!fx.engine.history().is_open());
    }

    #[test]
    fn undo_with_empty_history_is_benign() {
        let mut fx = Fixture::new("a\n", "a\n");
        fx.compare();
        let err = fx.engine.undo().unwrap_err();
        assert!(err.is_benign());
    }

    #[test]
    fn new_gesture_clears_redo() {
        let mut fx = Fixture::new("a\n", "a\nb\nc\n");
        fx.compare();
        fx.engine.copy(Direction::LeftToRight, Target::Chunk(0)).unwrap();
        fx.engine.undo().unwrap();
        assert!(fx.engine.can_redo());
        fx.engine.delete(Side::Right, Target::Line(1)).unwrap();
        assert!(!fx.engine.can_redo());
    }

    // ── save / discard ──

    #[test]
    fn save_writes_merged_content() {
        let mut fx = Fixture::new("a\nb\n", "a\nb\nc\n");
        fx.compare();
        fx.engine.copy(Direction::RightToLeft, Target::Chunk(0)).unwrap();
        assert_eq!(fx.engine.unsaved_files().len(), 1);

        fx.engine.save(&fx.left).unwrap();
        assert!(!fx.engine.has_unsaved_changes(&fx.left));
        assert_eq!(std::fs::read_to_string(&fx.left).unwrap(), "a\nb\nc\n");
        assert!(fx.engine.unsaved_files().is_empty());
    }

    #[test]
    fn save_all_attempts_every_path() {
        let mut fx = Fixture::new("a\n", "a\nb\n");
        fx.compare();
        fx.engine.delete(Side::Right, Target::Chunk(0)).unwrap();
        let ghost = fx.left.with_file_name("ghost.txt");

        let err = fx.engine.save_all(&[ghost, fx.right.clone()]).unwrap_err();
        assert!(matches!(err, MergeError::SaveAll { ref failures } if failures.len() == 1));
        assert_eq!(std::fs::read_to_string(&fx.right).unwrap(), "a\n");
    }

    #[test]
    fn discard_all_restores_disk_and_clears_history() {
        let mut fx = Fixture::new("a\n", "a\nb\n");
        fx.compare();
        fx.engine.delete(Side::Right, Target::Chunk(0)).unwrap();
        assert!(fx.engine.comparison().unwrap().is_identical());

        assert_eq!(fx.engine.discard_all(), 2);
        assert!(!fx.engine.can_undo());
        assert!(fx.engine.unsaved_files().is_empty());
        assert_eq!(fx.engine.comparison().unwrap().chunks.len(), 1);
    }

    // ── external changes ──

    #[test]
    fn clean_side_changed_on_disk_is_reloaded() {
        let mut fx = Fixture::new("a\n", "a\n");
        fx.compare();
        std::fs::write(&fx.right, "a\nb\n").unwrap();

        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert_eq!(outcome, Reconciliation::Reloaded);
        assert_eq!(fx.engine.comparison().unwrap().chunks.len(), 1);
    }

    #[test]
    fn dirty_side_changed_on_disk_is_conflict() {
        let mut fx = Fixture::new("a\n", "a\nb\n");
        fx.compare();
        fx.engine.delete(Side::Right, Target::Chunk(0)).unwrap();
        std::fs::write(&fx.right, "something else\n").unwrap();

        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert!(matches!(outcome, Reconciliation::Conflict { .. }));
        assert_eq!(fx.lines(Side::Right), ["a"]);
        assert!(fx.engine.has_unsaved_changes(&fx.right));

        fx.engine.confirm_reload(&fx.right).unwrap();
        assert_eq!(fx.lines(Side::Right), ["something else"]);
        assert!(!fx.engine.has_unsaved_changes(&fx.right));
    }

    #[test]
    fn unchanged_content_and_other_files_are_ignored() {
        let mut fx = Fixture::new("a\n", "b\n");
        fx.compare();
        let touched = FileChange::observe(fx.left.clone());
        assert_eq!(fx.engine.file_changed(&touched).unwrap(), Reconciliation::Ignored);

        let other = fx.left.with_file_name("other.txt");
        std::fs::write(&other, "x").unwrap();
        let outcome = fx.engine.file_changed(&FileChange::observe(other)).unwrap();
        assert_eq!(outcome, Reconciliation::Ignored);
    }

    #[test]
    fn confirm_reload_forgets_history_for_that_file() {
        let mut fx = Fixture::new("a\n", "a\nb\n");
        fx.compare();
        fx.engine.delete(Side::Right, Target::Chunk(0)).unwrap();
        std::fs::write(&fx.right, "q\nr\ns\n").unwrap();

        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert!(matches!(outcome, Reconciliation::Conflict { .. }));
        fx.engine.confirm_reload(&fx.right).unwrap();

        assert!(!fx.engine.can_undo());
        assert!(fx.engine.undo().unwrap_err().is_benign());
        assert_eq!(fx.lines(Side::Right), ["q", "r", "s"]);
        assert!(!fx.engine.has_unsaved_changes(&fx.right));
    }

    #[test]
    fn reloaded_side_forgets_history_for_that_file() {
        let mut fx = Fixture::new("a\nb\n", "a\n");
        fx.compare();
        fx.engine.copy(Direction::LeftToRight, Target::Line(1)).unwrap();
        fx.engine.save(&fx.right).unwrap();
        std::fs::write(&fx.right, "x\ny\nz\n").unwrap();

        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert_eq!(outcome, Reconciliation::Reloaded);
        assert!(!fx.engine.can_undo());
        assert!(!fx.engine.can_redo());
        assert_eq!(fx.lines(Side::Right), ["x", "y", "z"]);
    }

    #[test]
    fn reload_keeps_history_of_the_other_file() {
        let mut fx = Fixture::new("a\nb\n", "a\n");
        fx.compare();
        fx.engine.delete(Side::Left, Target::Line(1)).unwrap();
        std::fs::write(&fx.right, "a\nc\n").unwrap();

        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert_eq!(outcome, Reconciliation::Reloaded);
        assert_eq!(fx.engine.undo().unwrap(), "Delete line from left");
        assert_eq!(fx.lines(Side::Left), ["a", "b"]);
    }

    #[test]
    fn failed_copy_reverts_applied_steps() {
        let mut fx = Fixture::new("a\nb\nc", "a\nX\nY");
        fx.compare();
        // Saving evicts the buffer; the shorter file is re-read on the next
        // edit while the comparison still describes three lines.
        fx.engine.save(&fx.right).unwrap();
        std::fs::write(&fx.right, "a\nX").unwrap();

        let err = fx.engine.copy(Direction::LeftToRight, Target::Chunk(0)).unwrap_err();
        assert!(matches!(err, MergeError::InvalidIndex { index: 3, .. }));
        assert_eq!(fx.lines(Side::Right), ["a", "X"]);
        assert!(!fx.engine.can_undo());
        assert!(!fx.engine.history().is_open());
    }

    #[test]
    fn removed_file_is_missing_and_buffer_kept() {
        let mut fx = Fixture::new("a\n", "b\n");
        fx.compare();
        std::fs::remove_file(&fx.right).unwrap();
        let outcome = fx.engine.file_changed(&FileChange::observe(fx.right.clone())).unwrap();
        assert!(matches!(outcome, Reconciliation::Missing { .. }));
        assert_eq!(fx.lines(Side::Right), ["b"]);
    }

    fn file_text() -> impl Strategy<Value = String> {
        prop::collection::vec("[abc]{1,2}", 0..8).prop_map(|lines| {
            lines.iter().map(|l| format!("{l}\n")).collect::<String>()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// Copy then undo restores both buffers; redo re-applies exactly
        #[test]
        fn copy_line_undo_redo_round_trip(left in file_text(), right in file_text(), pick in 0usize..16, to_right in any::<bool>()) {
            let mut fx = Fixture::new(&left, &right);
            let rows = fx.compare().lines;
            prop_assume!(!rows.is_empty());
            let before = (fx.lines(Side::Left), fx.lines(Side::Right));
            let direction = if to_right { Direction::LeftToRight } else { Direction::RightToLeft };

            fx.engine.copy(direction, Target::Line(pick % rows.len())).unwrap();
            let after = (fx.lines(Side::Left), fx.lines(Side::Right));

            if fx.engine.can_undo() {
                fx.engine.undo().unwrap();
                prop_assert_eq!((fx.lines(Side::Left), fx.lines(Side::Right)), before);
                fx.engine.redo().unwrap();
            }
            prop_assert_eq!((fx.lines(Side::Left), fx.lines(Side::Right)), after);
        }

        /// Deleting a line then undoing puts it back where it was
        #[test]
        fn delete_line_undo_round_trip(left in file_text(), right in file_text(), pick in 0usize..16) {
            let mut fx = Fixture::new(&left, &right);
            let rows = fx.compare().lines;
            prop_assume!(!rows.is_empty());
            let before = fx.lines(Side::Left);

            fx.engine.delete(Side::Left, Target::Line(pick % rows.len())).unwrap();
            if fx.engine.can_undo() {
                fx.engine.undo().unwrap();
            }
            prop_assert_eq!(fx.lines(Side::Left), before);
        }
    }
}
