use crate::buffer::normalize_path;
use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

/// What happened to a watched file once the debounce window closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Removed,
}

/// A change to one of the compared files, as seen on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    /// Classify a change by whether the path still exists
    pub fn observe(path: PathBuf) -> Self {
        let kind = if path.exists() {
            ChangeKind::Modified
        } else {
            ChangeKind::Removed
        };
        FileChange { path, kind }
    }
}

/// Events emitted by the file watcher
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// A compared file changed on disk. Informational: the engine decides
    /// whether to reload.
    FileChanged(FileChange),
}

/// A debounced watcher over a fixed set of files.
///
/// Parent directories are watched rather than the files themselves, so an
/// editor's rename-over-save keeps being observed.
pub struct FileWatcher {
    _watcher: notify_debouncer_mini::Debouncer<RecommendedWatcher>,
    files: Vec<PathBuf>,
}

impl FileWatcher {
    /// Start watching `paths`. Changes are sent to `tx` after `debounce_ms`
    /// milliseconds of quiet, at most one event per file per window.
    pub fn new(paths: &[PathBuf], debounce_ms: u64, tx: mpsc::Sender<WatchEvent>) -> Result<Self> {
        let files: Vec<PathBuf> = paths.iter().map(|p| normalize_path(p)).collect();
        let dirs: BTreeSet<PathBuf> = files
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();

        let targets = files.clone();
        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |result: std::result::Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                let events = match result {
                    Ok(events) => events,
                    Err(e) => {
                        log::warn!("File watcher error: {e}");
                        return;
                    }
                };

                let changed: BTreeSet<PathBuf> = events
                    .iter()
                    .filter(|e| e.kind == DebouncedEventKind::Any)
                    .map(|e| normalize_path(&e.path))
                    .filter(|p| targets.contains(p))
                    .collect();

                for path in changed {
                    let change = FileChange::observe(path);
                    log::debug!("{:?} {}", change.kind, change.path.display());
                    if tx.send(WatchEvent::FileChanged(change)).is_err() {
                        log::debug!("Watch receiver dropped");
                        return;
                    }
                }
            },
        )
        .context("Failed to start file watcher")?;

        for dir in &dirs {
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::NonRecursive)
                .with_context(|| format!("Failed to watch {}", dir.display()))?;
        }

        Ok(FileWatcher {
            _watcher: debouncer,
            files,
        })
    }

    /// The normalized paths being watched
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}
