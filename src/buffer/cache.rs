use super::file::FileBuffer;
use crate::diff::Line;
use crate::error::{MergeError, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Owner of every FileBuffer, keyed by path. At most one buffer per path.
///
/// A cached buffer is reused instead of re-reading the file, which is what
/// keeps unsaved edits alive across re-alignment.
#[derive(Debug, Default)]
pub struct BufferCache {
    buffers: HashMap<PathBuf, FileBuffer>,
}

impl BufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached buffer for `path`, reading it from disk on first access
    pub fn load(&mut self, path: &Path) -> Result<&mut FileBuffer> {
        match self.buffers.entry(path.to_path_buf()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let buffer = FileBuffer::load(path)?;
                log::debug!("Loaded {} ({} lines)", path.display(), buffer.len());
                Ok(entry.insert(buffer))
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&FileBuffer> {
        self.buffers.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.buffers.contains_key(path)
    }

    pub fn insert_line(&mut self, path: &Path, index: usize, line: Line) -> Result<usize> {
        self.load(path)?.insert_at(index, line)
    }

    pub fn remove_line(&mut self, path: &Path, index: usize) -> Result<Line> {
        self.load(path)?.remove_at(index)
    }

    pub fn has_unsaved_changes(&self, path: &Path) -> bool {
        self.buffers.get(path).is_some_and(FileBuffer::is_dirty)
    }

    /// Dirty paths, sorted for stable display
    pub fn unsaved_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .buffers
            .values()
            .filter(|b| b.is_dirty())
            .map(|b| b.path().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    /// Write the buffer for `path` and evict it. Callers re-load to keep editing.
    pub fn save(&mut self, path: &Path) -> Result<()> {
        let buffer = self.buffers.get_mut(path).ok_or_else(|| MergeError::NotLoaded {
            path: path.to_path_buf(),
        })?;
        buffer.write()?;
        self.buffers.remove(path);
        log::info!("Saved {}", path.display());
        Ok(())
    }

    /// Drop the buffer for `path` without writing. Returns whether one existed.
    pub fn discard(&mut self, path: &Path) -> bool {
        self.buffers.remove(path).is_some()
    }

    /// Drop every buffer without writing. Returns how many were dropped.
    pub fn discard_all(&mut self) -> usize {
        let count = self.buffers.len();
        self.buffers.clear();
        count
    }
}

/// Absolute, symlink-resolved form of `path` so watcher events and user input
/// agree on cache keys. Works for paths that no longer exist by resolving the parent.
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(p) = std::fs::canonicalize(path) {
        return p;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            match std::fs::canonicalize(parent) {
                Ok(p) => p.join(name),
                Err(_) => path.to_path_buf(),
            }
        }
        _ => path.to_path_buf(),
    }
}
