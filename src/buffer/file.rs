use crate::diff::Line;
use crate::error::{MergeError, Result};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How many leading bytes are inspected for binary content
const BINARY_SNIFF_LEN: usize = 512;
/// Share of control bytes above which content is treated as binary
const BINARY_CONTROL_RATIO: f64 = 0.3;

/// In-memory, line-indexed view of one file
#[derive(Debug, Clone)]
pub struct FileBuffer {
    path: PathBuf,
    lines: Vec<Line>,
    dirty: bool,
    trailing_newline: bool,
    disk_hash: String,
}

impl FileBuffer {
    /// Read a file from disk and split it into lines.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| MergeError::io("read", path, e))?;
        Self::from_bytes(path, bytes)
    }

    /// Decode raw file content. Rejects binary and non-UTF-8 input.
    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        if is_binary(&bytes) {
            return Err(MergeError::BinaryFile {
                path: path.to_path_buf(),
            });
        }
        let disk_hash = content_hash(&bytes);
        let text = String::from_utf8(bytes).map_err(|source| MergeError::Encoding {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(FileBuffer {
            path: path.to_path_buf(),
            lines: split_lines(&text),
            dirty: false,
            trailing_newline: text.ends_with('\n') || text.ends_with('\r'),
            disk_hash,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Insert `line` before the line currently at `index` (1-based).
    /// Indexes past the end append. Returns the position the line landed at.
    pub fn insert_at(&mut self, index: usize, line: Line) -> Result<usize> {
        if index < 1 {
            return Err(self.invalid_index(index));
        }
        let pos = (index - 1).min(self.lines.len());
        self.lines.insert(pos, line);
        self.dirty = true;
        Ok(pos + 1)
    }

    /// Remove and return the line at `index` (1-based).
    pub fn remove_at(&mut self, index: usize) -> Result<Line> {
        if index < 1 || index > self.lines.len() {
            return Err(self.invalid_index(index));
        }
        let line = self.lines.remove(index - 1);
        self.dirty = true;
        Ok(line)
    }

    /// Lines joined with `\n`, ending with one `\n` only if the loaded file did
    pub fn content(&self) -> String {
        let mut content = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            content.push('\n');
        }
        content
    }

    /// Atomically replace the file on disk with the buffer content.
    /// `dirty` is left untouched when the write fails.
    pub fn write(&mut self) -> Result<()> {
        let content = self.content();
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| MergeError::io("write", &self.path, e))?;
        tmp.write_all(content.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| MergeError::io("write", &self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| MergeError::io("write", &self.path, e.error))?;

        self.disk_hash = content_hash(content.as_bytes());
        self.dirty = false;
        Ok(())
    }

    /// Whether `bytes` are exactly what this buffer was loaded from (or last wrote)
    pub fn matches_disk(&self, bytes: &[u8]) -> bool {
        content_hash(bytes) == self.disk_hash
    }

    fn invalid_index(&self, index: usize) -> MergeError {
        MergeError::InvalidIndex {
            path: self.path.clone(),
            index,
            len: self.lines.len(),
        }
    }
}

/// Split on `\n`, `\r\n` or lone `\r`. A trailing terminator does not start a new line.
pub fn split_lines(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(|c: char| c == '\n' || c == '\r') {
            Some(i) => {
                lines.push(rest[..i].to_string());
                let skip = if rest[i..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[i + skip..];
            }
            None => {
                lines.push(rest.to_string());
                break;
            }
        }
    }
    lines
}

/// Sniff the first bytes for NULs or a high share of control characters.
/// Bytes >= 0x80 are not counted, so UTF-8 text is never flagged.
pub fn is_binary(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if head.is_empty() {
        return false;
    }
    if head.contains(&0) {
        return true;
    }
    let control = head
        .iter()
        .filter(|&&b| (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r')) || b == 0x7f)
        .count();
    control as f64 / head.len() as f64 > BINARY_CONTROL_RATIO
}

/// SHA-256 of raw file content (for external change detection)
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
