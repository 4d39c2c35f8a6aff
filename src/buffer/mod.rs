mod cache;
mod file;

pub use cache::{normalize_path, BufferCache};
pub use file::{content_hash, is_binary, split_lines, FileBuffer};
