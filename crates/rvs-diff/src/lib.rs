//! The diff engine: line-level diffs over byte-split lines, sorted parallel
//! tree walks, and the unified / name-only / name-status / stat renderers.

pub mod algorithm;
pub mod format;
pub mod tree;

pub use tree::{ChangeKind, FileVersion, TreeChange};

use bstr::BString;

/// Errors from diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    #[error(transparent)]
    Store(#[from] rvs_store::StoreError),
}

/// Default number of context lines around a hunk.
pub const DEFAULT_CONTEXT: u32 = 3;

/// How many leading bytes are sniffed for NUL to call a file binary.
const BINARY_SNIFF_LEN: usize = 8 * 1024;

/// Whether content should be treated as binary (NUL within the first 8 KiB).
pub fn is_binary(data: &[u8]) -> bool {
    data[..data.len().min(BINARY_SNIFF_LEN)].contains(&0)
}

/// One line of a hunk, content kept verbatim including its line ending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(BString),
    Addition(BString),
    Deletion(BString),
}

/// A group of changed lines with surrounding context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// 1-based first line in the old file (0 when the old side is empty).
    pub old_start: u32,
    pub old_count: u32,
    /// 1-based first line in the new file (0 when the new side is empty).
    pub new_start: u32,
    pub new_count: u32,
    pub lines: Vec<DiffLine>,
}
