//! Three-way merging.
//!
//! The file level is a pure function of three byte sequences (diff3-style
//! region interleaving with conflict markers); the tree level classifies
//! every path across base/ours/theirs and delegates both-modified paths to
//! the file level.

pub mod content;
pub mod tree;

pub use content::{merge_blobs, ContentMerge, MergeLabels};
pub use tree::{merge_trees, MergedTree, PathConflict};

/// Errors from merge operations.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error(transparent)]
    Store(#[from] rvs_store::StoreError),
}
