//! Commit graph traversal: date-ordered history walking for `log` and
//! lowest-common-ancestor computation for merges.

mod merge_base;
mod walk;

pub use merge_base::{is_ancestor, merge_base};
pub use walk::RevWalk;

/// Errors from revision walking.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error(transparent)]
    Store(#[from] rvs_store::StoreError),
}
