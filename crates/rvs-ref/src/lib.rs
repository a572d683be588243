//! The reference namespace: branches under `refs/heads/`, the per-worktree
//! `HEAD`, and the reflog-backed stash stack.
//!
//! Branches are shared by every worktree and live under the common metadata
//! directory; `HEAD` (and merge state) is private to each worktree. The
//! store routes reads and writes accordingly.

mod name;
pub mod reflog;
mod store;

pub use name::RefName;
pub use reflog::ReflogEntry;
pub use store::{HeadState, RefStore};

use rvs_hash::ObjectId;

/// Errors from reference operations.
#[derive(Debug, thiserror::Error)]
pub enum RefError {
    #[error("invalid ref name: {0}")]
    InvalidName(String),

    #[error("ref not found: {0}")]
    NotFound(String),

    #[error("malformed ref: {0}")]
    Parse(String),

    #[error("a branch named '{0}' already exists")]
    BranchExists(String),

    #[error("cannot create ref '{name}': '{conflict}' is in the way")]
    DirectoryConflict { name: String, conflict: String },

    #[error("symbolic ref chain too deep at '{0}'")]
    ChainTooDeep(String),

    #[error("{path}: {source}")]
    IoPath {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Lock(#[from] rvs_utils::UtilError),

    #[error(transparent)]
    Hash(#[from] rvs_hash::HashError),
}

/// What a ref file holds: an OID, or the name of another ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    Direct(ObjectId),
    Symbolic(RefName),
}

impl RefValue {
    pub fn as_direct(&self) -> Option<ObjectId> {
        match self {
            RefValue::Direct(oid) => Some(*oid),
            RefValue::Symbolic(_) => None,
        }
    }

    pub fn as_symbolic(&self) -> Option<&RefName> {
        match self {
            RefValue::Symbolic(target) => Some(target),
            RefValue::Direct(_) => None,
        }
    }
}
