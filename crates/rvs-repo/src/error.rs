use std::path::PathBuf;

use bstr::BString;

/// Errors from repository-level operations.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not an rvs repository (or any parent up to filesystem root): {0}")]
    NotARepository(PathBuf),

    #[error("repository is corrupt: {0}")]
    Corrupt(String),

    #[error("unknown revision '{0}'")]
    UnknownRev(String),

    #[error("short object id '{0}' is ambiguous")]
    AmbiguousRev(String),

    #[error("pathspec '{0}' is outside the repository")]
    PathOutsideRepo(String),

    #[error("your local changes would be overwritten")]
    DirtyWorktree(Vec<BString>),

    #[error("worktree '{0}' is locked")]
    WorktreeLocked(PathBuf),

    #[error("'{0}' already exists")]
    WorktreeExists(PathBuf),

    #[error("branch '{branch}' is already checked out at '{at}'")]
    BranchInUse { branch: String, at: PathBuf },

    #[error("the branch '{0}' is not fully merged")]
    BranchNotFullyMerged(String),

    #[error("user identity unknown; set RVS_AUTHOR_NAME/RVS_AUTHOR_EMAIL or user.name/user.email")]
    IdentityUnset,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] rvs_store::StoreError),

    #[error(transparent)]
    Ref(#[from] rvs_ref::RefError),

    #[error(transparent)]
    Index(#[from] rvs_index::IndexError),

    #[error(transparent)]
    Object(#[from] rvs_object::ObjectError),

    #[error(transparent)]
    Util(#[from] rvs_utils::UtilError),
}
