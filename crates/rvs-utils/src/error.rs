use std::path::PathBuf;

/// Base error type for rvs-utils operations.
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error("invalid date: {0}")]
    DateParse(String),

    #[error("invalid path: {0}")]
    Path(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Lock file specific errors.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("unable to create '{path}': file exists")]
    AlreadyHeld { path: PathBuf },

    #[error("unable to create lock file '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to replace '{path}': {source}")]
    Commit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
