//! Foundation utilities shared by every rvs crate: lock files, path
//! normalization, and identity/timestamp handling.

pub mod date;
mod error;
pub mod lockfile;
pub mod path;

pub use bstr::{BStr, BString, ByteSlice, ByteVec};
pub use error::{LockError, UtilError};
pub use lockfile::Lockfile;

pub type Result<T> = std::result::Result<T, UtilError>;
