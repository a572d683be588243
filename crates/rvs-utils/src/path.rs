//! Worktree-relative path handling.
//!
//! Every path stored in the index or a tree is kept in normalized form:
//! forward slashes, no leading `./`, no `.`/`..` segments, no trailing
//! slash, compared byte-wise and case-sensitively.

use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice, ByteVec};

use crate::error::UtilError;
use crate::Result;

#[inline]
fn is_sep(b: u8) -> bool {
    b == b'/' || b == b'\\'
}

/// Normalize a worktree-relative path.
///
/// Converts backslashes to `/`, drops empty and `.` segments, resolves `..`
/// against earlier segments, and rejects paths that would climb out of the
/// worktree root.
pub fn normalize(path: impl AsRef<[u8]>) -> Result<BString> {
    let raw = path.as_ref();
    let mut kept: Vec<&[u8]> = Vec::new();

    for seg in raw.split(|&b| is_sep(b)) {
        match seg {
            b"" | b"." => continue,
            b".." => {
                if kept.pop().is_none() {
                    return Err(UtilError::Path(format!(
                        "'{}' is outside repository",
                        raw.as_bstr()
                    )));
                }
            }
            other => kept.push(other),
        }
    }

    let mut out = BString::new(Vec::with_capacity(raw.len()));
    for (i, seg) in kept.iter().enumerate() {
        if i > 0 {
            out.push_byte(b'/');
        }
        out.push_str(seg);
    }
    Ok(out)
}

/// Turn an OS path (absolute or CWD-relative) into a normalized path
/// relative to `root`.
///
/// Fails when the path does not lie under `root`.
pub fn workdir_relative(root: &Path, path: &Path) -> Result<BString> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let absolute = lexical_clean(&absolute);
    let root = lexical_clean(root);

    let rel = absolute.strip_prefix(&root).map_err(|_| {
        UtilError::Path(format!("'{}' is outside repository", path.display()))
    })?;
    normalize(os_bytes(rel))
}

/// Whether a normalized path names, or lies under, the repository metadata
/// directory. Such paths are never staged or materialized.
pub fn is_metadata_path(rel: &[u8]) -> bool {
    rel == b".rvs" || rel.starts_with(b".rvs/")
}

/// Convert a normalized path into a platform path under `root`.
pub fn to_os_path(root: &Path, rel: &[u8]) -> PathBuf {
    let mut out = root.to_path_buf();
    for seg in rel.split(|&b| b == b'/') {
        #[cfg(unix)]
        {
            use std::os::unix::ffi::OsStrExt;
            out.push(std::ffi::OsStr::from_bytes(seg));
        }
        #[cfg(not(unix))]
        {
            out.push(String::from_utf8_lossy(seg).as_ref());
        }
    }
    out
}

/// Resolve `.` and `..` segments of an absolute path without touching the
/// filesystem. Symlinks are left alone; discovery canonicalizes separately.
fn lexical_clean(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(unix)]
fn os_bytes(p: &Path) -> &[u8] {
    use std::os::unix::ffi::OsStrExt;
    p.as_os_str().as_bytes()
}

#[cfg(not(unix))]
fn os_bytes(p: &Path) -> Vec<u8> {
    p.to_string_lossy().into_owned().into_bytes()
}
