//! Index entry and cached stat data.

use bstr::{BStr, BString};
use rvs_hash::ObjectId;
use rvs_object::FileMode;

use crate::Stage;

/// A single `(path, mode, oid, stat)` row of the index.
///
/// Invariant: the OID names a blob already present in the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Normalized worktree-relative path.
    pub path: BString,
    /// Blob identity of the staged content.
    pub oid: ObjectId,
    pub mode: FileMode,
    pub stage: Stage,
    /// Filesystem stat cache used to skip rehashing unchanged files.
    pub stat: StatData,
}

impl IndexEntry {
    /// Sort key: path bytes, then stage.
    pub fn sort_key(&self) -> (&BStr, u8) {
        (self.path.as_ref(), self.stage.as_u8())
    }
}

/// Cached stat fields, in the index file's on-disk order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatData {
    pub ctime_secs: u32,
    pub ctime_nsecs: u32,
    pub mtime_secs: u32,
    pub mtime_nsecs: u32,
    pub dev: u32,
    pub ino: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
}

impl StatData {
    #[cfg(unix)]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            ctime_secs: meta.ctime() as u32,
            ctime_nsecs: meta.ctime_nsec() as u32,
            mtime_secs: meta.mtime() as u32,
            mtime_nsecs: meta.mtime_nsec() as u32,
            dev: meta.dev() as u32,
            ino: meta.ino() as u32,
            uid: meta.uid(),
            gid: meta.gid(),
            size: meta.len() as u32,
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        use std::time::UNIX_EPOCH;
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Self {
            ctime_secs: mtime.as_secs() as u32,
            ctime_nsecs: mtime.subsec_nanos(),
            mtime_secs: mtime.as_secs() as u32,
            mtime_nsecs: mtime.subsec_nanos(),
            dev: 0,
            ino: 0,
            uid: 0,
            gid: 0,
            size: meta.len() as u32,
        }
    }

    /// Whether the cached stat still describes the file. A `false` answer
    /// only means the content must be rehashed, not that it changed.
    pub fn matches(&self, meta: &std::fs::Metadata) -> bool {
        let fresh = Self::from_metadata(meta);
        if self.size != fresh.size {
            return false;
        }
        if self.mtime_secs != fresh.mtime_secs || self.mtime_nsecs != fresh.mtime_nsecs {
            return false;
        }
        // A zeroed field means "unknown" (entry created from a tree).
        if self.ino != 0 && fresh.ino != 0 && self.ino != fresh.ino {
            return false;
        }
        if self.dev != 0 && fresh.dev != 0 && self.dev != fresh.dev {
            return false;
        }
        true
    }

    /// Whether every field is zero (no stat information recorded).
    pub fn is_unset(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stat_is_unset() {
        assert!(StatData::default().is_unset());
    }

    #[test]
    fn stat_matches_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f");
        std::fs::write(&path, b"data").unwrap();
        let meta = std::fs::metadata(&path).unwrap();

        let stat = StatData::from_metadata(&meta);
        assert!(stat.matches(&meta));
        assert!(!stat.is_unset());

        let mut resized = stat;
        resized.size += 1;
        assert!(!resized.matches(&meta));
    }
}
