//! The content-addressed object store.
//!
//! Every object lives at `objects/<xx>/<38-hex>` as zlib-compressed framed
//! bytes. Writes are idempotent: re-writing existing content is a no-op that
//! returns the same OID, and a half-written object is never visible because
//! files appear only through an atomic rename.

mod enumerate;
mod prefix;
mod read;
pub mod walk;
mod write;

pub use enumerate::ObjectIter;

use std::path::{Path, PathBuf};

use rvs_hash::ObjectId;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("short object id {prefix} is ambiguous")]
    Ambiguous { prefix: String },

    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error("unexpected {actual} object {oid} (wanted {expected})")]
    KindMismatch {
        oid: String,
        expected: rvs_object::ObjectKind,
        actual: rvs_object::ObjectKind,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Object(#[from] rvs_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] rvs_hash::HashError),
}

/// Handle on an `objects/` directory.
pub struct ObjectStore {
    objects_dir: PathBuf,
    compression: flate2::Compression,
}

impl ObjectStore {
    /// Open the store rooted at `objects_dir`. The directory need not exist
    /// yet; it is created on first write.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
            compression: flate2::Compression::default(),
        }
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// The on-disk path an OID maps to.
    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.fanout_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_uses_fanout() {
        let store = ObjectStore::open("/tmp/objects");
        let oid = ObjectId::from_hex("ce013625030ba8dba906f756967f9e9ca394464a").unwrap();
        assert_eq!(
            store.object_path(&oid),
            PathBuf::from("/tmp/objects/ce/013625030ba8dba906f756967f9e9ca394464a")
        );
    }
}
