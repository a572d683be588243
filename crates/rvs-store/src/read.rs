use std::fs;
use std::io::Read;

use flate2::read::ZlibDecoder;
use rvs_hash::ObjectId;
use rvs_object::{header, Object, ObjectKind};

use crate::{ObjectStore, StoreError};

impl ObjectStore {
    /// Whether the object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Read an object. `Ok(None)` when absent, `Err` when present but corrupt.
    pub fn read(&self, oid: &ObjectId) -> Result<Option<Object>, StoreError> {
        let compressed = match fs::read(self.object_path(oid)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let framed = inflate(&compressed, oid)?;
        Ok(Some(Object::parse(&framed)?))
    }

    /// Read an object that must exist.
    pub fn read_existing(&self, oid: &ObjectId) -> Result<Object, StoreError> {
        self.read(oid)?
            .ok_or_else(|| StoreError::NotFound(oid.to_hex()))
    }

    /// Read an object that must exist and be of the given kind.
    pub fn read_kind(&self, oid: &ObjectId, kind: ObjectKind) -> Result<Object, StoreError> {
        let obj = self.read_existing(oid)?;
        if obj.kind() != kind {
            return Err(StoreError::KindMismatch {
                oid: oid.to_hex(),
                expected: kind,
                actual: obj.kind(),
            });
        }
        Ok(obj)
    }

    /// Read the blob payload at `oid`.
    pub fn read_blob(&self, oid: &ObjectId) -> Result<Vec<u8>, StoreError> {
        match self.read_kind(oid, ObjectKind::Blob)? {
            Object::Blob(b) => Ok(b.data.into()),
            _ => unreachable!(),
        }
    }

    /// Read the tree at `oid`.
    pub fn read_tree(&self, oid: &ObjectId) -> Result<rvs_object::Tree, StoreError> {
        match self.read_kind(oid, ObjectKind::Tree)? {
            Object::Tree(t) => Ok(t),
            _ => unreachable!(),
        }
    }

    /// Read the commit at `oid`.
    pub fn read_commit(&self, oid: &ObjectId) -> Result<rvs_object::Commit, StoreError> {
        match self.read_kind(oid, ObjectKind::Commit)? {
            Object::Commit(c) => Ok(c),
            _ => unreachable!(),
        }
    }

    /// Read just the framing header. `Ok(None)` when absent.
    pub fn read_header(&self, oid: &ObjectId) -> Result<Option<(ObjectKind, usize)>, StoreError> {
        let compressed = match fs::read(self.object_path(oid)) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Io(e)),
        };

        // Inflate only enough to see "<type> <len>\0"; 64 bytes is ample.
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        let mut buf = [0u8; 64];
        let mut filled = 0;
        loop {
            if filled == buf.len() {
                return Err(StoreError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "framing header exceeds 64 bytes".into(),
                });
            }
            let n = decoder.read(&mut buf[filled..]).map_err(|e| StoreError::Corrupt {
                oid: oid.to_hex(),
                reason: format!("zlib: {e}"),
            })?;
            if n == 0 {
                return Err(StoreError::Corrupt {
                    oid: oid.to_hex(),
                    reason: "EOF before header terminator".into(),
                });
            }
            filled += n;
            if buf[..filled].contains(&0) {
                break;
            }
        }

        let (kind, len, _) = header::parse(&buf[..filled])?;
        Ok(Some((kind, len)))
    }
}

fn inflate(compressed: &[u8], oid: &ObjectId) -> Result<Vec<u8>, StoreError> {
    let mut decoder = ZlibDecoder::new(compressed);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| StoreError::Corrupt {
        oid: oid.to_hex(),
        reason: format!("zlib: {e}"),
    })?;
    Ok(out)
}
