use digest::Digest;

use crate::{HashError, ObjectId};

/// Streaming SHA-1 with collision detection.
///
/// Data is fed incrementally with [`update`](Hasher::update) or through the
/// [`std::io::Write`] impl, then finalized into an [`ObjectId`]. A detected
/// collision attack surfaces as [`HashError::Collision`] rather than a
/// silently wrong identity.
pub struct Hasher {
    inner: sha1_checked::Sha1,
}

impl Hasher {
    pub fn new() -> Self {
        Self {
            inner: sha1_checked::Sha1::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    pub fn finalize(self) -> Result<ObjectId, HashError> {
        let out = self.inner.try_finalize();
        if out.has_collision() {
            return Err(HashError::Collision);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(out.hash().as_slice());
        ObjectId::from_bytes(&bytes)
    }

    /// Hash a buffer in one call.
    pub fn digest(data: &[u8]) -> Result<ObjectId, HashError> {
        let mut h = Self::new();
        h.update(data);
        h.finalize()
    }

    /// Hash framed object bytes: `"<type> <len>\0<payload>"`.
    pub fn hash_object(kind: &str, payload: &[u8]) -> Result<ObjectId, HashError> {
        let mut h = Self::new();
        h.update(format!("{} {}\0", kind, payload.len()).as_bytes());
        h.update(payload);
        h.finalize()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::io::Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
