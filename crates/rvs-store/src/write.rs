use std::fs;
use std::io::Write;

use flate2::write::ZlibEncoder;
use rvs_hash::{Hasher, ObjectId};
use rvs_object::{header, Object, ObjectKind};

use crate::{ObjectStore, StoreError};

impl ObjectStore {
    /// Persist an object. Returns its OID.
    pub fn write(&self, obj: &Object) -> Result<ObjectId, StoreError> {
        self.write_raw(obj.kind(), &obj.to_payload())
    }

    /// Persist a payload with a known kind. Returns its OID.
    ///
    /// The OID is computed over the uncompressed framed bytes. If the object
    /// already exists nothing is written; otherwise the compressed bytes are
    /// staged in a temp file and renamed into place, so readers only ever see
    /// complete objects.
    pub fn write_raw(&self, kind: ObjectKind, payload: &[u8]) -> Result<ObjectId, StoreError> {
        let hdr = header::write(kind, payload.len());

        let oid = {
            let mut hasher = Hasher::new();
            hasher.update(&hdr);
            hasher.update(payload);
            hasher.finalize()?
        };

        if self.contains(&oid) {
            return Ok(oid);
        }

        let final_path = self.object_path(&oid);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Stage in the objects dir itself so the rename stays on one filesystem.
        let tmp = tempfile::Builder::new()
            .prefix("obj-")
            .tempfile_in(&self.objects_dir)?;
        let mut encoder = ZlibEncoder::new(tmp, self.compression);
        encoder.write_all(&hdr)?;
        encoder.write_all(payload)?;
        let tmp = encoder.finish()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o444))?;
        }

        match tmp.persist(&final_path) {
            Ok(_) => Ok(oid),
            // A concurrent writer of identical content already won the race.
            Err(e) if final_path.exists() => {
                drop(e);
                Ok(oid)
            }
            Err(e) => Err(StoreError::Io(e.error)),
        }
    }

    /// Hash a payload without persisting anything.
    pub fn hash_only(kind: ObjectKind, payload: &[u8]) -> Result<ObjectId, StoreError> {
        Ok(Hasher::hash_object(kind.as_str(), payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvs_object::Blob;

    #[test]
    fn write_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects"));

        let obj = Object::Blob(Blob::from_bytes(b"Hello\n"));
        let first = store.write(&obj).unwrap();
        let second = store.write(&obj).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_hex(), "ce013625030ba8dba906f756967f9e9ca394464a");
        assert!(store.object_path(&first).is_file());
    }

    #[test]
    fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let objects = dir.path().join("objects");
        let store = ObjectStore::open(&objects);
        store
            .write(&Object::Blob(Blob::from_bytes(b"content")))
            .unwrap();

        let stray: Vec<_> = fs::read_dir(&objects)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("obj-"))
            .collect();
        assert!(stray.is_empty());
    }

    #[test]
    fn hash_only_matches_write() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects"));
        let written = store.write_raw(ObjectKind::Blob, b"abc").unwrap();
        let hashed = ObjectStore::hash_only(ObjectKind::Blob, b"abc").unwrap();
        assert_eq!(written, hashed);
    }
}
