use std::fs;
use std::path::PathBuf;

use rvs_hash::ObjectId;

use crate::{ObjectStore, StoreError};

/// Iterator over every OID in the store, in hex order.
///
/// Walks the two-hex-char fan-out directories and yields each valid object
/// file name; stray files (temp files and the like) are skipped.
pub struct ObjectIter {
    dirs: Vec<PathBuf>,
    dir_index: usize,
    pending: Vec<ObjectId>,
}

impl ObjectIter {
    fn new(objects_dir: &std::path::Path) -> Result<Self, StoreError> {
        let mut dirs = Vec::new();
        if objects_dir.is_dir() {
            for entry in fs::read_dir(objects_dir)? {
                let entry = entry?;
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.len() == 2
                    && name.bytes().all(|b| b.is_ascii_hexdigit())
                    && entry.file_type()?.is_dir()
                {
                    dirs.push(entry.path());
                }
            }
        }
        dirs.sort();
        Ok(Self {
            dirs,
            dir_index: 0,
            pending: Vec::new(),
        })
    }

    fn refill(&mut self) -> Result<bool, StoreError> {
        while self.dir_index < self.dirs.len() {
            let dir = &self.dirs[self.dir_index];
            self.dir_index += 1;
            let prefix = dir.file_name().unwrap().to_string_lossy().to_lowercase();

            let mut found = Vec::new();
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let rest = entry.file_name();
                let rest = rest.to_string_lossy();
                if let Ok(oid) = ObjectId::from_hex(&format!("{prefix}{rest}")) {
                    found.push(oid);
                }
            }
            if !found.is_empty() {
                found.sort();
                found.reverse(); // pop() yields ascending order
                self.pending = found;
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Iterator for ObjectIter {
    type Item = Result<ObjectId, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(oid) = self.pending.pop() {
                return Some(Ok(oid));
            }
            match self.refill() {
                Ok(true) => continue,
                Ok(false) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl ObjectStore {
    /// Iterate all stored OIDs.
    pub fn iter(&self) -> Result<ObjectIter, StoreError> {
        ObjectIter::new(&self.objects_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rvs_object::ObjectKind;

    #[test]
    fn yields_all_written_oids_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects"));

        let mut written: Vec<ObjectId> = [b"one".as_slice(), b"two", b"three"]
            .iter()
            .map(|data| store.write_raw(ObjectKind::Blob, data).unwrap())
            .collect();
        written.sort();

        let listed: Vec<ObjectId> = store.iter().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(listed, written);
    }

    #[test]
    fn empty_store_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectStore::open(dir.path().join("objects"));
        assert_eq!(store.iter().unwrap().count(), 0);
    }
}
