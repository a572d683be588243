//! Whole-tree helpers: flattening a nested tree into full paths and building
//! nested trees back from a flat listing.

use std::collections::BTreeMap;

use bstr::{BString, ByteSlice, ByteVec};
use rvs_hash::ObjectId;
use rvs_object::{FileMode, Object, Tree, TreeEntry};

use crate::{ObjectStore, StoreError};

/// A file-level entry of a flattened tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatEntry {
    pub mode: FileMode,
    pub oid: ObjectId,
}

/// Flatten the tree at `oid` into `full/path → (mode, oid)` for every blob
/// reachable through it. The map is ordered by path bytes.
pub fn flatten_tree(
    store: &ObjectStore,
    oid: &ObjectId,
) -> Result<BTreeMap<BString, FlatEntry>, StoreError> {
    let mut out = BTreeMap::new();
    descend(store, oid, b"", &mut out)?;
    Ok(out)
}

fn descend(
    store: &ObjectStore,
    oid: &ObjectId,
    prefix: &[u8],
    out: &mut BTreeMap<BString, FlatEntry>,
) -> Result<(), StoreError> {
    let tree = store.read_tree(oid)?;
    for entry in tree.iter() {
        let mut path = BString::from(prefix);
        if !path.is_empty() {
            path.push_byte(b'/');
        }
        path.push_str(&entry.name);

        if entry.mode.is_dir() {
            descend(store, &entry.oid, path.as_bytes(), out)?;
        } else {
            out.insert(
                path,
                FlatEntry {
                    mode: entry.mode,
                    oid: entry.oid,
                },
            );
        }
    }
    Ok(())
}

/// Build nested tree objects from a flat `path → (mode, oid)` listing and
/// return the root tree OID. Entries are bucketed by their leading path
/// segment and subtrees are written bottom-up, so equal content always
/// produces equal trees.
pub fn build_tree(
    store: &ObjectStore,
    entries: &BTreeMap<BString, FlatEntry>,
) -> Result<ObjectId, StoreError> {
    let slices: Vec<(&[u8], FlatEntry)> = entries
        .iter()
        .map(|(path, entry)| (path.as_bytes(), *entry))
        .collect();
    build_level(store, &slices)
}

fn build_level(store: &ObjectStore, entries: &[(&[u8], FlatEntry)]) -> Result<ObjectId, StoreError> {
    let mut tree = Tree::new();
    let mut i = 0;

    while i < entries.len() {
        let (path, entry) = entries[i];
        match path.find_byte(b'/') {
            None => {
                tree.entries.push(TreeEntry {
                    mode: entry.mode,
                    name: BString::from(path),
                    oid: entry.oid,
                });
                i += 1;
            }
            Some(cut) => {
                // Collect the run of entries sharing this directory segment.
                let dir = &path[..cut];
                let start = i;
                while i < entries.len()
                    && entries[i].0.len() > dir.len()
                    && &entries[i].0[..dir.len()] == dir
                    && entries[i].0[dir.len()] == b'/'
                {
                    i += 1;
                }
                let children: Vec<(&[u8], FlatEntry)> = entries[start..i]
                    .iter()
                    .map(|(p, e)| (&p[dir.len() + 1..], *e))
                    .collect();
                let sub_oid = build_level(store, &children)?;
                tree.entries.push(TreeEntry {
                    mode: FileMode::Dir,
                    name: BString::from(dir),
                    oid: sub_oid,
                });
            }
        }
    }

    store.write(&Object::Tree(tree))
}
