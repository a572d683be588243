//! Tree-to-tree diffing.
//!
//! Two trees are walked in parallel sorted order; every divergence is
//! emitted as an added, deleted, modified, or type-changed entry with its
//! full path. Equal subtree OIDs prune the walk without recursing.

use bstr::{BString, ByteSlice, ByteVec};
use rvs_hash::ObjectId;
use rvs_object::{tree::name_compare, FileMode, Tree};
use rvs_store::ObjectStore;

use crate::DiffError;

/// Classification of a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Deleted,
    Modified,
    TypeChanged,
}

impl ChangeKind {
    /// The status letter used by `--name-status` output.
    pub fn letter(&self) -> char {
        match self {
            ChangeKind::Added => 'A',
            ChangeKind::Deleted => 'D',
            ChangeKind::Modified => 'M',
            ChangeKind::TypeChanged => 'T',
        }
    }
}

/// One side of a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileVersion {
    pub mode: FileMode,
    pub oid: ObjectId,
}

/// A single entry of the tree-diff stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub kind: ChangeKind,
    pub path: BString,
    pub old: Option<FileVersion>,
    pub new: Option<FileVersion>,
}

/// Diff two trees (either side may be absent, meaning the empty tree).
///
/// With `recurse` off, a differing subtree becomes a single entry for the
/// directory itself instead of entries for the files under it.
pub fn diff_trees(
    store: &ObjectStore,
    old: Option<&ObjectId>,
    new: Option<&ObjectId>,
    recurse: bool,
) -> Result<Vec<TreeChange>, DiffError> {
    let mut changes = Vec::new();
    let old_tree = read_opt(store, old)?;
    let new_tree = read_opt(store, new)?;
    walk(store, &old_tree, &new_tree, b"", recurse, &mut changes)?;
    Ok(changes)
}

fn read_opt(store: &ObjectStore, oid: Option<&ObjectId>) -> Result<Tree, DiffError> {
    match oid {
        Some(oid) => Ok(store.read_tree(oid)?),
        None => Ok(Tree::new()),
    }
}

fn walk(
    store: &ObjectStore,
    old: &Tree,
    new: &Tree,
    prefix: &[u8],
    recurse: bool,
    out: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let mut oi = 0;
    let mut ni = 0;

    while oi < old.entries.len() || ni < new.entries.len() {
        let order = match (old.entries.get(oi), new.entries.get(ni)) {
            // Same name is the same path even when the kind (and thus the
            // sort position) changed underneath it.
            (Some(o), Some(n)) if o.name == n.name => std::cmp::Ordering::Equal,
            (Some(o), Some(n)) => name_compare(&o.name, o.mode.is_dir(), &n.name, n.mode.is_dir()),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => break,
        };

        match order {
            std::cmp::Ordering::Less => {
                let entry = &old.entries[oi];
                emit_side(store, entry, prefix, ChangeKind::Deleted, recurse, out)?;
                oi += 1;
            }
            std::cmp::Ordering::Greater => {
                let entry = &new.entries[ni];
                emit_side(store, entry, prefix, ChangeKind::Added, recurse, out)?;
                ni += 1;
            }
            std::cmp::Ordering::Equal => {
                let o = &old.entries[oi];
                let n = &new.entries[ni];
                oi += 1;
                ni += 1;

                if o.oid == n.oid && o.mode == n.mode {
                    continue;
                }
                let path = join(prefix, &o.name);
                match (o.mode.is_dir(), n.mode.is_dir()) {
                    (true, true) if recurse => {
                        let old_sub = store.read_tree(&o.oid)?;
                        let new_sub = store.read_tree(&n.oid)?;
                        walk(store, &old_sub, &new_sub, &path, recurse, out)?;
                    }
                    (true, true) | (false, false) => {
                        out.push(TreeChange {
                            kind: ChangeKind::Modified,
                            path,
                            old: Some(FileVersion {
                                mode: o.mode,
                                oid: o.oid,
                            }),
                            new: Some(FileVersion {
                                mode: n.mode,
                                oid: n.oid,
                            }),
                        });
                    }
                    _ => {
                        out.push(TreeChange {
                            kind: ChangeKind::TypeChanged,
                            path,
                            old: Some(FileVersion {
                                mode: o.mode,
                                oid: o.oid,
                            }),
                            new: Some(FileVersion {
                                mode: n.mode,
                                oid: n.oid,
                            }),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Emit one side of the diff for an entry only present there; directories
/// expand to their contained files when recursing.
fn emit_side(
    store: &ObjectStore,
    entry: &rvs_object::TreeEntry,
    prefix: &[u8],
    kind: ChangeKind,
    recurse: bool,
    out: &mut Vec<TreeChange>,
) -> Result<(), DiffError> {
    let path = join(prefix, &entry.name);
    if entry.mode.is_dir() && recurse {
        let sub = store.read_tree(&entry.oid)?;
        for child in sub.iter() {
            emit_side(store, child, &path, kind, recurse, out)?;
        }
        return Ok(());
    }
    let version = FileVersion {
        mode: entry.mode,
        oid: entry.oid,
    };
    out.push(match kind {
        ChangeKind::Deleted => TreeChange {
            kind,
            path,
            old: Some(version),
            new: None,
        },
        _ => TreeChange {
            kind,
            path,
            old: None,
            new: Some(version),
        },
    });
    Ok(())
}

fn join(prefix: &[u8], name: &[u8]) -> BString {
    let mut path = BString::from(prefix);
    if !path.is_empty() {
        path.push_byte(b'/');
    }
    path.push_str(name);
    path
}
