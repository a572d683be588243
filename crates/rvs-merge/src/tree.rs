//! Tree-level three-way merge.
//!
//! Every path present in base, ours, or theirs is classified: unchanged,
//! taken from the only side that changed it, changed identically on both
//! sides, changed differently (file-level merge), add/add, or
//! delete/modify. Clean results land in the merged listing; the rest are
//! reported as conflicts carrying the marker text for the working tree.

use std::collections::{BTreeMap, BTreeSet};

use bstr::BString;
use rvs_hash::ObjectId;
use rvs_object::ObjectKind;
use rvs_store::walk::{flatten_tree, FlatEntry};
use rvs_store::ObjectStore;

use crate::content::{merge_blobs, ContentMerge, MergeLabels};
use crate::MergeError;

/// A path the merge could not resolve.
#[derive(Debug, Clone)]
pub struct PathConflict {
    pub path: BString,
    /// The three versions for index stages 1, 2, and 3.
    pub base: Option<FlatEntry>,
    pub ours: Option<FlatEntry>,
    pub theirs: Option<FlatEntry>,
    /// What the working tree should hold: conflict-marker text for content
    /// conflicts, the surviving side's content for delete/modify.
    pub worktree: Vec<u8>,
}

/// Result of merging two trees against a base.
#[derive(Debug, Clone, Default)]
pub struct MergedTree {
    /// Cleanly merged `path → (mode, oid)` listing.
    pub entries: BTreeMap<BString, FlatEntry>,
    pub conflicts: Vec<PathConflict>,
}

impl MergedTree {
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Merge the trees `ours` and `theirs` against `base` (absent base means
/// unrelated histories; every differing path becomes add/add).
pub fn merge_trees(
    store: &ObjectStore,
    base: Option<&ObjectId>,
    ours: &ObjectId,
    theirs: &ObjectId,
    labels: &MergeLabels<'_>,
) -> Result<MergedTree, MergeError> {
    let base_map = match base {
        Some(oid) => flatten_tree(store, oid)?,
        None => BTreeMap::new(),
    };
    let ours_map = flatten_tree(store, ours)?;
    let theirs_map = flatten_tree(store, theirs)?;

    let mut paths: BTreeSet<&BString> = BTreeSet::new();
    paths.extend(base_map.keys());
    paths.extend(ours_map.keys());
    paths.extend(theirs_map.keys());

    let mut merged = MergedTree::default();

    for path in paths {
        let b = base_map.get(path).copied();
        let o = ours_map.get(path).copied();
        let t = theirs_map.get(path).copied();

        // Agreement (including both deleting) needs no content work.
        if o == t {
            if let Some(entry) = o {
                merged.entries.insert(path.clone(), entry);
            }
            continue;
        }
        // Only one side moved away from the base: take it.
        if o == b {
            if let Some(entry) = t {
                merged.entries.insert(path.clone(), entry);
            }
            continue;
        }
        if t == b {
            if let Some(entry) = o {
                merged.entries.insert(path.clone(), entry);
            }
            continue;
        }

        // Both sides changed, differently.
        match (o, t) {
            (Some(ov), Some(tv)) => {
                let base_data = match b {
                    Some(bv) => store.read_blob(&bv.oid)?,
                    None => Vec::new(),
                };
                let ours_data = store.read_blob(&ov.oid)?;
                let theirs_data = store.read_blob(&tv.oid)?;

                let mode = if b.map(|bv| bv.mode) != Some(ov.mode) {
                    ov.mode
                } else {
                    tv.mode
                };

                match merge_blobs(&base_data, &ours_data, &theirs_data, labels, false) {
                    ContentMerge::Clean(content) => {
                        let oid = store.write_raw(ObjectKind::Blob, &content)?;
                        merged
                            .entries
                            .insert(path.clone(), FlatEntry { mode, oid });
                    }
                    ContentMerge::Conflict { content, .. } => {
                        merged.conflicts.push(PathConflict {
                            path: path.clone(),
                            base: b,
                            ours: o,
                            theirs: t,
                            worktree: content,
                        });
                    }
                }
            }
            // Delete/modify: keep the surviving content on disk and record
            // all known stages.
            (Some(ov), None) => {
                let worktree = store.read_blob(&ov.oid)?;
                merged.conflicts.push(PathConflict {
                    path: path.clone(),
                    base: b,
                    ours: o,
                    theirs: None,
                    worktree,
                });
            }
            (None, Some(tv)) => {
                let worktree = store.read_blob(&tv.oid)?;
                merged.conflicts.push(PathConflict {
                    path: path.clone(),
                    base: b,
                    ours: None,
                    theirs: t,
                    worktree,
                });
            }
            (None, None) => unreachable!("o == t was handled above"),
        }
    }

    Ok(merged)
}
