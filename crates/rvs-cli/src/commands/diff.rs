use std::collections::BTreeMap;

use anyhow::Result;
use bstr::BString;
use clap::Args;
use rvs_diff::format::stat::StatEntry;
use rvs_diff::tree::{ChangeKind, FileVersion, TreeChange};
use rvs_diff::{algorithm, format, is_binary, DEFAULT_CONTEXT};
use rvs_index::{Pathspec, Stage};
use rvs_object::ObjectKind;
use rvs_repo::{revparse, workdir, Repository};
use rvs_store::walk::{flatten_tree, FlatEntry};

use super::{normalize_args, open_repo};
use crate::Cli;

#[derive(Args)]
pub struct DiffArgs {
    /// Compare the index against HEAD (or the given revision)
    #[arg(long)]
    pub cached: bool,

    /// Revision to compare against
    pub rev: Option<String>,

    /// Limit the diff to the given paths
    #[arg(last = true, value_name = "path")]
    pub paths: Vec<String>,
}

/// How the change stream is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Patch,
    NameOnly,
    NameStatus,
    Stat,
}

pub fn run(args: &DiffArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let pathspec = Pathspec::new(normalize_args(&repo, &args.paths)?);
    let index = repo.load_index()?;

    // Assemble the two sides as flat listings plus content readers.
    let index_flat = index_listing(&index);
    let changes = if args.cached {
        let base_tree = match &args.rev {
            Some(rev) => Some(revparse::resolve_to_tree(&repo, rev)?),
            None => repo.head_tree()?,
        };
        let base_flat = match base_tree {
            Some(tree) => flatten_tree(repo.store(), &tree)?,
            None => BTreeMap::new(),
        };
        listing_diff(&repo, &base_flat, &index_flat, SideSource::Store)?
    } else {
        match &args.rev {
            Some(rev) => {
                let base_tree = revparse::resolve_to_tree(&repo, rev)?;
                let base_flat = flatten_tree(repo.store(), &base_tree)?;
                let wt_flat = worktree_listing(&repo, &index)?;
                listing_diff(&repo, &base_flat, &wt_flat, SideSource::Worktree)?
            }
            None => {
                let wt_flat = worktree_listing(&repo, &index)?;
                listing_diff(&repo, &index_flat, &wt_flat, SideSource::Worktree)?
            }
        }
    };

    let selected: Vec<ChangeWithData> = changes
        .into_iter()
        .filter(|c| pathspec.matches(c.change.path.as_ref()))
        .collect();

    print!("{}", render(&selected, OutputMode::Patch));
    Ok(0)
}

/// A tree-diff entry bundled with both sides' contents.
pub struct ChangeWithData {
    pub change: TreeChange,
    pub old_data: Vec<u8>,
    pub new_data: Vec<u8>,
}

/// Where the new side's bytes come from.
enum SideSource {
    /// Blobs already in the object store.
    Store,
    /// Files on disk (their listing carries freshly hashed OIDs).
    Worktree,
}

/// Stage-0 index entries as a flat listing.
pub fn index_listing(index: &rvs_index::Index) -> BTreeMap<BString, FlatEntry> {
    index
        .iter()
        .filter(|e| e.stage == Stage::Normal)
        .map(|e| {
            (
                e.path.clone(),
                FlatEntry {
                    mode: e.mode,
                    oid: e.oid,
                },
            )
        })
        .collect()
}

/// The worktree state of every tracked path, with on-disk contents hashed
/// (but not written) for comparison.
fn worktree_listing(
    repo: &Repository,
    index: &rvs_index::Index,
) -> Result<BTreeMap<BString, FlatEntry>> {
    let mut out = BTreeMap::new();
    for entry in index.iter().filter(|e| e.stage == Stage::Normal) {
        if let Some((mode, data)) = workdir::read_file(repo, entry.path.as_ref())? {
            let oid = rvs_store::ObjectStore::hash_only(ObjectKind::Blob, &data)?;
            out.insert(entry.path.clone(), FlatEntry { mode, oid });
        }
    }
    Ok(out)
}

/// Diff two flat listings and attach contents to every change.
fn listing_diff(
    repo: &Repository,
    old: &BTreeMap<BString, FlatEntry>,
    new: &BTreeMap<BString, FlatEntry>,
    new_source: SideSource,
) -> Result<Vec<ChangeWithData>> {
    let mut out = Vec::new();

    let mut paths: Vec<&BString> = old.keys().chain(new.keys()).collect();
    paths.sort();
    paths.dedup();

    for path in paths {
        let old_entry = old.get(path);
        let new_entry = new.get(path);
        if old_entry == new_entry {
            continue;
        }

        let kind = match (old_entry, new_entry) {
            (None, Some(_)) => ChangeKind::Added,
            (Some(_), None) => ChangeKind::Deleted,
            _ => ChangeKind::Modified,
        };
        let old_data = match old_entry {
            Some(e) => repo.store().read_blob(&e.oid)?,
            None => Vec::new(),
        };
        let new_data = match (new_entry, &new_source) {
            (Some(e), SideSource::Store) => repo.store().read_blob(&e.oid)?,
            (Some(_), SideSource::Worktree) => workdir::read_file(repo, path.as_ref())?
                .map(|(_, data)| data)
                .unwrap_or_default(),
            (None, _) => Vec::new(),
        };

        out.push(ChangeWithData {
            change: TreeChange {
                kind,
                path: path.clone(),
                old: old_entry.map(|e| FileVersion {
                    mode: e.mode,
                    oid: e.oid,
                }),
                new: new_entry.map(|e| FileVersion {
                    mode: e.mode,
                    oid: e.oid,
                }),
            },
            old_data,
            new_data,
        });
    }
    Ok(out)
}

/// Attach blob contents from the store to a tree-diff stream.
pub fn load_change_data(
    repo: &Repository,
    changes: Vec<TreeChange>,
) -> Result<Vec<ChangeWithData>> {
    changes
        .into_iter()
        .map(|change| {
            let old_data = match &change.old {
                Some(v) if v.mode.is_file() || v.mode == rvs_object::FileMode::Symlink => {
                    repo.store().read_blob(&v.oid)?
                }
                _ => Vec::new(),
            };
            let new_data = match &change.new {
                Some(v) if v.mode.is_file() || v.mode == rvs_object::FileMode::Symlink => {
                    repo.store().read_blob(&v.oid)?
                }
                _ => Vec::new(),
            };
            Ok(ChangeWithData {
                change,
                old_data,
                new_data,
            })
        })
        .collect()
}

/// Render a change stream in the requested mode.
pub fn render(changes: &[ChangeWithData], mode: OutputMode) -> String {
    match mode {
        OutputMode::Patch => changes
            .iter()
            .map(|c| format::unified::format_patch(&c.change, &c.old_data, &c.new_data, DEFAULT_CONTEXT))
            .collect(),
        OutputMode::NameOnly => {
            let plain: Vec<TreeChange> = changes.iter().map(|c| c.change.clone()).collect();
            format::nameonly::name_only(&plain)
        }
        OutputMode::NameStatus => {
            let plain: Vec<TreeChange> = changes.iter().map(|c| c.change.clone()).collect();
            format::nameonly::name_status(&plain)
        }
        OutputMode::Stat => {
            let entries: Vec<StatEntry> = changes
                .iter()
                .map(|c| {
                    let binary = is_binary(&c.old_data) || is_binary(&c.new_data);
                    let (additions, deletions) = if binary {
                        (0, 0)
                    } else {
                        count_changes(&c.old_data, &c.new_data)
                    };
                    StatEntry {
                        path: c.change.path.clone(),
                        additions,
                        deletions,
                        binary,
                    }
                })
                .collect();
            format::stat::render(&entries)
        }
    }
}

fn count_changes(old: &[u8], new: &[u8]) -> (usize, usize) {
    use rvs_diff::algorithm::EditOp;
    let mut additions = 0;
    let mut deletions = 0;
    for edit in algorithm::diff_edits(old, new) {
        match edit.op {
            EditOp::Insert => additions += 1,
            EditOp::Delete => deletions += 1,
            EditOp::Equal => {}
        }
    }
    (additions, deletions)
}
