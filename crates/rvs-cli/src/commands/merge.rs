use std::fs;

use anyhow::Result;
use bstr::BString;
use clap::Args;
use rvs_index::{IndexEntry, Stage, StatData};
use rvs_merge::{merge_trees, MergeLabels};
use rvs_object::{Commit, Object};
use rvs_ref::RefName;
use rvs_repo::{revparse, workdir, RepoError, Repository};
use rvs_revwalk::merge_base;
use rvs_store::walk::build_tree;

use super::{open_repo, print_overwrite_refusal};
use crate::Cli;

#[derive(Args)]
pub struct MergeArgs {
    /// Branch or revision to merge into the current branch
    pub rev: String,
}

pub fn run(args: &MergeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    let ours = match repo.head()?.oid {
        Some(oid) => oid,
        None => {
            eprintln!("merge: {} - not something we can merge", args.rev);
            return Ok(1);
        }
    };
    let theirs = match revparse::resolve(&repo, &args.rev) {
        Ok(oid) => oid,
        Err(RepoError::UnknownRev(_)) => {
            eprintln!("merge: {} - not something we can merge", args.rev);
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    };

    let base = merge_base(repo.store(), &ours, &theirs)?;

    if base == Some(theirs) {
        println!("Already up to date.");
        return Ok(0);
    }

    if base == Some(ours) {
        return fast_forward(&repo, &ours, &theirs);
    }

    three_way(&repo, &ours, &theirs, base.as_ref(), &args.rev)
}

/// Advance HEAD's branch to `theirs` without creating a commit.
fn fast_forward(
    repo: &Repository,
    ours: &rvs_hash::ObjectId,
    theirs: &rvs_hash::ObjectId,
) -> Result<i32> {
    let old_tree = repo.store().read_commit(ours)?.tree;
    let new_tree = repo.store().read_commit(theirs)?.tree;

    let mut index = repo.load_index()?;
    match workdir::materialize_tree(repo, &mut index, &new_tree, Some(&old_tree), false) {
        Ok(()) => {}
        Err(RepoError::DirtyWorktree(paths)) => {
            print_overwrite_refusal("merge", &paths);
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    }
    index.save(repo.index_path())?;

    repo.advance_head(theirs)?;
    println!("Updating {}..{}", ours.short(), theirs.short());
    println!("Fast-forward");
    Ok(0)
}

fn three_way(
    repo: &Repository,
    ours: &rvs_hash::ObjectId,
    theirs: &rvs_hash::ObjectId,
    base: Option<&rvs_hash::ObjectId>,
    rev_label: &str,
) -> Result<i32> {
    // A three-way merge rewrites index and worktree wholesale; local
    // changes must be out of the way first.
    let pre_index = repo.load_index()?;
    let pre_status = workdir::status(repo, &pre_index)?;
    if !pre_status.staged.is_empty() || !pre_status.unstaged.is_empty() {
        let mut paths: Vec<BString> = pre_status
            .staged
            .iter()
            .chain(pre_status.unstaged.iter())
            .map(|(_, path)| path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        print_overwrite_refusal("merge", &paths);
        return Ok(1);
    }

    let ours_tree = repo.store().read_commit(ours)?.tree;
    let theirs_tree = repo.store().read_commit(theirs)?.tree;
    let base_tree = match base {
        Some(oid) => Some(repo.store().read_commit(oid)?.tree),
        None => None,
    };

    let labels = MergeLabels {
        ours: "ours",
        base: "base",
        theirs: "theirs",
    };
    let merged = merge_trees(
        repo.store(),
        base_tree.as_ref(),
        &ours_tree,
        &theirs_tree,
        &labels,
    )?;

    let message = merge_message(repo, rev_label)?;

    if merged.is_clean() {
        // Materialize the merged tree, commit with both parents.
        let merged_tree = build_tree(repo.store(), &merged.entries)?;
        let mut index = repo.load_index()?;
        match workdir::materialize_tree(repo, &mut index, &merged_tree, Some(&ours_tree), false) {
            Ok(()) => {}
            Err(RepoError::DirtyWorktree(paths)) => {
                print_overwrite_refusal("merge", &paths);
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        }
        index.save(repo.index_path())?;

        let commit = Commit {
            tree: merged_tree,
            parents: vec![*ours, *theirs],
            author: repo.author()?,
            committer: repo.committer()?,
            extra_headers: Vec::new(),
            message: BString::from(format!("{message}\n")),
        };
        let oid = repo.store().write(&Object::Commit(commit))?;
        repo.advance_head(&oid)?;
        println!("Merge made by the three-way strategy.");
        return Ok(0);
    }

    // Conflicts: stage-0 entries for clean paths, stages 1/2/3 for the
    // rest, markers in the working tree, and MERGE_HEAD for the eventual
    // commit.
    let mut index = repo.load_index()?;
    index.clear();
    for (path, entry) in &merged.entries {
        workdir::write_file(repo, path.as_ref(), entry)?;
        index.add(IndexEntry {
            path: path.clone(),
            oid: entry.oid,
            mode: entry.mode,
            stage: Stage::Normal,
            stat: StatData::default(),
        });
    }
    // Files the merge result dropped (and that are not conflicted) leave
    // the working tree too.
    let ours_flat = rvs_store::walk::flatten_tree(repo.store(), &ours_tree)?;
    for path in ours_flat.keys() {
        if !merged.entries.contains_key(path)
            && !merged.conflicts.iter().any(|c| c.path == *path)
        {
            workdir::remove_file_and_empty_parents(repo.work_tree(), path)?;
        }
    }
    for conflict in &merged.conflicts {
        if conflict.ours.is_some() && conflict.theirs.is_some() && conflict.base.is_some() {
            println!("Auto-merging {}", conflict.path);
        }
        let stages = [
            (Stage::Base, &conflict.base),
            (Stage::Ours, &conflict.ours),
            (Stage::Theirs, &conflict.theirs),
        ];
        for (stage, side) in stages {
            if let Some(entry) = side {
                index.add(IndexEntry {
                    path: conflict.path.clone(),
                    oid: entry.oid,
                    mode: entry.mode,
                    stage,
                    stat: StatData::default(),
                });
            }
        }
        let target = rvs_utils::path::to_os_path(repo.work_tree(), &conflict.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, &conflict.worktree)?;

        let kind = match (&conflict.ours, &conflict.theirs) {
            (Some(_), Some(_)) if conflict.base.is_none() => "add/add",
            (Some(_), Some(_)) => "content",
            _ => "modify/delete",
        };
        println!("CONFLICT ({kind}): Merge conflict in {}", conflict.path);
    }
    workdir::refresh_stat_cache(repo, &mut index)?;
    index.save(repo.index_path())?;

    fs::write(repo.merge_head_path(), format!("{}\n", theirs.to_hex()))?;
    fs::write(repo.merge_msg_path(), format!("{message}\n"))?;

    println!("Automatic merge failed; fix conflicts and then commit the result.");
    Ok(1)
}

/// Default merge commit message, in git's phrasing.
fn merge_message(repo: &Repository, rev_label: &str) -> Result<String> {
    let is_branch = RefName::branch(rev_label.as_bytes())
        .ok()
        .map(|name| repo.refs().read(&name).map(|v| v.is_some()))
        .transpose()?
        .unwrap_or(false);
    Ok(if is_branch {
        format!("Merge branch '{rev_label}'")
    } else {
        format!("Merge commit '{rev_label}'")
    })
}
