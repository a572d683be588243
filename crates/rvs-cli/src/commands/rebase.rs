use anyhow::Result;
use clap::Args;
use rvs_merge::{merge_trees, MergeLabels};
use rvs_object::{Commit, Object};
use rvs_repo::{revparse, workdir};
use rvs_revwalk::merge_base;
use rvs_store::walk::build_tree;

use super::{open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct RebaseArgs {
    /// Base to replay the current branch's commits onto
    pub upstream: String,
}

pub fn run(args: &RebaseArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let head = repo.head()?;
    let head_oid = match head.oid {
        Some(oid) => oid,
        None => return user_error("cannot rebase: HEAD has no commits"),
    };
    let upstream = revparse::resolve(&repo, &args.upstream)?;

    // Local changes would be clobbered by the final tree switch.
    let index = repo.load_index()?;
    let status = workdir::status(&repo, &index)?;
    if !status.staged.is_empty() || !status.unstaged.is_empty() {
        return user_error("cannot rebase: you have unstaged changes");
    }

    let base = merge_base(repo.store(), &head_oid, &upstream)?;
    if base == Some(upstream) {
        println!(
            "Current branch {} is up to date.",
            head.branch
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "HEAD".to_string())
        );
        return Ok(0);
    }

    // Commits to replay: first-parent chain from HEAD back to the base,
    // oldest first.
    let mut pending = Vec::new();
    let mut cursor = head_oid;
    while Some(cursor) != base {
        let commit = repo.store().read_commit(&cursor)?;
        let parent = commit.first_parent().copied();
        pending.push((cursor, commit));
        match parent {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    pending.reverse();

    // Replay in memory; nothing is mutated until every step merges clean.
    let labels = MergeLabels::default();
    let mut new_tip = upstream;
    let mut new_tip_tree = repo.store().read_commit(&upstream)?.tree;

    for (old_oid, commit) in &pending {
        let parent_tree = match commit.first_parent() {
            Some(parent) => Some(repo.store().read_commit(parent)?.tree),
            None => None,
        };
        let merged = merge_trees(
            repo.store(),
            parent_tree.as_ref(),
            &new_tip_tree,
            &commit.tree,
            &labels,
        )?;
        if !merged.is_clean() {
            eprintln!(
                "error: could not apply {} {}",
                old_oid.short(),
                commit.summary()
            );
            eprintln!("hint: the rebase was aborted; no refs were updated");
            return Ok(1);
        }

        let tree = build_tree(repo.store(), &merged.entries)?;
        let replayed = Commit {
            tree,
            parents: vec![new_tip],
            author: commit.author.clone(),
            committer: repo.committer()?,
            extra_headers: Vec::new(),
            message: commit.message.clone(),
        };
        new_tip = repo.store().write(&Object::Commit(replayed))?;
        new_tip_tree = tree;
    }

    // Every step merged: move the branch and the working tree.
    let old_tree = repo.store().read_commit(&head_oid)?.tree;
    let mut index = repo.load_index()?;
    workdir::materialize_tree(&repo, &mut index, &new_tip_tree, Some(&old_tree), false)?;
    index.save(repo.index_path())?;
    repo.advance_head(&new_tip)?;

    match &head.branch {
        Some(branch) => println!("Successfully rebased and updated refs/heads/{branch}."),
        None => println!("Successfully rebased and updated detached HEAD."),
    }
    Ok(0)
}
