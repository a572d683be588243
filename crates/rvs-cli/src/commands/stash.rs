use anyhow::Result;
use bstr::BString;
use clap::{Args, Subcommand};
use rvs_hash::ObjectId;
use rvs_index::{IndexEntry, Stage, StatData};
use rvs_merge::{merge_trees, MergeLabels};
use rvs_object::{Commit, Object, ObjectKind};
use rvs_ref::{reflog, RefName, ReflogEntry};
use rvs_repo::{workdir, Repository};
use rvs_store::walk::flatten_tree;

use super::{open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct StashArgs {
    #[command(subcommand)]
    pub command: Option<StashCommand>,
}

#[derive(Subcommand)]
pub enum StashCommand {
    /// Save local changes and reset to HEAD
    Push {
        /// Message recorded with the stash entry
        #[arg(short = 'm', value_name = "msg")]
        message: Option<String>,
    },
    /// Apply the newest stash entry and drop it
    Pop,
    /// Apply the newest stash entry, keeping it on the stack
    Apply,
    /// List stash entries, newest first
    List,
}

pub fn run(args: &StashArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    match args.command.as_ref().unwrap_or(&StashCommand::Push { message: None }) {
        StashCommand::Push { message } => push(&repo, message.as_deref()),
        StashCommand::Pop => replay(&repo, true),
        StashCommand::Apply => replay(&repo, false),
        StashCommand::List => list(&repo),
    }
}

fn stash_ref() -> RefName {
    RefName::new("refs/stash").expect("refs/stash is a valid name")
}

fn push(repo: &Repository, message: Option<&str>) -> Result<i32> {
    let head = repo.head()?;
    let head_oid = match head.oid {
        Some(oid) => oid,
        None => return user_error("you do not have the initial commit yet"),
    };
    let head_commit = repo.store().read_commit(&head_oid)?;
    let branch = head
        .branch
        .as_ref()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "(no branch)".to_string());

    // The two snapshots: what is staged, and what is on disk for every
    // tracked path.
    let index = repo.load_index()?;
    if index.has_conflicts() {
        return user_error("cannot stash with unmerged paths");
    }
    let index_tree = index.write_tree(repo.store())?;

    let mut wt_index = index.clone();
    for entry in index.iter() {
        match workdir::read_file(repo, entry.path.as_ref())? {
            Some((mode, data)) => {
                let oid = repo.store().write_raw(ObjectKind::Blob, &data)?;
                wt_index.add(IndexEntry {
                    path: entry.path.clone(),
                    oid,
                    mode,
                    stage: Stage::Normal,
                    stat: StatData::default(),
                });
            }
            None => {
                wt_index.remove(entry.path.as_ref());
            }
        }
    }
    let wt_tree = wt_index.write_tree(repo.store())?;

    if index_tree == head_commit.tree && wt_tree == head_commit.tree {
        println!("No local changes to save");
        return Ok(0);
    }

    let label = format!("{} {}", head_oid.short(), head_commit.summary());
    let stash_message = match message {
        Some(custom) => format!("On {branch}: {custom}"),
        None => format!("WIP on {branch}: {label}"),
    };

    let committer = repo.committer()?;
    let index_commit = Commit {
        tree: index_tree,
        parents: vec![head_oid],
        author: committer.clone(),
        committer: committer.clone(),
        extra_headers: Vec::new(),
        message: BString::from(format!("index on {branch}: {label}\n")),
    };
    let index_commit_oid = repo.store().write(&Object::Commit(index_commit))?;

    let stash_commit = Commit {
        tree: wt_tree,
        parents: vec![head_oid, index_commit_oid],
        author: committer.clone(),
        committer: committer.clone(),
        extra_headers: Vec::new(),
        message: BString::from(format!("{stash_message}\n")),
    };
    let stash_oid = repo.store().write(&Object::Commit(stash_commit))?;

    // The stack: refs/stash holds the newest entry, the reflog the rest.
    let stash = stash_ref();
    let previous = repo.refs().resolve(&stash)?.unwrap_or(ObjectId::NULL);
    repo.refs().write_direct(&stash, &stash_oid)?;
    reflog::append(
        &repo.refs().log_path(&stash),
        &ReflogEntry {
            old: previous,
            new: stash_oid,
            who: committer,
            message: BString::from(stash_message.clone()),
        },
    )?;

    // Back to a clean HEAD state; deletions are judged against the
    // worktree snapshot just captured.
    let mut index = index;
    workdir::materialize_tree(repo, &mut index, &head_commit.tree, Some(&wt_tree), true)?;
    index.save(repo.index_path())?;

    println!("Saved working directory and index state {stash_message}");
    Ok(0)
}

fn list(repo: &Repository) -> Result<i32> {
    let entries = reflog::read(&repo.refs().log_path(&stash_ref()))?;
    for (n, entry) in entries.iter().rev().enumerate() {
        println!("stash@{{{n}}}: {}", entry.message);
    }
    Ok(0)
}

/// Replay the newest stash entry onto HEAD as a three-way merge; `drop`
/// removes it from the stack afterwards (pop semantics).
fn replay(repo: &Repository, drop_entry: bool) -> Result<i32> {
    let log_path = repo.refs().log_path(&stash_ref());
    let entries = reflog::read(&log_path)?;
    let newest = match entries.last() {
        Some(entry) => entry.clone(),
        None => return user_error("no stash entries found"),
    };

    let stash_commit = repo.store().read_commit(&newest.new)?;
    let stash_base = *stash_commit
        .first_parent()
        .ok_or_else(|| anyhow::anyhow!("stash commit {} has no parent", newest.new.short()))?;
    let base_tree = repo.store().read_commit(&stash_base)?.tree;

    let head_tree = match repo.head_tree()? {
        Some(tree) => tree,
        None => return user_error("cannot apply a stash without a commit on HEAD"),
    };

    // Replaying over local changes would tangle two sets of edits.
    let index = repo.load_index()?;
    let status = workdir::status(repo, &index)?;
    if !status.staged.is_empty() || !status.unstaged.is_empty() {
        return user_error("cannot apply stash: you have local changes");
    }

    let merged = merge_trees(
        repo.store(),
        Some(&base_tree),
        &head_tree,
        &stash_commit.tree,
        &MergeLabels::default(),
    )?;

    let head_flat = flatten_tree(repo.store(), &head_tree)?;
    if merged.is_clean() {
        // Write the replayed state to the worktree only; the changes show
        // up as unstaged, like a fresh edit.
        for (path, entry) in &merged.entries {
            if head_flat.get(path) != Some(entry) {
                workdir::write_file(repo, path.as_ref(), entry)?;
            }
        }
        for path in head_flat.keys() {
            if !merged.entries.contains_key(path) {
                workdir::remove_file_and_empty_parents(repo.work_tree(), path)?;
            }
        }

        if drop_entry {
            drop_newest(repo, &entries)?;
            println!("Dropped refs/stash@{{0}}");
        }
        return Ok(0);
    }

    // Conflicts: record stages and markers; the entry stays on the stack
    // even for pop.
    let mut index = repo.load_index()?;
    for conflict in &merged.conflicts {
        index.remove(conflict.path.as_ref());
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
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &conflict.worktree)?;
        println!("CONFLICT (content): Merge conflict in {}", conflict.path);
    }
    index.save(repo.index_path())?;
    eprintln!("error: could not apply the stash cleanly");
    Ok(1)
}

/// Remove the newest entry: rewrite the log and repoint (or delete)
/// `refs/stash`.
fn drop_newest(repo: &Repository, entries: &[ReflogEntry]) -> Result<()> {
    let stash = stash_ref();
    let remaining = &entries[..entries.len() - 1];
    reflog::rewrite(&repo.refs().log_path(&stash), remaining)?;
    match remaining.last() {
        Some(prev) => repo.refs().write_direct(&stash, &prev.new)?,
        None => repo.refs().delete(&stash)?,
    }
    Ok(())
}
