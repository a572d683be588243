use anyhow::Result;
use bstr::BString;
use clap::Args;
use rvs_object::{Commit, Object};

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct CommitArgs {
    /// Commit message
    #[arg(short = 'm', long = "message", required = true)]
    pub message: String,

    /// Allow a commit whose tree equals its parent's
    #[arg(long)]
    pub allow_empty: bool,
}

pub fn run(args: &CommitArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let index = repo.load_index()?;

    if index.has_conflicts() {
        eprintln!("error: Committing is not possible because you have unmerged files.");
        eprintln!("hint: Fix them up in the work tree, and then use 'rvs add <file>'");
        eprintln!("hint: as appropriate to mark resolution and make a commit.");
        return Ok(1);
    }

    let head = repo.head()?;
    let merge_head = repo.merge_head()?;
    let tree = index.write_tree(repo.store())?;

    // Without staged changes (and no merge to conclude) there is nothing
    // to record.
    if !args.allow_empty && merge_head.is_none() {
        let parent_tree = match head.oid {
            Some(parent) => Some(repo.store().read_commit(&parent)?.tree),
            None => None,
        };
        let unchanged = match parent_tree {
            Some(parent_tree) => parent_tree == tree,
            None => index.is_empty(),
        };
        if unchanged {
            println!("nothing to commit, working tree clean");
            return Ok(1);
        }
    }

    let mut parents: Vec<_> = head.oid.into_iter().collect();
    if let Some(second) = merge_head {
        parents.push(second);
    }

    let mut message = args.message.clone();
    if !message.ends_with('\n') {
        message.push('\n');
    }

    let commit = Commit {
        tree,
        parents,
        author: repo.author()?,
        committer: repo.committer()?,
        extra_headers: Vec::new(),
        message: BString::from(message),
    };
    let is_root = commit.is_root();
    let oid = repo.store().write(&Object::Commit(commit))?;

    repo.advance_head(&oid)?;
    repo.clear_merge_state()?;

    let location = match (&head.branch, is_root) {
        (Some(branch), true) => format!("{branch} (root-commit)"),
        (Some(branch), false) => branch.to_string(),
        (None, _) => "detached HEAD".to_string(),
    };
    let subject = args.message.lines().next().unwrap_or_default();
    println!("[{location} {}] {subject}", oid.short());
    Ok(0)
}
