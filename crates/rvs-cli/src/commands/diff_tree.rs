use anyhow::Result;
use clap::Args;
use rvs_diff::tree::{diff_trees, TreeChange};
use rvs_hash::ObjectId;
use rvs_repo::revparse;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct DiffTreeArgs {
    /// Revision whose tree is compared against its first parent
    pub rev: String,

    /// Suppress the leading commit id line
    #[arg(long)]
    pub no_commit_id: bool,

    /// Show names and status letters instead of raw entries
    #[arg(long)]
    pub name_status: bool,

    /// Recurse into subtrees
    #[arg(short = 'r')]
    pub recurse: bool,
}

pub fn run(args: &DiffTreeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let oid = revparse::resolve(&repo, &args.rev)?;
    let commit = repo.store().read_commit(&oid)?;

    let parent_tree = match commit.first_parent() {
        Some(parent) => Some(repo.store().read_commit(parent)?.tree),
        None => None,
    };
    let changes = diff_trees(
        repo.store(),
        parent_tree.as_ref(),
        Some(&commit.tree),
        args.recurse,
    )?;

    if !args.no_commit_id {
        println!("{}", oid.to_hex());
    }
    if args.name_status {
        print!("{}", rvs_diff::format::nameonly::name_status(&changes));
    } else {
        for change in &changes {
            print!("{}", raw_line(change));
        }
    }
    Ok(0)
}

/// Raw diff-tree entry:
/// `:<old-mode> <new-mode> <old-oid> <new-oid> <letter>\t<path>`.
fn raw_line(change: &TreeChange) -> String {
    let (old_mode, old_oid) = match &change.old {
        Some(v) => (v.mode.raw(), v.oid),
        None => (0, ObjectId::NULL),
    };
    let (new_mode, new_oid) = match &change.new {
        Some(v) => (v.mode.raw(), v.oid),
        None => (0, ObjectId::NULL),
    };
    format!(
        ":{old_mode:06o} {new_mode:06o} {} {} {}\t{}\n",
        old_oid.to_hex(),
        new_oid.to_hex(),
        change.kind.letter(),
        change.path,
    )
}
