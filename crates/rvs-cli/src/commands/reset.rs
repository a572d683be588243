use anyhow::Result;
use bstr::BString;
use clap::Args;
use rvs_repo::{revparse, workdir};
use rvs_store::walk::flatten_tree;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct ResetArgs {
    /// Move HEAD only
    #[arg(long, conflicts_with_all = ["mixed", "hard"])]
    pub soft: bool,

    /// Move HEAD and rewrite the index (default)
    #[arg(long, conflicts_with = "hard")]
    pub mixed: bool,

    /// Move HEAD, rewrite the index, and reset the working tree
    #[arg(long)]
    pub hard: bool,

    /// Revision to reset to (defaults to HEAD)
    pub rev: Option<String>,
}

pub fn run(args: &ResetArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let spec = args.rev.as_deref().unwrap_or("HEAD");
    let target = revparse::resolve(&repo, spec)?;
    let target_tree = repo.store().read_commit(&target)?.tree;

    // Remember what was materialized before HEAD moves.
    let old_tree = repo.head_tree()?;
    let mut index = repo.load_index()?;
    let tracked_before: Vec<BString> = index.iter().map(|e| e.path.clone()).collect();

    repo.advance_head(&target)?;
    repo.clear_merge_state()?;

    if args.soft {
        return Ok(0);
    }

    let flat = flatten_tree(repo.store(), &target_tree)?;
    if args.hard {
        workdir::materialize_tree(&repo, &mut index, &target_tree, old_tree.as_ref(), true)?;
        // Staged-but-never-committed files are tracked state too; drop any
        // the target does not know about.
        for path in tracked_before {
            if !flat.contains_key(&path) {
                workdir::remove_file_and_empty_parents(repo.work_tree(), &path)?;
            }
        }
        println!(
            "HEAD is now at {} {}",
            target.short(),
            repo.store().read_commit(&target)?.summary()
        );
    } else {
        index.read_tree(&flat);
    }
    index.save(repo.index_path())?;
    Ok(0)
}
