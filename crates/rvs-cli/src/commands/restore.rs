use anyhow::Result;
use clap::Args;
use rvs_index::Pathspec;
use rvs_repo::{revparse, workdir};
use rvs_store::walk::flatten_tree;

use super::{normalize_args, open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct RestoreArgs {
    /// Revision to restore from (defaults to HEAD)
    #[arg(long, value_name = "rev")]
    pub source: Option<String>,

    /// Restore the index instead of the working tree
    #[arg(long)]
    pub staged: bool,

    /// Paths to restore
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<String>,
}

pub fn run(args: &RestoreArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let spec = args.source.as_deref().unwrap_or("HEAD");
    let tree = revparse::resolve_to_tree(&repo, spec)?;
    let flat = flatten_tree(repo.store(), &tree)?;
    let pathspec = Pathspec::new(normalize_args(&repo, &args.paths)?);

    let mut index = repo.load_index()?;
    let (into_index, into_worktree) = if args.staged {
        (true, false)
    } else {
        (false, true)
    };
    let mut touched =
        workdir::checkout_paths(&repo, &mut index, &flat, &pathspec, into_index, into_worktree)?;

    // Restoring the index from a tree that lacks the path means unstaging
    // a new file: drop the entry.
    if args.staged {
        let staged_gone: Vec<bstr::BString> = index
            .iter()
            .filter(|e| pathspec.matches(e.path.as_ref()) && !flat.contains_key(&e.path))
            .map(|e| e.path.clone())
            .collect();
        for path in staged_gone {
            index.remove(path.as_ref());
            touched += 1;
        }
    }

    if touched == 0 {
        return user_error(format!(
            "pathspec '{}' did not match any file(s) known to rvs",
            args.paths.join(" ")
        ));
    }
    index.save(repo.index_path())?;
    Ok(0)
}
