use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use rvs_repo::{worktree, RepoError};

use super::{open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct WorktreeArgs {
    #[command(subcommand)]
    pub command: WorktreeCommand,
}

#[derive(Subcommand)]
pub enum WorktreeCommand {
    /// Create a new worktree checked out at the given revision
    Add {
        path: PathBuf,
        /// Branch or revision to check out (defaults to HEAD)
        rev: Option<String>,
    },
    /// List the main worktree and every linked one
    List,
    /// Remove a worktree and its metadata
    Remove { path: PathBuf },
    /// Protect a worktree from removal
    Lock { path: PathBuf },
    /// Undo a lock
    Unlock { path: PathBuf },
}

pub fn run(args: &WorktreeArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    match &args.command {
        WorktreeCommand::Add { path, rev } => {
            match worktree::add(&repo, path, rev.as_deref()) {
                Ok(()) => {
                    println!("Preparing worktree at {}", path.display());
                    Ok(0)
                }
                Err(RepoError::WorktreeExists(path)) => {
                    user_error(format!("'{}' already exists", path.display()))
                }
                Err(RepoError::BranchInUse { branch, at }) => user_error(format!(
                    "'{branch}' is already checked out at '{}'",
                    at.display()
                )),
                Err(e) => Err(e.into()),
            }
        }
        WorktreeCommand::List => {
            for info in worktree::list(&repo)? {
                let head = info
                    .head
                    .map(|oid| oid.short())
                    .unwrap_or_else(|| "-------".to_string());
                let describe = match &info.branch {
                    Some(branch) => format!("[{branch}]"),
                    None => "(detached HEAD)".to_string(),
                };
                let lock = if info.locked { " locked" } else { "" };
                println!("{}  {head} {describe}{lock}", info.path.display());
            }
            Ok(0)
        }
        WorktreeCommand::Remove { path } => match worktree::remove(&repo, path) {
            Ok(()) => Ok(0),
            Err(RepoError::WorktreeLocked(path)) => user_error(format!(
                "cannot remove a locked working tree: '{}'",
                path.display()
            )),
            Err(e) => Err(e.into()),
        },
        WorktreeCommand::Lock { path } => {
            worktree::lock(&repo, path)?;
            Ok(0)
        }
        WorktreeCommand::Unlock { path } => {
            worktree::unlock(&repo, path)?;
            Ok(0)
        }
    }
}
