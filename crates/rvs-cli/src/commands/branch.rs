use anyhow::Result;
use clap::Args;
use rvs_ref::RefName;
use rvs_repo::{revparse, worktree, RepoError};
use rvs_revwalk::is_ancestor;

use super::{open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct BranchArgs {
    /// Delete a branch (must be fully merged into HEAD)
    #[arg(short = 'd', conflicts_with = "force_delete")]
    pub delete: bool,

    /// Delete a branch regardless of its merge state
    #[arg(short = 'D')]
    pub force_delete: bool,

    /// Branch name (omit to list branches)
    pub name: Option<String>,

    /// Start point for a new branch (defaults to HEAD)
    pub start_point: Option<String>,
}

pub fn run(args: &BranchArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    if args.delete || args.force_delete {
        let name = match &args.name {
            Some(name) => name,
            None => return user_error("branch name required"),
        };
        return delete(&repo, name, args.force_delete);
    }

    match &args.name {
        None => list(&repo),
        Some(name) => create(&repo, name, args.start_point.as_deref()),
    }
}

fn list(repo: &rvs_repo::Repository) -> Result<i32> {
    let head = repo.head()?;
    if head.is_detached() {
        if let Some(oid) = head.oid {
            println!("* (HEAD detached at {})", oid.short());
        }
    }
    for (name, _) in repo.refs().list_branches()? {
        let marker = if head.branch.as_ref() == Some(&name) {
            "* "
        } else {
            "  "
        };
        println!("{marker}{name}");
    }
    Ok(0)
}

fn create(repo: &rvs_repo::Repository, name: &str, start: Option<&str>) -> Result<i32> {
    let target = revparse::resolve(repo, start.unwrap_or("HEAD"))?;
    match repo.refs().create_branch(name.as_bytes(), &target, false) {
        Ok(()) => Ok(0),
        Err(rvs_ref::RefError::BranchExists(name)) => {
            user_error(format!("a branch named '{name}' already exists"))
        }
        Err(e) => Err(e.into()),
    }
}

fn delete(repo: &rvs_repo::Repository, name: &str, force: bool) -> Result<i32> {
    let head = repo.head()?;
    if head.branch.as_deref().map(|b| b.as_slice()) == Some(name.as_bytes()) {
        return user_error(format!(
            "cannot delete branch '{name}' checked out in this worktree"
        ));
    }
    if let Some(at) = worktree::branch_in_use(repo, name.as_bytes())? {
        return user_error(format!(
            "cannot delete branch '{name}' checked out at '{}'",
            at.display()
        ));
    }

    let branch_ref = RefName::branch(name.as_bytes())?;
    let target = match repo.refs().resolve(&branch_ref)? {
        Some(oid) => oid,
        None => return user_error(format!("branch '{name}' not found")),
    };

    if !force {
        let merged = match head.oid {
            Some(head_oid) => is_ancestor(repo.store(), &target, &head_oid)?,
            None => false,
        };
        if !merged {
            return user_error(RepoError::BranchNotFullyMerged(name.to_string()));
        }
    }

    repo.refs().delete_branch(name.as_bytes())?;
    println!("Deleted branch {name} (was {}).", target.short());
    Ok(0)
}
