use anyhow::Result;
use clap::Args;
use rvs_index::Pathspec;
use rvs_ref::RefName;
use rvs_repo::{revparse, workdir, worktree, RepoError, Repository};
use rvs_store::walk::flatten_tree;

use super::{normalize_args, open_repo, print_overwrite_refusal, user_error};
use crate::Cli;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Create a new branch before switching to it
    #[arg(short = 'b', value_name = "branch", conflicts_with = "force_branch")]
    pub new_branch: Option<String>,

    /// Create or reset a branch before switching to it
    #[arg(short = 'B', value_name = "branch")]
    pub force_branch: Option<String>,

    /// Detach HEAD at the given revision
    #[arg(long)]
    pub detach: bool,

    /// Branch or revision to check out (start point with -b/-B)
    pub target: Option<String>,

    /// Restore only these paths from the revision; HEAD does not move
    #[arg(last = true, value_name = "path")]
    pub paths: Vec<String>,
}

pub fn run(args: &CheckoutArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;

    // Path restoration mode: `checkout [<rev>] -- <paths>`.
    if !args.paths.is_empty() {
        return checkout_paths(&repo, args);
    }

    // Branch creation modes.
    if let Some(name) = args.new_branch.as_deref().or(args.force_branch.as_deref()) {
        let start = args.target.as_deref().unwrap_or("HEAD");
        let start_oid = revparse::resolve(&repo, start)?;
        let force = args.force_branch.is_some();
        match repo.refs().create_branch(name.as_bytes(), &start_oid, force) {
            Ok(()) => {}
            Err(rvs_ref::RefError::BranchExists(name)) => {
                return user_error(format!("a branch named '{name}' already exists"));
            }
            Err(e) => return Err(e.into()),
        }
        return switch_to_branch(&repo, name);
    }

    let target = match args.target.as_deref() {
        Some(target) => target,
        None => return user_error("expected a branch, revision, or '-- <paths>'"),
    };

    if args.detach {
        let oid = revparse::resolve(&repo, target)?;
        return switch(&repo, &oid, HeadUpdate::Detach(oid));
    }

    // A branch name switches symbolically; anything else detaches.
    let as_branch = RefName::branch(target.as_bytes());
    if let Ok(name) = as_branch {
        if repo.refs().read(&name)?.is_some() {
            return switch_to_branch(&repo, target);
        }
    }
    let oid = revparse::resolve(&repo, target)?;
    switch(&repo, &oid, HeadUpdate::Detach(oid))
}

enum HeadUpdate {
    Branch(String),
    Detach(rvs_hash::ObjectId),
}

fn switch_to_branch(repo: &Repository, name: &str) -> Result<i32> {
    if let Some(at) = worktree::branch_in_use(repo, name.as_bytes())? {
        if at != repo.work_tree() {
            return user_error(format!(
                "branch '{name}' is already checked out at '{}'",
                at.display()
            ));
        }
    }
    let oid = revparse::resolve(repo, name)?;
    switch(repo, &oid, HeadUpdate::Branch(name.to_string()))
}

/// Materialize the target commit's tree, then move HEAD.
fn switch(repo: &Repository, commit: &rvs_hash::ObjectId, update: HeadUpdate) -> Result<i32> {
    let new_tree = repo.store().read_commit(commit)?.tree;
    let old_tree = repo.head_tree()?;

    let mut index = repo.load_index()?;
    match workdir::materialize_tree(repo, &mut index, &new_tree, old_tree.as_ref(), false) {
        Ok(()) => {}
        Err(RepoError::DirtyWorktree(paths)) => {
            print_overwrite_refusal("checkout", &paths);
            return Ok(1);
        }
        Err(e) => return Err(e.into()),
    }
    index.save(repo.index_path())?;

    match update {
        HeadUpdate::Branch(name) => {
            repo.refs().set_head_to_branch(name.as_bytes())?;
            println!("Switched to branch '{name}'");
        }
        HeadUpdate::Detach(oid) => {
            repo.refs().set_head_detached(&oid)?;
            println!(
                "HEAD is now at {} {}",
                oid.short(),
                repo.store().read_commit(&oid)?.summary()
            );
        }
    }
    Ok(0)
}

/// Restore paths from a revision's tree into worktree and index.
fn checkout_paths(repo: &Repository, args: &CheckoutArgs) -> Result<i32> {
    let spec = args.target.as_deref().unwrap_or("HEAD");
    let tree = revparse::resolve_to_tree(repo, spec)?;
    let flat = flatten_tree(repo.store(), &tree)?;
    let pathspec = Pathspec::new(normalize_args(repo, &args.paths)?);

    let mut index = repo.load_index()?;
    let touched = workdir::checkout_paths(repo, &mut index, &flat, &pathspec, true, true)?;
    if touched == 0 {
        return user_error(format!(
            "pathspec '{}' did not match any file(s) known to rvs",
            args.paths.join(" ")
        ));
    }
    index.save(repo.index_path())?;
    Ok(0)
}
