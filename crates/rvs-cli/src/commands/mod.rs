pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod diff;
pub mod diff_tree;
pub mod init;
pub mod log;
pub mod ls_files;
pub mod ls_tree;
pub mod merge;
pub mod rebase;
pub mod reset;
pub mod restore;
pub mod rm;
pub mod show;
pub mod stash;
pub mod status;
pub mod worktree;

use anyhow::Result;
use bstr::BString;
use clap::Subcommand;
use rvs_repo::Repository;

use crate::Cli;

#[derive(Subcommand)]
pub enum Commands {
    /// Create an empty rvs repository
    Init(init::InitArgs),
    /// Add file contents to the index
    Add(add::AddArgs),
    /// Record changes to the repository
    Commit(commit::CommitArgs),
    /// Show the working tree status
    Status(status::StatusArgs),
    /// Show commit logs
    Log(log::LogArgs),
    /// Show a commit with its changes
    Show(show::ShowArgs),
    /// Show changes between the three views
    Diff(diff::DiffArgs),
    /// Compare the trees of a commit and its parent
    DiffTree(diff_tree::DiffTreeArgs),
    /// Reset current HEAD to the specified state
    Reset(reset::ResetArgs),
    /// List, create, or delete branches
    Branch(branch::BranchArgs),
    /// Switch branches or restore working tree files
    Checkout(checkout::CheckoutArgs),
    /// Join another line of development into the current branch
    Merge(merge::MergeArgs),
    /// Replay local commits on top of another base
    Rebase(rebase::RebaseArgs),
    /// Restore working tree files
    Restore(restore::RestoreArgs),
    /// Remove files from the working tree and from the index
    Rm(rm::RmArgs),
    /// Show information about files in the index
    LsFiles(ls_files::LsFilesArgs),
    /// List the contents of a tree object
    LsTree(ls_tree::LsTreeArgs),
    /// Manage additional working trees
    Worktree(worktree::WorktreeArgs),
    /// Stash away local changes
    Stash(stash::StashArgs),
}

pub fn run(cli: Cli) -> Result<i32> {
    match &cli.command {
        Commands::Init(args) => init::run(args, &cli),
        Commands::Add(args) => add::run(args, &cli),
        Commands::Commit(args) => commit::run(args, &cli),
        Commands::Status(args) => status::run(args, &cli),
        Commands::Log(args) => log::run(args, &cli),
        Commands::Show(args) => show::run(args, &cli),
        Commands::Diff(args) => diff::run(args, &cli),
        Commands::DiffTree(args) => diff_tree::run(args, &cli),
        Commands::Reset(args) => reset::run(args, &cli),
        Commands::Branch(args) => branch::run(args, &cli),
        Commands::Checkout(args) => checkout::run(args, &cli),
        Commands::Merge(args) => merge::run(args, &cli),
        Commands::Rebase(args) => rebase::run(args, &cli),
        Commands::Restore(args) => restore::run(args, &cli),
        Commands::Rm(args) => rm::run(args, &cli),
        Commands::LsFiles(args) => ls_files::run(args, &cli),
        Commands::LsTree(args) => ls_tree::run(args, &cli),
        Commands::Worktree(args) => worktree::run(args, &cli),
        Commands::Stash(args) => stash::run(args, &cli),
    }
}

/// Discover the repository from `--repo` or the current directory.
pub fn open_repo(cli: &Cli) -> Result<Repository> {
    let start = match &cli.repo {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };
    Ok(Repository::discover(start)?)
}

/// Print an expected, user-recoverable failure and return exit code 1.
pub fn user_error(message: impl std::fmt::Display) -> Result<i32> {
    eprintln!("error: {message}");
    Ok(1)
}

/// Normalize CLI path arguments relative to the worktree root.
pub fn normalize_args(repo: &Repository, raw: &[String]) -> Result<Vec<BString>> {
    let cwd = std::env::current_dir()?;
    raw.iter()
        .map(|arg| {
            // Resolve against the CWD; with `--repo` pointing elsewhere,
            // fall back to the worktree root.
            let from_cwd = rvs_utils::path::workdir_relative(repo.work_tree(), &cwd.join(arg));
            let rel = match from_cwd {
                Ok(rel) => rel,
                Err(_) => rvs_utils::path::workdir_relative(
                    repo.work_tree(),
                    &repo.work_tree().join(arg),
                )
                .map_err(|_| rvs_repo::RepoError::PathOutsideRepo(arg.clone()))?,
            };
            Ok(rel)
        })
        .collect()
}

/// Render git's "would be overwritten" refusal for a dirty-worktree error.
pub fn print_overwrite_refusal(action: &str, paths: &[BString]) {
    eprintln!("error: Your local changes to the following files would be overwritten by {action}:");
    for path in paths {
        eprintln!("\t{path}");
    }
    eprintln!("Please commit your changes or stash them before you {action}.");
}
