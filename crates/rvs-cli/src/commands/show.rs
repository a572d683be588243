use anyhow::Result;
use clap::Args;
use rvs_diff::tree::diff_trees;
use rvs_repo::revparse;

use super::diff::{load_change_data, render, OutputMode};
use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct ShowArgs {
    /// Revision to show (defaults to HEAD)
    pub rev: Option<String>,

    /// Show only names of changed files
    #[arg(long)]
    pub name_only: bool,

    /// Show names and status letters of changed files
    #[arg(long)]
    pub name_status: bool,

    /// Show a diffstat instead of a patch
    #[arg(long)]
    pub stat: bool,
}

pub fn run(args: &ShowArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let spec = args.rev.as_deref().unwrap_or("HEAD");
    let oid = revparse::resolve(&repo, spec)?;
    let commit = repo.store().read_commit(&oid)?;

    println!("commit {}", oid.to_hex());
    if commit.is_merge() {
        let shorts: Vec<String> = commit.parents.iter().map(|p| p.short()).collect();
        println!("Merge: {}", shorts.join(" "));
    }
    println!("Author: {} <{}>", commit.author.name, commit.author.email);
    println!("Date:   {}", commit.author.when.to_default());
    println!();
    for line in commit.message.to_string().lines() {
        println!("    {line}");
    }
    println!();

    // Diff against the first parent; the empty tree for a root commit.
    let parent_tree = match commit.first_parent() {
        Some(parent) => Some(repo.store().read_commit(parent)?.tree),
        None => None,
    };
    let changes = diff_trees(
        repo.store(),
        parent_tree.as_ref(),
        Some(&commit.tree),
        true,
    )?;
    let with_data = load_change_data(&repo, changes)?;

    let mode = if args.name_only {
        OutputMode::NameOnly
    } else if args.name_status {
        OutputMode::NameStatus
    } else if args.stat {
        OutputMode::Stat
    } else {
        OutputMode::Patch
    };
    print!("{}", render(&with_data, mode));
    Ok(0)
}
