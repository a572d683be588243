use anyhow::Result;
use clap::Args;
use rvs_repo::Repository;

use crate::Cli;

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory)
    pub directory: Option<std::path::PathBuf>,
}

pub fn run(args: &InitArgs, cli: &Cli) -> Result<i32> {
    let target = match (&args.directory, &cli.repo) {
        (Some(dir), _) => dir.clone(),
        (None, Some(repo)) => repo.clone(),
        (None, None) => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&target)?;

    let repo = Repository::init(&target)?;
    println!(
        "Initialized empty rvs repository in {}",
        repo.rvs_dir().display()
    );
    Ok(0)
}
