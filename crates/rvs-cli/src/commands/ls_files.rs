use anyhow::Result;
use clap::Args;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct LsFilesArgs {}

pub fn run(_args: &LsFilesArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let index = repo.load_index()?;
    for entry in index.iter() {
        println!("{}", entry.path);
    }
    Ok(0)
}
