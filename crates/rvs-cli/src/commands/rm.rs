use anyhow::Result;
use bstr::BString;
use clap::Args;
use rvs_index::Stage;
use rvs_repo::workdir;

use super::{normalize_args, open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct RmArgs {
    /// Remove from the index only, keeping the working tree file
    #[arg(long)]
    pub cached: bool,

    /// Remove even when the file has local modifications
    #[arg(short = 'f', long = "force")]
    pub force: bool,

    /// Paths to remove
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<String>,
}

pub fn run(args: &RmArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let specs = normalize_args(&repo, &args.paths)?;
    let mut index = repo.load_index()?;

    // Resolve every argument before mutating anything.
    let mut victims: Vec<BString> = Vec::new();
    for (spec, raw) in specs.iter().zip(&args.paths) {
        let matched: Vec<BString> = index
            .iter()
            .filter(|e| {
                e.path == *spec
                    || (e.path.len() > spec.len()
                        && e.path.starts_with(spec.as_slice())
                        && e.path[spec.len()] == b'/')
            })
            .map(|e| e.path.clone())
            .collect();
        if matched.is_empty() {
            return user_error(format!("pathspec '{raw}' did not match any files"));
        }
        victims.extend(matched);
    }
    victims.sort();
    victims.dedup();

    // A worktree copy that differs from the index would be lost.
    if !args.force && !args.cached {
        for path in &victims {
            let index_oid = index.get(path.as_ref(), Stage::Normal).map(|e| e.oid);
            let disk_oid = workdir::hash_file(&repo, path.as_ref())?;
            if let (Some(index_oid), Some(disk_oid)) = (index_oid, disk_oid) {
                if index_oid != disk_oid {
                    eprintln!("error: the following file has local modifications:");
                    eprintln!("    {path}");
                    eprintln!("(use --cached to keep the file, or -f to force removal)");
                    return Ok(1);
                }
            }
        }
    }

    for path in &victims {
        index.remove(path.as_ref());
        if !args.cached {
            workdir::remove_file_and_empty_parents(repo.work_tree(), path)?;
        }
        println!("rm '{path}'");
    }
    index.save(repo.index_path())?;
    Ok(0)
}
