use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use rvs_revwalk::RevWalk;

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct LogArgs {
    /// One line per commit
    #[arg(long)]
    pub oneline: bool,

    /// Limit the number of commits shown
    #[arg(short = 'n', value_name = "N")]
    pub max_count: Option<usize>,
}

pub fn run(args: &LogArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let head = repo.head()?;

    let tip = match head.oid {
        Some(oid) => oid,
        None => {
            let branch = head
                .branch
                .as_ref()
                .map(|b| b.to_string())
                .unwrap_or_else(|| "HEAD".to_string());
            anyhow::bail!("your current branch '{branch}' does not have any commits yet");
        }
    };

    // Decoration for the tip commit.
    let decoration = match &head.branch {
        Some(branch) => format!(" (HEAD -> {branch})"),
        None => " (HEAD)".to_string(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let limit = args.max_count.unwrap_or(usize::MAX);

    for (shown, item) in RevWalk::new(repo.store(), &tip)?.enumerate() {
        if shown >= limit {
            break;
        }
        let (oid, commit) = item?;
        let decorate = if oid == tip { decoration.as_str() } else { "" };

        if args.oneline {
            writeln!(out, "{}{decorate} {}", oid.short(), commit.summary())?;
        } else {
            if shown > 0 {
                writeln!(out)?;
            }
            writeln!(out, "commit {}{decorate}", oid.to_hex())?;
            if commit.is_merge() {
                let shorts: Vec<String> =
                    commit.parents.iter().map(|p| p.short().to_string()).collect();
                writeln!(out, "Merge: {}", shorts.join(" "))?;
            }
            writeln!(out, "Author: {} <{}>", commit.author.name, commit.author.email)?;
            writeln!(out, "Date:   {}", commit.author.when.to_default())?;
            writeln!(out)?;
            for line in commit.message.to_string().lines() {
                writeln!(out, "    {line}")?;
            }
        }
    }
    Ok(0)
}
