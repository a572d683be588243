use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use rvs_repo::{workdir, Repository, WorktreeKind};

use super::open_repo;
use crate::Cli;

#[derive(Args)]
pub struct StatusArgs {
    /// Give the output in the short format
    #[arg(short, long)]
    pub short: bool,
}

pub fn run(args: &StatusArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let index = repo.load_index()?;
    let report = workdir::status(&repo, &index)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.short {
        print_short(&report, &mut out)?;
    } else {
        print_long(&repo, &report, &mut out)?;
    }
    Ok(0)
}

fn print_short(report: &workdir::StatusReport, out: &mut impl Write) -> Result<()> {
    // Two columns: index state, then worktree state.
    let mut rows: std::collections::BTreeMap<&bstr::BString, (char, char)> =
        std::collections::BTreeMap::new();
    for (kind, path) in &report.staged {
        rows.entry(path).or_insert((' ', ' ')).0 = kind.short_letter();
    }
    for (kind, path) in &report.unstaged {
        rows.entry(path).or_insert((' ', ' ')).1 = kind.short_letter();
    }
    for path in &report.unmerged {
        rows.insert(path, ('U', 'U'));
    }
    for (path, (index_col, wt_col)) in rows {
        writeln!(out, "{index_col}{wt_col} {path}")?;
    }
    for path in &report.untracked {
        writeln!(out, "?? {path}")?;
    }
    Ok(())
}

fn print_long(
    repo: &Repository,
    report: &workdir::StatusReport,
    out: &mut impl Write,
) -> Result<()> {
    let head = repo.head()?;
    match (&head.branch, head.oid) {
        (Some(branch), _) => writeln!(out, "On branch {branch}")?,
        (None, Some(oid)) => match repo.kind() {
            WorktreeKind::Main => writeln!(out, "HEAD detached at {}", oid.short())?,
            WorktreeKind::Linked => writeln!(out, "Not currently on any branch.")?,
        },
        (None, None) => writeln!(out, "Not currently on any branch.")?,
    }
    if head.is_unborn() {
        writeln!(out, "\nNo commits yet")?;
    }

    if !report.staged.is_empty() {
        writeln!(out, "\nChanges to be committed:")?;
        writeln!(out, "  (use \"rvs restore --staged <file>...\" to unstage)")?;
        for (kind, path) in &report.staged {
            writeln!(out, "\t{}:   {path}", kind.long_word())?;
        }
    }

    if !report.unmerged.is_empty() {
        writeln!(out, "\nUnmerged paths:")?;
        writeln!(out, "  (use \"rvs add <file>...\" to mark resolution)")?;
        for path in &report.unmerged {
            writeln!(out, "\tboth modified:   {path}")?;
        }
    }

    if !report.unstaged.is_empty() {
        writeln!(out, "\nChanges not staged for commit:")?;
        writeln!(
            out,
            "  (use \"rvs add <file>...\" to update what will be committed)"
        )?;
        writeln!(
            out,
            "  (use \"rvs restore <file>...\" to discard changes in working directory)"
        )?;
        for (kind, path) in &report.unstaged {
            writeln!(out, "\t{}:   {path}", kind.long_word())?;
        }
    }

    if !report.untracked.is_empty() {
        writeln!(out, "\nUntracked files:")?;
        writeln!(
            out,
            "  (use \"rvs add <file>...\" to include in what will be committed)"
        )?;
        for path in &report.untracked {
            writeln!(out, "\t{path}")?;
        }
    }

    if report.is_clean() {
        writeln!(out, "nothing to commit, working tree clean")?;
    } else if report.staged.is_empty() && report.unmerged.is_empty() {
        if report.unstaged.is_empty() {
            writeln!(
                out,
                "nothing added to commit but untracked files present (use \"rvs add\" to track)"
            )?;
        } else {
            writeln!(
                out,
                "no changes added to commit (use \"rvs add\" to stage changes)"
            )?;
        }
    }
    Ok(())
}
