use std::path::Path;

use anyhow::Result;
use bstr::{BString, ByteSlice};
use clap::Args;
use rvs_index::{IgnoreList, Index};
use rvs_repo::{workdir, Repository, IGNORE_FILE, RVS_DIR_NAME};

use super::{normalize_args, open_repo, user_error};
use crate::Cli;

#[derive(Args)]
pub struct AddArgs {
    /// Files or directories to stage ('.' for everything)
    #[arg(required = true, value_name = "pathspec")]
    pub pathspecs: Vec<String>,
}

pub fn run(args: &AddArgs, cli: &Cli) -> Result<i32> {
    let repo = open_repo(cli)?;
    let specs = normalize_args(&repo, &args.pathspecs)?;
    let ignores = IgnoreList::load(&repo.work_tree().join(IGNORE_FILE))?;

    let mut index = repo.load_index()?;
    let mut any_change = false;

    for (spec, raw) in specs.iter().zip(&args.pathspecs) {
        let matched = stage_spec(&repo, &mut index, &ignores, spec)?;
        // The whole-tree spec ('.') is allowed to match nothing.
        if matched == 0 && !spec.is_empty() {
            return user_error(format!("pathspec '{raw}' did not match any files"));
        }
        any_change = true;
    }

    if any_change {
        index.save(repo.index_path())?;
    }
    Ok(0)
}

/// Stage everything one pathspec selects. Returns how many paths matched.
///
/// A spec naming a file stages it even when ignored (naming is explicit); a
/// directory is walked recursively with ignore rules applied. Tracked
/// files that vanished from disk under the spec are staged as deletions.
fn stage_spec(
    repo: &Repository,
    index: &mut Index,
    ignores: &IgnoreList,
    spec: &BString,
) -> Result<usize> {
    let mut matched = 0;

    let os_path = rvs_utils::path::to_os_path(repo.work_tree(), spec);
    if os_path.is_file() || os_path.is_symlink() {
        workdir::stage_file(repo, index, spec.as_ref())?;
        return Ok(1);
    }
    if os_path.is_dir() {
        stage_dir(repo, index, ignores, &os_path, &mut matched)?;
    }

    // Deletions: tracked paths under the spec with no file behind them.
    let gone: Vec<BString> = index
        .iter()
        .filter(|e| spec.is_empty() || e.path == *spec || under_dir(&e.path, spec))
        .filter(|e| !rvs_utils::path::to_os_path(repo.work_tree(), &e.path).exists())
        .map(|e| e.path.clone())
        .collect();
    for path in gone {
        index.remove(path.as_ref());
        matched += 1;
    }

    Ok(matched)
}

fn stage_dir(
    repo: &Repository,
    index: &mut Index,
    ignores: &IgnoreList,
    dir: &Path,
    matched: &mut usize,
) -> Result<()> {
    let mut entries: Vec<std::fs::DirEntry> =
        std::fs::read_dir(dir)?.filter_map(Result::ok).collect();
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.file_name().map(|n| n == RVS_DIR_NAME).unwrap_or(false) {
            continue;
        }
        let rel = match rvs_utils::path::workdir_relative(repo.work_tree(), &path) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let is_dir = path.is_dir() && !path.is_symlink();
        if ignores.is_ignored(rel.as_ref(), is_dir) {
            continue;
        }
        if is_dir {
            stage_dir(repo, index, ignores, &path, matched)?;
        } else {
            workdir::stage_file(repo, index, rel.as_ref())?;
            *matched += 1;
        }
    }
    Ok(())
}

fn under_dir(path: &BString, dir: &BString) -> bool {
    path.len() > dir.len() && path.starts_with(dir.as_bytes()) && path[dir.len()] == b'/'
}
