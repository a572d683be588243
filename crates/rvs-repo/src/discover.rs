use std::path::{Path, PathBuf};

use crate::{RepoError, WorktreeKind, RVS_DIR_NAME};

/// The located repository context, before subsystems are opened.
#[derive(Debug)]
pub struct Discovered {
    pub rvs_dir: PathBuf,
    pub common_dir: PathBuf,
    pub work_tree: PathBuf,
    pub kind: WorktreeKind,
}

/// Locate the repository enclosing `start`.
///
/// Walks parent directories looking for a `.rvs` entry. A directory is the
/// main repository; a file is a linked worktree's redirect
/// (`rvsdir: <absolute path>`), whose target holds a `commondir` pointer
/// back to the shared metadata directory. `RVS_DIR` overrides the walk.
pub fn discover(start: &Path) -> Result<Discovered, RepoError> {
    if let Some(dir) = std::env::var_os("RVS_DIR") {
        let rvs_dir = std::fs::canonicalize(PathBuf::from(&dir))
            .map_err(|_| RepoError::NotARepository(PathBuf::from(dir)))?;
        let work_tree = rvs_dir
            .parent()
            .ok_or_else(|| RepoError::NotARepository(rvs_dir.clone()))?
            .to_path_buf();
        return open_main(rvs_dir, work_tree);
    }

    let start = std::fs::canonicalize(start)
        .map_err(|_| RepoError::NotARepository(start.to_path_buf()))?;

    let mut current = start.clone();
    loop {
        let marker = current.join(RVS_DIR_NAME);
        if marker.is_dir() {
            return open_main(marker, current);
        }
        if marker.is_file() {
            return open_linked(&marker, current);
        }
        match current.parent() {
            Some(parent) => current = parent.to_path_buf(),
            None => return Err(RepoError::NotARepository(start)),
        }
    }
}

fn open_main(rvs_dir: PathBuf, work_tree: PathBuf) -> Result<Discovered, RepoError> {
    if !is_repo_dir(&rvs_dir) {
        return Err(RepoError::Corrupt(format!(
            "{}: missing HEAD, objects/, or refs/",
            rvs_dir.display()
        )));
    }
    Ok(Discovered {
        common_dir: rvs_dir.clone(),
        rvs_dir,
        work_tree,
        kind: WorktreeKind::Main,
    })
}

fn open_linked(marker: &Path, work_tree: PathBuf) -> Result<Discovered, RepoError> {
    let rvs_dir = parse_redirect(marker)?;
    let rvs_dir = std::fs::canonicalize(&rvs_dir).map_err(|_| {
        RepoError::Corrupt(format!(
            "{}: rvsdir target '{}' does not exist",
            marker.display(),
            rvs_dir.display()
        ))
    })?;

    let commondir_file = rvs_dir.join("commondir");
    let relative = std::fs::read_to_string(&commondir_file).map_err(|_| {
        RepoError::Corrupt(format!("{}: missing commondir", rvs_dir.display()))
    })?;
    let common_dir = rvs_dir.join(relative.trim());
    let common_dir = std::fs::canonicalize(&common_dir).map_err(|_| {
        RepoError::Corrupt(format!(
            "{}: commondir target '{}' does not exist",
            rvs_dir.display(),
            common_dir.display()
        ))
    })?;

    if !is_repo_dir(&common_dir) {
        return Err(RepoError::Corrupt(format!(
            "{}: missing HEAD, objects/, or refs/",
            common_dir.display()
        )));
    }

    Ok(Discovered {
        rvs_dir,
        common_dir,
        work_tree,
        kind: WorktreeKind::Linked,
    })
}

/// Parse a `.rvs` redirect file: one line, `rvsdir: <absolute path>`.
pub fn parse_redirect(marker: &Path) -> Result<PathBuf, RepoError> {
    let content = std::fs::read_to_string(marker)?;
    let content = content.trim();
    let target = content.strip_prefix("rvsdir: ").ok_or_else(|| {
        RepoError::Corrupt(format!(
            "{}: expected 'rvsdir: <path>', got '{content}'",
            marker.display()
        ))
    })?;
    Ok(PathBuf::from(target))
}

fn is_repo_dir(dir: &Path) -> bool {
    dir.join("HEAD").is_file() && dir.join("objects").is_dir() && dir.join("refs").is_dir()
}
