//! The worktree registry.
//!
//! Linked worktrees live under `<common>/worktrees/<name>/`, each holding
//! its own `HEAD` and `index`, a `commondir` pointer back to the shared
//! metadata directory, an `rvsdir` back-pointer to the `.rvs` redirect
//! file at the worktree root, and an optional `locked` marker. At most one
//! worktree may have a given branch checked out.

use std::fs;
use std::path::{Path, PathBuf};

use bstr::BString;
use rvs_hash::ObjectId;
use rvs_ref::{RefName, RefValue};

use crate::{discover, revparse, workdir, RepoError, Repository, RVS_DIR_NAME};

/// One row of `worktree list`.
#[derive(Debug, Clone)]
pub struct WorktreeInfo {
    pub path: PathBuf,
    pub head: Option<ObjectId>,
    /// Short branch name; `None` when detached.
    pub branch: Option<BString>,
    pub locked: bool,
    pub is_main: bool,
}

fn worktrees_dir(repo: &Repository) -> PathBuf {
    repo.common_dir().join("worktrees")
}

/// The worktree (by name) that has `branch` checked out, if any.
pub fn branch_in_use(repo: &Repository, branch: &[u8]) -> Result<Option<PathBuf>, RepoError> {
    let target = RefName::branch(branch)?;
    for info in list(repo)? {
        let head_file = if info.is_main {
            repo.common_dir().join("HEAD")
        } else {
            // list() only reports registered worktrees, so the metadata
            // dir exists.
            metadata_dir_for(repo, &info.path)?.join("HEAD")
        };
        if let Ok(content) = fs::read_to_string(&head_file) {
            if let Some(rest) = content.trim().strip_prefix("ref: ") {
                if rest == target.as_str() {
                    return Ok(Some(info.path));
                }
            }
        }
    }
    Ok(None)
}

/// Enumerate the main worktree plus every linked one.
pub fn list(repo: &Repository) -> Result<Vec<WorktreeInfo>, RepoError> {
    let mut out = Vec::new();

    // The main worktree's root is the parent of the common dir.
    let main_root = repo
        .common_dir()
        .parent()
        .ok_or_else(|| RepoError::Corrupt("common dir has no parent".into()))?
        .to_path_buf();
    let main_refs = rvs_ref::RefStore::new(repo.common_dir(), repo.common_dir());
    let main_head = main_refs.head()?;
    out.push(WorktreeInfo {
        path: main_root,
        head: main_head.oid,
        branch: main_head.branch,
        locked: false,
        is_main: true,
    });

    let base = worktrees_dir(repo);
    if base.is_dir() {
        let mut dirs: Vec<PathBuf> = fs::read_dir(&base)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let root = match read_worktree_root(&dir) {
                Some(root) => root,
                None => continue,
            };
            let refs = rvs_ref::RefStore::new(repo.common_dir(), &dir);
            let head = refs.head()?;
            out.push(WorktreeInfo {
                path: root,
                head: head.oid,
                branch: head.branch,
                locked: dir.join("locked").exists(),
                is_main: false,
            });
        }
    }
    Ok(out)
}

/// Create a linked worktree at `path`, checked out at `start_point`
/// (HEAD when omitted).
///
/// When the start point names a branch not checked out elsewhere the new
/// worktree's HEAD is symbolic on it; any other revision detaches.
pub fn add(repo: &Repository, path: &Path, start_point: Option<&str>) -> Result<(), RepoError> {
    let name = path
        .file_name()
        .ok_or_else(|| RepoError::WorktreeExists(path.to_path_buf()))?
        .to_string_lossy()
        .into_owned();

    let meta_dir = worktrees_dir(repo).join(&name);
    if meta_dir.exists() {
        return Err(RepoError::WorktreeExists(meta_dir));
    }
    if path.exists() && path.read_dir().map(|mut e| e.next().is_some()).unwrap_or(true) {
        return Err(RepoError::WorktreeExists(path.to_path_buf()));
    }

    // Resolve the start point before touching the filesystem.
    let spec = start_point.unwrap_or("HEAD");
    let commit = revparse::resolve(repo, spec)?;
    let mut branch = None;
    if let Some(s) = start_point {
        if let Ok(name) = RefName::branch(s.as_bytes()) {
            if repo.refs().read(&name)?.is_some() {
                branch = Some(s.to_string());
            }
        }
    }
    if let Some(ref b) = branch {
        if let Some(at) = branch_in_use(repo, b.as_bytes())? {
            return Err(RepoError::BranchInUse {
                branch: b.clone(),
                at,
            });
        }
    }

    fs::create_dir_all(path)?;
    let root = fs::canonicalize(path)?;
    fs::create_dir_all(&meta_dir)?;

    // Pointers: commondir back to the shared dir, rvsdir to the redirect
    // file at the worktree root.
    fs::write(meta_dir.join("commondir"), "../..\n")?;
    fs::write(
        meta_dir.join("rvsdir"),
        format!("{}\n", root.join(RVS_DIR_NAME).display()),
    )?;
    match branch {
        Some(ref b) => fs::write(meta_dir.join("HEAD"), format!("ref: refs/heads/{b}\n"))?,
        None => fs::write(meta_dir.join("HEAD"), format!("{}\n", commit.to_hex()))?,
    }

    fs::write(
        root.join(RVS_DIR_NAME),
        format!("rvsdir: {}\n", meta_dir.display()),
    )?;

    // Populate the new worktree and its index from the start point.
    let wt_repo = Repository::discover(&root)?;
    let tree = wt_repo.store().read_commit(&commit)?.tree;
    let mut index = wt_repo.load_index()?;
    workdir::materialize_tree(&wt_repo, &mut index, &tree, None, true)?;
    index.save(wt_repo.index_path())?;
    Ok(())
}

/// Remove the worktree at `path`: its directory contents and its metadata
/// directory. Locked worktrees are refused.
pub fn remove(repo: &Repository, path: &Path) -> Result<(), RepoError> {
    let meta_dir = metadata_dir_for(repo, path)?;
    if meta_dir.join("locked").exists() {
        return Err(RepoError::WorktreeLocked(path.to_path_buf()));
    }

    let root = read_worktree_root(&meta_dir)
        .ok_or_else(|| RepoError::Corrupt(format!("{}: missing rvsdir", meta_dir.display())))?;
    if root.exists() {
        fs::remove_dir_all(&root)?;
    }
    fs::remove_dir_all(&meta_dir)?;
    Ok(())
}

/// Mark the worktree at `path` locked; `remove` fails until unlocked.
pub fn lock(repo: &Repository, path: &Path) -> Result<(), RepoError> {
    let meta_dir = metadata_dir_for(repo, path)?;
    fs::write(meta_dir.join("locked"), "")?;
    Ok(())
}

pub fn unlock(repo: &Repository, path: &Path) -> Result<(), RepoError> {
    let meta_dir = metadata_dir_for(repo, path)?;
    match fs::remove_file(meta_dir.join("locked")) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RepoError::Io(e)),
    }
}

/// Find the metadata directory registered for the worktree rooted at
/// `path`.
fn metadata_dir_for(repo: &Repository, path: &Path) -> Result<PathBuf, RepoError> {
    let wanted = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let base = worktrees_dir(repo);
    if base.is_dir() {
        for entry in fs::read_dir(&base)?.filter_map(Result::ok) {
            let dir = entry.path();
            if let Some(root) = read_worktree_root(&dir) {
                if root == wanted {
                    return Ok(dir);
                }
            }
        }
    }
    Err(RepoError::NotARepository(path.to_path_buf()))
}

/// The worktree root recorded in a metadata dir's `rvsdir` back-pointer.
fn read_worktree_root(meta_dir: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(meta_dir.join("rvsdir")).ok()?;
    let marker = PathBuf::from(content.trim());
    // The pointer names the `.rvs` file at the worktree root.
    marker.parent().map(Path::to_path_buf)
}

/// Re-export for the CLI: resolve a `.rvs` redirect file.
pub fn parse_redirect(marker: &Path) -> Result<PathBuf, RepoError> {
    discover::parse_redirect(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_file, init_repo};

    #[test]
    fn add_creates_redirect_file_and_checkout() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "shared.txt", b"content\n", "first");
        repo.refs().create_branch(b"feature", &repo.head().unwrap().oid.unwrap(), false).unwrap();

        let wt_path = dir.path().join("linked");
        add(&repo, &wt_path, Some("feature")).unwrap();

        let marker = wt_path.join(".rvs");
        assert!(marker.is_file());
        let meta = parse_redirect(&marker).unwrap();
        assert!(meta.join("commondir").is_file());
        assert!(meta.join("HEAD").is_file());
        assert_eq!(
            fs::read_to_string(meta.join("HEAD")).unwrap(),
            "ref: refs/heads/feature\n"
        );
        assert_eq!(
            fs::read(wt_path.join("shared.txt")).unwrap(),
            b"content\n"
        );

        // The linked worktree opens as its own repository sharing objects.
        let wt_repo = Repository::discover(&wt_path).unwrap();
        assert_eq!(wt_repo.kind(), crate::WorktreeKind::Linked);
        assert_eq!(wt_repo.common_dir(), repo.common_dir());
    }

    #[test]
    fn add_detaches_for_non_branch_start() {
        let (dir, repo) = init_repo();
        let c1 = commit_file(&repo, "f.txt", b"1\n", "first");
        commit_file(&repo, "f.txt", b"2\n", "second");

        let wt_path = dir.path().join("pinned");
        add(&repo, &wt_path, Some(&c1.to_hex())).unwrap();

        let wt_repo = Repository::discover(&wt_path).unwrap();
        let head = wt_repo.head().unwrap();
        assert!(head.is_detached());
        assert_eq!(head.oid, Some(c1));
    }

    #[test]
    fn same_branch_cannot_be_checked_out_twice() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"1\n", "first");
        // "main" is checked out in the main worktree.
        let err = add(&repo, &dir.path().join("dup"), Some("main")).unwrap_err();
        assert!(matches!(err, RepoError::BranchInUse { .. }));
    }

    #[test]
    fn list_shows_main_and_linked() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"1\n", "first");
        repo.refs().create_branch(b"side", &repo.head().unwrap().oid.unwrap(), false).unwrap();
        add(&repo, &dir.path().join("wt-side"), Some("side")).unwrap();

        let infos = list(&repo).unwrap();
        assert_eq!(infos.len(), 2);
        assert!(infos[0].is_main);
        assert_eq!(infos[0].branch, Some(BString::from("main")));
        assert_eq!(infos[1].branch, Some(BString::from("side")));
        assert!(!infos[1].locked);
    }

    #[test]
    fn locked_worktree_refuses_removal() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"1\n", "first");
        repo.refs().create_branch(b"side", &repo.head().unwrap().oid.unwrap(), false).unwrap();
        let wt_path = dir.path().join("wt");
        add(&repo, &wt_path, Some("side")).unwrap();

        lock(&repo, &wt_path).unwrap();
        assert!(matches!(
            remove(&repo, &wt_path).unwrap_err(),
            RepoError::WorktreeLocked(_)
        ));

        unlock(&repo, &wt_path).unwrap();
        remove(&repo, &wt_path).unwrap();
        assert!(!wt_path.exists());
        assert_eq!(list(&repo).unwrap().len(), 1);
    }

    #[test]
    fn existing_directory_is_refused() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"1\n", "first");
        let busy = dir.path().join("busy");
        fs::create_dir(&busy).unwrap();
        fs::write(busy.join("occupied"), b"x").unwrap();

        assert!(matches!(
            add(&repo, &busy, None).unwrap_err(),
            RepoError::WorktreeExists(_)
        ));
    }
}
