use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bstr::{BString, ByteSlice};
use rvs_hash::ObjectId;
use rvs_utils::Lockfile;

use crate::name::RefName;
use crate::{RefError, RefValue};

/// Longest symbolic-ref chain we will follow.
const MAX_SYMREF_DEPTH: usize = 5;

/// The resolved state of `HEAD`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadState {
    /// Short branch name when HEAD is symbolic and the target parses.
    pub branch: Option<BString>,
    /// The commit HEAD ultimately points at; `None` on an unborn branch.
    pub oid: Option<ObjectId>,
}

impl HeadState {
    pub fn is_detached(&self) -> bool {
        self.branch.is_none() && self.oid.is_some()
    }

    pub fn is_unborn(&self) -> bool {
        self.oid.is_none()
    }
}

/// Loose-file reference store.
///
/// `refs/*` files live under the common dir (shared by all worktrees);
/// everything else (`HEAD`, merge state) lives in the per-worktree dir.
pub struct RefStore {
    common_dir: PathBuf,
    worktree_dir: PathBuf,
}

impl RefStore {
    pub fn new(common_dir: impl AsRef<Path>, worktree_dir: impl AsRef<Path>) -> Self {
        Self {
            common_dir: common_dir.as_ref().to_path_buf(),
            worktree_dir: worktree_dir.as_ref().to_path_buf(),
        }
    }

    /// File backing a ref name, honoring worktree routing.
    pub fn ref_path(&self, name: &RefName) -> PathBuf {
        let base = if name.as_bstr().starts_with(b"refs/") {
            &self.common_dir
        } else {
            &self.worktree_dir
        };
        let mut path = base.clone();
        for seg in name.as_str().split('/') {
            path.push(seg);
        }
        path
    }

    /// Read a ref file. `Ok(None)` when absent.
    pub fn read(&self, name: &RefName) -> Result<Option<RefValue>, RefError> {
        let path = self.ref_path(name);
        let raw = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RefError::IoPath { path, source: e }),
        };
        let line = raw.trim();

        if let Some(target) = line.strip_prefix(b"ref: ") {
            let target = RefName::new(BString::from(target.trim()))?;
            return Ok(Some(RefValue::Symbolic(target)));
        }
        let hex = std::str::from_utf8(line)
            .map_err(|_| RefError::Parse(format!("{}: non-UTF-8 content", name)))?;
        let oid = ObjectId::from_hex(hex)
            .map_err(|_| RefError::Parse(format!("{}: expected OID, got '{hex}'", name)))?;
        Ok(Some(RefValue::Direct(oid)))
    }

    /// Follow symbolic chains until an OID or a dangling target.
    pub fn resolve(&self, name: &RefName) -> Result<Option<ObjectId>, RefError> {
        let mut current = name.clone();
        for _ in 0..MAX_SYMREF_DEPTH {
            match self.read(&current)? {
                None => return Ok(None),
                Some(RefValue::Direct(oid)) => return Ok(Some(oid)),
                Some(RefValue::Symbolic(next)) => current = next,
            }
        }
        Err(RefError::ChainTooDeep(name.to_string()))
    }

    /// Atomically point `name` at `oid`.
    pub fn write_direct(&self, name: &RefName, oid: &ObjectId) -> Result<(), RefError> {
        let path = self.prepare_ref_path(name)?;
        let mut lock = Lockfile::hold(&path)?;
        writeln!(lock, "{}", oid.to_hex()).map_err(|e| RefError::IoPath {
            path: path.clone(),
            source: e,
        })?;
        lock.commit()?;
        Ok(())
    }

    /// Atomically point `name` at another ref.
    pub fn write_symbolic(&self, name: &RefName, target: &RefName) -> Result<(), RefError> {
        let path = self.prepare_ref_path(name)?;
        let mut lock = Lockfile::hold(&path)?;
        writeln!(lock, "ref: {}", target).map_err(|e| RefError::IoPath {
            path: path.clone(),
            source: e,
        })?;
        lock.commit()?;
        Ok(())
    }

    /// Remove a ref file, pruning directories it leaves empty.
    pub fn delete(&self, name: &RefName) -> Result<(), RefError> {
        let path = self.ref_path(name);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| RefError::IoPath {
                path: path.clone(),
                source: e,
            })?;
            let stop = self.common_dir.join("refs");
            let mut dir = path.parent().map(Path::to_path_buf);
            while let Some(d) = dir {
                if d == stop || !d.starts_with(&self.common_dir) {
                    break;
                }
                if d.read_dir().map(|mut e| e.next().is_none()).unwrap_or(false) {
                    let _ = fs::remove_dir(&d);
                    dir = d.parent().map(Path::to_path_buf);
                } else {
                    break;
                }
            }
        }
        Ok(())
    }

    // --- HEAD ---

    /// Resolve HEAD into branch name and commit OID.
    pub fn head(&self) -> Result<HeadState, RefError> {
        let head = RefName::new("HEAD")?;
        match self.read(&head)? {
            None => Ok(HeadState {
                branch: None,
                oid: None,
            }),
            Some(RefValue::Direct(oid)) => Ok(HeadState {
                branch: None,
                oid: Some(oid),
            }),
            Some(RefValue::Symbolic(target)) => {
                let oid = self.resolve(&target)?;
                Ok(HeadState {
                    branch: Some(BString::from(target.short().as_bytes())),
                    oid,
                })
            }
        }
    }

    /// Point HEAD symbolically at a branch (which need not exist yet).
    pub fn set_head_to_branch(&self, short: &[u8]) -> Result<(), RefError> {
        let head = RefName::new("HEAD")?;
        let target = RefName::branch(short)?;
        self.write_symbolic(&head, &target)
    }

    /// Detach HEAD at a commit.
    pub fn set_head_detached(&self, oid: &ObjectId) -> Result<(), RefError> {
        let head = RefName::new("HEAD")?;
        self.write_direct(&head, oid)
    }

    // --- Branches ---

    /// All branches as `(short name, oid)`, sorted by name.
    pub fn list_branches(&self) -> Result<Vec<(BString, ObjectId)>, RefError> {
        let heads = self.common_dir.join("refs").join("heads");
        let mut out = Vec::new();
        if heads.is_dir() {
            collect_branches(&heads, &heads, &mut out)?;
        }
        out.sort();
        Ok(out)
    }

    /// Create `refs/heads/<short>` at `oid`. Without `force`, an existing
    /// branch is an error.
    pub fn create_branch(&self, short: &[u8], oid: &ObjectId, force: bool) -> Result<(), RefError> {
        let name = RefName::branch(short)?;
        if !force && self.read(&name)?.is_some() {
            return Err(RefError::BranchExists(name.short().to_string()));
        }
        self.write_direct(&name, oid)
    }

    /// Delete `refs/heads/<short>`. Absent branches are an error.
    pub fn delete_branch(&self, short: &[u8]) -> Result<(), RefError> {
        let name = RefName::branch(short)?;
        if self.read(&name)?.is_none() {
            return Err(RefError::NotFound(name.to_string()));
        }
        self.delete(&name)
    }

    /// Path of the reflog backing `name` (used by the stash stack).
    pub fn log_path(&self, name: &RefName) -> PathBuf {
        let mut path = self.common_dir.join("logs");
        for seg in name.as_str().split('/') {
            path.push(seg);
        }
        path
    }

    fn prepare_ref_path(&self, name: &RefName) -> Result<PathBuf, RefError> {
        let path = self.ref_path(name);
        if path.is_dir() {
            return Err(RefError::DirectoryConflict {
                name: name.to_string(),
                conflict: format!("{} (is a directory)", path.display()),
            });
        }
        // A file on any prefix of the path blocks creation of the ref.
        if let Some(parent) = path.parent() {
            let mut current = parent.to_path_buf();
            while current.starts_with(&self.common_dir) || current.starts_with(&self.worktree_dir) {
                if current.is_file() {
                    return Err(RefError::DirectoryConflict {
                        name: name.to_string(),
                        conflict: current.display().to_string(),
                    });
                }
                match current.parent() {
                    Some(p) => current = p.to_path_buf(),
                    None => break,
                }
            }
            fs::create_dir_all(parent).map_err(|e| RefError::IoPath {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        Ok(path)
    }
}

fn collect_branches(
    base: &Path,
    dir: &Path,
    out: &mut Vec<(BString, ObjectId)>,
) -> Result<(), RefError> {
    for entry in fs::read_dir(dir).map_err(|e| RefError::IoPath {
        path: dir.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| RefError::IoPath {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_branches(base, &path, out)?;
            continue;
        }
        if path.extension().map(|e| e == "lock").unwrap_or(false) {
            continue;
        }
        let rel = path.strip_prefix(base).unwrap_or(&path);
        let short = BString::from(rel.to_string_lossy().replace('\\', "/").into_bytes());
        let raw = fs::read(&path).map_err(|e| RefError::IoPath {
            path: path.clone(),
            source: e,
        })?;
        if let Ok(hex) = std::str::from_utf8(raw.trim()) {
            if let Ok(oid) = ObjectId::from_hex(hex) {
                out.push((short, oid));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> RefStore {
        RefStore::new(dir, dir)
    }

    fn oid(n: u8) -> ObjectId {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        ObjectId::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn absent_ref_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        let name = RefName::branch("main").unwrap();
        assert!(refs.read(&name).unwrap().is_none());
        assert!(refs.resolve(&name).unwrap().is_none());
    }

    #[test]
    fn direct_ref_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        let name = RefName::branch("main").unwrap();

        refs.write_direct(&name, &oid(1)).unwrap();
        assert_eq!(
            refs.read(&name).unwrap().unwrap(),
            RefValue::Direct(oid(1))
        );
        assert_eq!(refs.resolve(&name).unwrap(), Some(oid(1)));
    }

    #[test]
    fn symbolic_head_resolves_through_branch() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());

        refs.set_head_to_branch(b"main").unwrap();
        let head = refs.head().unwrap();
        assert_eq!(head.branch, Some(BString::from("main")));
        assert!(head.is_unborn());

        refs.create_branch(b"main", &oid(7), false).unwrap();
        let head = refs.head().unwrap();
        assert_eq!(head.oid, Some(oid(7)));
        assert!(!head.is_detached());
    }

    #[test]
    fn detached_head() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        refs.set_head_detached(&oid(9)).unwrap();
        let head = refs.head().unwrap();
        assert!(head.is_detached());
        assert_eq!(head.oid, Some(oid(9)));
    }

    #[test]
    fn create_branch_refuses_existing() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        refs.create_branch(b"dev", &oid(1), false).unwrap();
        assert!(matches!(
            refs.create_branch(b"dev", &oid(2), false).unwrap_err(),
            RefError::BranchExists(_)
        ));
        refs.create_branch(b"dev", &oid(2), true).unwrap();
        let name = RefName::branch("dev").unwrap();
        assert_eq!(refs.resolve(&name).unwrap(), Some(oid(2)));
    }

    #[test]
    fn list_branches_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        refs.create_branch(b"zeta", &oid(1), false).unwrap();
        refs.create_branch(b"alpha", &oid(2), false).unwrap();
        refs.create_branch(b"feature/x", &oid(3), false).unwrap();

        let names: Vec<BString> = refs
            .list_branches()
            .unwrap()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, vec!["alpha", "feature/x", "zeta"]);
    }

    #[test]
    fn delete_branch_prunes_empty_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let refs = store(dir.path());
        refs.create_branch(b"topic/deep/name", &oid(1), false).unwrap();
        refs.delete_branch(b"topic/deep/name").unwrap();
        assert!(!dir.path().join("refs/heads/topic").exists());
        assert!(matches!(
            refs.delete_branch(b"topic/deep/name").unwrap_err(),
            RefError::NotFound(_)
        ));
    }

    #[test]
    fn worktree_routing_splits_head_from_branches() {
        let dir = tempfile::tempdir().unwrap();
        let common = dir.path().join("common");
        let wt = dir.path().join("wt");
        fs::create_dir_all(&common).unwrap();
        fs::create_dir_all(&wt).unwrap();

        let refs = RefStore::new(&common, &wt);
        refs.set_head_to_branch(b"main").unwrap();
        refs.create_branch(b"main", &oid(4), false).unwrap();

        assert!(wt.join("HEAD").is_file());
        assert!(common.join("refs/heads/main").is_file());
        assert!(!common.join("HEAD").exists());
    }
}
