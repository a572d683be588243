//! Repository discovery, initialization, and central access to the object
//! store, reference namespace, index, and working tree.
//!
//! A repository context is an explicit value: discovery runs once at
//! command entry and everything downstream receives `&Repository`. The
//! main checkout keeps all state under `<root>/.rvs/`; a linked worktree's
//! root holds a `.rvs` *file* pointing at its private metadata directory
//! inside the main repository, which in turn points back at the shared
//! common directory.

pub mod config;
mod discover;
mod env;
mod error;
mod init;
pub mod revparse;
pub mod workdir;
pub mod worktree;

pub use discover::Discovered;
pub use error::RepoError;

use std::path::{Path, PathBuf};

use rvs_hash::ObjectId;
use rvs_index::Index;
use rvs_ref::{RefStore, RefName};
use rvs_store::ObjectStore;
use rvs_utils::date::Signature;

/// Name of the metadata directory (or redirect file) at a worktree root.
pub const RVS_DIR_NAME: &str = ".rvs";

/// Name of the ignore file at the worktree root.
pub const IGNORE_FILE: &str = ".rvsignore";

/// Whether this checkout is the main one or a linked worktree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorktreeKind {
    Main,
    Linked,
}

/// An opened repository bound to one worktree.
pub struct Repository {
    /// Per-worktree metadata directory.
    rvs_dir: PathBuf,
    /// Shared metadata directory (objects and refs); equals `rvs_dir` for
    /// the main worktree.
    common_dir: PathBuf,
    work_tree: PathBuf,
    kind: WorktreeKind,
    store: ObjectStore,
    refs: RefStore,
    config: config::Config,
}

impl Repository {
    /// Discover the repository enclosing `start` and open it.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        Self::from_discovered(discover::discover(start.as_ref())?)
    }

    /// Initialize a new repository whose worktree root is `path`.
    pub fn init(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        init::init(path.as_ref())?;
        Self::discover(path)
    }

    fn from_discovered(found: Discovered) -> Result<Self, RepoError> {
        let store = ObjectStore::open(found.common_dir.join("objects"));
        let refs = RefStore::new(&found.common_dir, &found.rvs_dir);
        let config = config::Config::load(&found.common_dir.join("config"))?;
        Ok(Self {
            rvs_dir: found.rvs_dir,
            common_dir: found.common_dir,
            work_tree: found.work_tree,
            kind: found.kind,
            store,
            refs,
            config,
        })
    }

    // --- Paths ---

    pub fn rvs_dir(&self) -> &Path {
        &self.rvs_dir
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn kind(&self) -> WorktreeKind {
        self.kind
    }

    pub fn index_path(&self) -> PathBuf {
        self.rvs_dir.join("index")
    }

    /// `MERGE_HEAD`, present while a conflicted merge awaits its commit.
    pub fn merge_head_path(&self) -> PathBuf {
        self.rvs_dir.join("MERGE_HEAD")
    }

    pub fn merge_msg_path(&self) -> PathBuf {
        self.rvs_dir.join("MERGE_MSG")
    }

    // --- Subsystems ---

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn load_index(&self) -> Result<Index, RepoError> {
        Ok(Index::load(self.index_path())?)
    }

    // --- HEAD helpers ---

    pub fn head(&self) -> Result<rvs_ref::HeadState, RepoError> {
        Ok(self.refs.head()?)
    }

    /// The tree of the commit HEAD points at; `None` on an unborn branch.
    pub fn head_tree(&self) -> Result<Option<ObjectId>, RepoError> {
        match self.head()?.oid {
            Some(commit) => Ok(Some(self.store.read_commit(&commit)?.tree)),
            None => Ok(None),
        }
    }

    /// The in-progress merge's second parent, if `MERGE_HEAD` exists.
    pub fn merge_head(&self) -> Result<Option<ObjectId>, RepoError> {
        match std::fs::read_to_string(self.merge_head_path()) {
            Ok(content) => {
                let oid = ObjectId::from_hex(content.trim()).map_err(|_| {
                    RepoError::Corrupt("MERGE_HEAD does not hold an OID".into())
                })?;
                Ok(Some(oid))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(RepoError::Io(e)),
        }
    }

    pub fn clear_merge_state(&self) -> Result<(), RepoError> {
        for path in [self.merge_head_path(), self.merge_msg_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(RepoError::Io(e)),
            }
        }
        Ok(())
    }

    /// Advance whatever HEAD points at: the branch when symbolic (creating
    /// it on first commit), HEAD itself when detached.
    pub fn advance_head(&self, oid: &ObjectId) -> Result<(), RepoError> {
        let head = RefName::new("HEAD")?;
        match self.refs.read(&head)? {
            Some(rvs_ref::RefValue::Symbolic(target)) => {
                self.refs.write_direct(&target, oid)?;
            }
            _ => {
                self.refs.write_direct(&head, oid)?;
            }
        }
        Ok(())
    }

    // --- Identity ---

    /// Author identity from `RVS_AUTHOR_*`, falling back to config.
    pub fn author(&self) -> Result<Signature, RepoError> {
        env::signature("RVS_AUTHOR", &self.config)
    }

    /// Committer identity from `RVS_COMMITTER_*`, falling back to the
    /// author environment, then config.
    pub fn committer(&self) -> Result<Signature, RepoError> {
        match env::signature("RVS_COMMITTER", &self.config) {
            Ok(sig) => Ok(sig),
            Err(RepoError::IdentityUnset) => env::signature("RVS_AUTHOR", &self.config),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use bstr::{BStr, BString};
    use rvs_hash::ObjectId;
    use rvs_object::{Commit, Object};
    use rvs_utils::date::{RvsDate, Signature};

    use crate::{workdir, Repository};

    pub fn init_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        std::fs::create_dir(&root).unwrap();
        let repo = Repository::init(&root).unwrap();
        (dir, repo)
    }

    pub fn write_worktree_file(repo: &Repository, rel: &str, data: &[u8]) {
        let path = repo.work_tree().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, data).unwrap();
    }

    /// Write a file, stage it, and commit the index with a pinned identity.
    /// Timestamps increase with history length so log ordering is stable.
    pub fn commit_file(repo: &Repository, rel: &str, data: &[u8], message: &str) -> ObjectId {
        write_worktree_file(repo, rel, data);

        let mut index = repo.load_index().unwrap();
        workdir::stage_file(repo, &mut index, BStr::new(rel.as_bytes())).unwrap();
        index.save(repo.index_path()).unwrap();

        let tree = index.write_tree(repo.store()).unwrap();
        let head = repo.head().unwrap();
        let depth = match head.oid {
            Some(oid) => {
                let mut n = 1;
                let mut cursor = oid;
                while let Some(parent) = repo
                    .store()
                    .read_commit(&cursor)
                    .unwrap()
                    .first_parent()
                    .copied()
                {
                    n += 1;
                    cursor = parent;
                }
                n
            }
            None => 0,
        };
        let sig = Signature::new(
            "Test Author",
            "test@example.com",
            RvsDate::new(1_234_567_890 + depth, 0),
        );
        let commit = Commit {
            tree,
            parents: head.oid.into_iter().collect(),
            author: sig.clone(),
            committer: sig,
            extra_headers: Vec::new(),
            message: BString::from(format!("{message}\n")),
        };
        let oid = repo.store().write(&Object::Commit(commit)).unwrap();
        repo.advance_head(&oid).unwrap();
        oid
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("rvs_dir", &self.rvs_dir)
            .field("work_tree", &self.work_tree)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
