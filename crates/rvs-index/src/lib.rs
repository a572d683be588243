//! The staging index.
//!
//! An ordered `path → (mode, oid, stat)` mapping persisted in git's index
//! format v2: a `DIRC` header, sorted entries carrying cached stat data, and
//! a SHA-1 trailer over the whole file. During a conflicted merge a path may
//! carry entries at stages 1/2/3 (base/ours/theirs) instead of stage 0.

pub mod entry;
pub mod ignore;
pub mod pathspec;
mod read;
mod write;

use std::path::Path;

use bstr::{BStr, BString};
use rvs_hash::ObjectId;
use rvs_store::ObjectStore;

pub use entry::{IndexEntry, StatData};
pub use ignore::IgnoreList;
pub use pathspec::Pathspec;

/// Errors from index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("invalid index header: {0}")]
    InvalidHeader(String),

    #[error("unsupported index version: {0}")]
    UnsupportedVersion(u32),

    #[error("index checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid index entry at offset {offset}: {reason}")]
    InvalidEntry { offset: usize, reason: String },

    #[error("unable to lock index file '{path}'")]
    Locked { path: std::path::PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] rvs_store::StoreError),
}

/// Merge stage of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Resolved entry (stage 0).
    Normal,
    /// Common ancestor version in a conflict (stage 1).
    Base,
    /// Our version in a conflict (stage 2).
    Ours,
    /// Their version in a conflict (stage 3).
    Theirs,
}

impl Stage {
    pub fn as_u8(&self) -> u8 {
        match self {
            Stage::Normal => 0,
            Stage::Base => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }

    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Stage::Normal),
            1 => Some(Stage::Base),
            2 => Some(Stage::Ours),
            3 => Some(Stage::Theirs),
            _ => None,
        }
    }
}

/// The in-memory index: entries sorted by `(path, stage)`.
#[derive(Debug, Clone, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`; a missing file is an empty index.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::new());
        }
        let file = std::fs::File::open(path)?;
        let data = unsafe { memmap2::Mmap::map(&file) }?;
        read::parse(&data)
    }

    /// Persist to `path` atomically, under the index lock.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        write::write(self, path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `(path, stage)`.
    pub fn get(&self, path: &BStr, stage: Stage) -> Option<&IndexEntry> {
        self.entries
            .binary_search_by(|e| e.sort_key().cmp(&(path, stage.as_u8())))
            .ok()
            .map(|i| &self.entries[i])
    }

    /// Whether any entry exists for `path` at any stage.
    pub fn contains(&self, path: &BStr) -> bool {
        self.entries.iter().any(|e| e.path == *path)
    }

    /// Insert or replace the entry at `(path, stage)`.
    pub fn add(&mut self, entry: IndexEntry) {
        let key = (entry.path.as_ref(), entry.stage.as_u8());
        match self.entries.binary_search_by(|e| e.sort_key().cmp(&key)) {
            Ok(i) => self.entries[i] = entry,
            Err(i) => self.entries.insert(i, entry),
        }
    }

    /// Remove every stage of `path`. Returns whether anything was removed.
    pub fn remove(&mut self, path: &BStr) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != *path);
        self.entries.len() < before
    }

    /// Remove only the given stage of `path`.
    pub fn remove_stage(&mut self, path: &BStr, stage: Stage) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.path == *path && e.stage == stage));
        self.entries.len() < before
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All entries, sorted by `(path, stage)`.
    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.iter()
    }

    /// Whether any path is in a conflicted state.
    pub fn has_conflicts(&self) -> bool {
        self.entries.iter().any(|e| e.stage != Stage::Normal)
    }

    /// Conflicted paths, deduplicated, in order.
    pub fn conflicted_paths(&self) -> Vec<&BStr> {
        let mut out: Vec<&BStr> = self
            .entries
            .iter()
            .filter(|e| e.stage != Stage::Normal)
            .map(|e| e.path.as_ref())
            .collect();
        out.dedup();
        out
    }

    /// Replace the contents with stage-0 entries for the given flat tree
    /// listing. Stat data is zeroed, so the next status falls back to
    /// content comparison.
    pub fn read_tree(&mut self, flat: &std::collections::BTreeMap<BString, rvs_store::walk::FlatEntry>) {
        self.entries = flat
            .iter()
            .map(|(path, fe)| IndexEntry {
                path: path.clone(),
                oid: fe.oid,
                mode: fe.mode,
                stage: Stage::Normal,
                stat: StatData::default(),
            })
            .collect();
    }

    /// Write the stage-0 entries out as nested tree objects; returns the
    /// root tree OID.
    pub fn write_tree(&self, store: &ObjectStore) -> Result<ObjectId, IndexError> {
        let flat: std::collections::BTreeMap<BString, rvs_store::walk::FlatEntry> = self
            .entries
            .iter()
            .filter(|e| e.stage == Stage::Normal)
            .map(|e| {
                (
                    e.path.clone(),
                    rvs_store::walk::FlatEntry {
                        mode: e.mode,
                        oid: e.oid,
                    },
                )
            })
            .collect();
        Ok(rvs_store::walk::build_tree(store, &flat)?)
    }
}
