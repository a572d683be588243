//! The working tree adapter: staging files, hashing without writing,
//! materializing trees, and computing the three status sets.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bstr::{BStr, BString, ByteSlice};
use rvs_hash::ObjectId;
use rvs_index::{IgnoreList, Index, IndexEntry, Pathspec, Stage, StatData};
use rvs_object::{FileMode, ObjectKind};
use rvs_store::walk::{flatten_tree, FlatEntry};
use rvs_utils::path as rpath;

use crate::{RepoError, Repository, IGNORE_FILE, RVS_DIR_NAME};

/// Read blob content for a worktree file: the link target for symlinks,
/// the file bytes otherwise. `Ok(None)` when the path is absent or a
/// directory.
pub fn read_file(repo: &Repository, rel: &BStr) -> Result<Option<(FileMode, Vec<u8>)>, RepoError> {
    let path = rpath::to_os_path(repo.work_tree(), rel);
    let meta = match fs::symlink_metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RepoError::Io(e)),
    };

    if meta.file_type().is_symlink() {
        let target = fs::read_link(&path)?;
        let bytes = target.to_string_lossy().into_owned().into_bytes();
        return Ok(Some((FileMode::Symlink, bytes)));
    }
    if meta.is_dir() {
        return Ok(None);
    }
    let mode = mode_of(&meta);
    Ok(Some((mode, fs::read(&path)?)))
}

/// Hash a worktree file's blob identity without writing the object.
pub fn hash_file(repo: &Repository, rel: &BStr) -> Result<Option<ObjectId>, RepoError> {
    match read_file(repo, rel)? {
        Some((_, data)) => Ok(Some(rvs_store::ObjectStore::hash_only(
            ObjectKind::Blob,
            &data,
        )?)),
        None => Ok(None),
    }
}

/// Stage one file: write its blob, then record `(path, mode, oid, stat)`
/// in the index, clearing any conflict stages for the path.
pub fn stage_file(repo: &Repository, index: &mut Index, rel: &BStr) -> Result<(), RepoError> {
    if rpath::is_metadata_path(rel.as_bytes()) {
        return Err(RepoError::PathOutsideRepo(rel.to_string()));
    }
    let (mode, data) = read_file(repo, rel)?
        .ok_or_else(|| RepoError::PathOutsideRepo(rel.to_string()))?;
    let oid = repo.store().write_raw(ObjectKind::Blob, &data)?;

    let os_path = rpath::to_os_path(repo.work_tree(), rel);
    let stat = fs::symlink_metadata(&os_path)
        .map(|m| StatData::from_metadata(&m))
        .unwrap_or_default();

    index.remove(rel);
    index.add(IndexEntry {
        path: BString::from(rel.as_bytes()),
        oid,
        mode,
        stage: Stage::Normal,
        stat,
    });
    Ok(())
}

/// Write one blob into the working tree at `rel`, creating parents.
pub fn write_file(repo: &Repository, rel: &BStr, entry: &FlatEntry) -> Result<(), RepoError> {
    let path = rpath::to_os_path(repo.work_tree(), rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = repo.store().read_blob(&entry.oid)?;

    match entry.mode {
        FileMode::Symlink => {
            let _ = fs::remove_file(&path);
            #[cfg(unix)]
            {
                use std::os::unix::ffi::OsStrExt;
                let target = std::ffi::OsStr::from_bytes(&data);
                std::os::unix::fs::symlink(target, &path)?;
            }
            #[cfg(not(unix))]
            fs::write(&path, &data)?;
        }
        _ => {
            fs::write(&path, &data)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let bits = if entry.mode == FileMode::Executable {
                    0o755
                } else {
                    0o644
                };
                fs::set_permissions(&path, fs::Permissions::from_mode(bits))?;
            }
        }
    }
    Ok(())
}

/// Materialize `new_tree` into the working tree, replacing `old_tree`.
///
/// Tracked files absent from the new tree are deleted; paths whose local
/// content differs from both trees block the switch (unless `force`),
/// so uncommitted work is never silently lost. The index is rewritten to
/// the new tree only after the files are fully on disk.
pub fn materialize_tree(
    repo: &Repository,
    index: &mut Index,
    new_tree: &ObjectId,
    old_tree: Option<&ObjectId>,
    force: bool,
) -> Result<(), RepoError> {
    let new_flat = flatten_tree(repo.store(), new_tree)?;
    let old_flat = match old_tree {
        Some(oid) => flatten_tree(repo.store(), oid)?,
        None => BTreeMap::new(),
    };

    if !force {
        let mut blockers: Vec<BString> = Vec::new();
        for (path, new_entry) in &new_flat {
            if old_flat.get(path) == Some(new_entry) {
                continue;
            }
            if let Some(on_disk) = hash_file(repo, path.as_ref())? {
                let matches_old = old_flat.get(path).map(|e| e.oid) == Some(on_disk);
                if on_disk != new_entry.oid && !matches_old {
                    blockers.push(path.clone());
                }
            }
        }
        for (path, old_entry) in &old_flat {
            if new_flat.contains_key(path) {
                continue;
            }
            if let Some(on_disk) = hash_file(repo, path.as_ref())? {
                if on_disk != old_entry.oid {
                    blockers.push(path.clone());
                }
            }
        }
        if !blockers.is_empty() {
            blockers.sort();
            return Err(RepoError::DirtyWorktree(blockers));
        }
    }

    for (path, entry) in &new_flat {
        write_file(repo, path.as_ref(), entry)?;
    }
    for path in old_flat.keys() {
        if !new_flat.contains_key(path) {
            remove_file_and_empty_parents(repo.work_tree(), path)?;
        }
    }

    index.read_tree(&new_flat);
    refresh_stat_cache(repo, index)?;
    Ok(())
}

/// Restore a selection of paths from a flat tree listing into the working
/// tree, and optionally the index. HEAD does not move.
pub fn checkout_paths(
    repo: &Repository,
    index: &mut Index,
    flat: &BTreeMap<BString, FlatEntry>,
    pathspec: &Pathspec,
    into_index: bool,
    into_worktree: bool,
) -> Result<usize, RepoError> {
    let mut touched = 0;
    for (path, entry) in flat {
        if !pathspec.matches(path.as_ref()) {
            continue;
        }
        touched += 1;
        if into_worktree {
            write_file(repo, path.as_ref(), entry)?;
        }
        if into_index {
            index.remove(path.as_ref());
            let stat = if into_worktree {
                stat_of(repo, path.as_ref())
            } else {
                StatData::default()
            };
            index.add(IndexEntry {
                path: path.clone(),
                oid: entry.oid,
                mode: entry.mode,
                stage: Stage::Normal,
                stat,
            });
        }
    }
    Ok(touched)
}

/// Delete `rel` and any directories the deletion leaves empty.
pub fn remove_file_and_empty_parents(work_tree: &Path, rel: &BString) -> Result<(), RepoError> {
    let path = rpath::to_os_path(work_tree, rel);
    match fs::remove_file(&path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(RepoError::Io(e)),
    }
    let mut dir = path.parent().map(Path::to_path_buf);
    while let Some(d) = dir {
        if d == work_tree || !d.starts_with(work_tree) {
            break;
        }
        if d.read_dir().map(|mut e| e.next().is_none()).unwrap_or(false) {
            let _ = fs::remove_dir(&d);
            dir = d.parent().map(Path::to_path_buf);
        } else {
            break;
        }
    }
    Ok(())
}

/// Re-stat every index entry whose file is present so later status calls
/// can trust the cache.
pub fn refresh_stat_cache(repo: &Repository, index: &mut Index) -> Result<(), RepoError> {
    let updates: Vec<(BString, StatData)> = index
        .iter()
        .map(|e| (e.path.clone(), stat_of(repo, e.path.as_ref())))
        .collect();
    for (path, stat) in updates {
        if let Some(entry) = index.get(path.as_ref(), Stage::Normal) {
            let mut entry = entry.clone();
            entry.stat = stat;
            index.add(entry);
        }
    }
    Ok(())
}

fn stat_of(repo: &Repository, rel: &BStr) -> StatData {
    let path = rpath::to_os_path(repo.work_tree(), rel);
    fs::symlink_metadata(&path)
        .map(|m| StatData::from_metadata(&m))
        .unwrap_or_default()
}

fn mode_of(meta: &fs::Metadata) -> FileMode {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 != 0 {
            return FileMode::Executable;
        }
    }
    let _ = meta;
    FileMode::Regular
}

// --- Status ---

/// How a path differs between two of the three views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Added,
    Modified,
    Deleted,
    TypeChanged,
}

impl StatusKind {
    pub fn short_letter(&self) -> char {
        match self {
            StatusKind::Added => 'A',
            StatusKind::Modified => 'M',
            StatusKind::Deleted => 'D',
            StatusKind::TypeChanged => 'T',
        }
    }

    pub fn long_word(&self) -> &'static str {
        match self {
            StatusKind::Added => "new file",
            StatusKind::Modified => "modified",
            StatusKind::Deleted => "deleted",
            StatusKind::TypeChanged => "typechange",
        }
    }
}

/// The three views reconciled: index vs HEAD, worktree vs index, and
/// paths in neither.
#[derive(Debug, Default)]
pub struct StatusReport {
    /// Index vs HEAD tree (changes to be committed), sorted by path.
    pub staged: Vec<(StatusKind, BString)>,
    /// Worktree vs index (changes not staged), sorted by path.
    pub unstaged: Vec<(StatusKind, BString)>,
    /// Paths tracked by neither index nor ignore rules; untracked
    /// directories are collapsed to `dir/`.
    pub untracked: Vec<BString>,
    /// Paths with unresolved merge stages.
    pub unmerged: Vec<BString>,
}

impl StatusReport {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.unstaged.is_empty()
            && self.untracked.is_empty()
            && self.unmerged.is_empty()
    }
}

/// Compute the full status of one worktree.
pub fn status(repo: &Repository, index: &Index) -> Result<StatusReport, RepoError> {
    let mut report = StatusReport {
        unmerged: index
            .conflicted_paths()
            .into_iter()
            .map(BString::from)
            .collect(),
        ..Default::default()
    };

    // Staged: HEAD tree vs stage-0 index entries.
    let head_flat = match repo.head_tree()? {
        Some(tree) => flatten_tree(repo.store(), &tree)?,
        None => BTreeMap::new(),
    };
    for entry in index.iter().filter(|e| e.stage == Stage::Normal) {
        match head_flat.get(&entry.path) {
            None => report.staged.push((StatusKind::Added, entry.path.clone())),
            Some(head_entry) => {
                if head_entry.oid != entry.oid || head_entry.mode != entry.mode {
                    report
                        .staged
                        .push((StatusKind::Modified, entry.path.clone()));
                }
            }
        }
    }
    for path in head_flat.keys() {
        if !index.contains(path.as_ref()) {
            report.staged.push((StatusKind::Deleted, path.clone()));
        }
    }
    report.staged.sort_by(|a, b| a.1.cmp(&b.1));

    // Unstaged: worktree vs stage-0 index entries.
    for entry in index.iter().filter(|e| e.stage == Stage::Normal) {
        let os_path = rpath::to_os_path(repo.work_tree(), entry.path.as_ref());
        let meta = match fs::symlink_metadata(&os_path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                report
                    .unstaged
                    .push((StatusKind::Deleted, entry.path.clone()));
                continue;
            }
            Err(e) => return Err(RepoError::Io(e)),
        };
        if meta.is_dir() {
            report
                .unstaged
                .push((StatusKind::TypeChanged, entry.path.clone()));
            continue;
        }
        // A valid stat cache means unchanged without rehashing.
        if !entry.stat.is_unset() && entry.stat.matches(&meta) {
            continue;
        }
        let (mode, data) = match read_file(repo, entry.path.as_ref())? {
            Some(v) => v,
            None => {
                report
                    .unstaged
                    .push((StatusKind::Deleted, entry.path.clone()));
                continue;
            }
        };
        let oid = rvs_store::ObjectStore::hash_only(ObjectKind::Blob, &data)?;
        if oid != entry.oid || mode != entry.mode {
            report
                .unstaged
                .push((StatusKind::Modified, entry.path.clone()));
        }
    }

    // Untracked: worktree entries known to neither index nor ignore file.
    let ignores = IgnoreList::load(&repo.work_tree().join(IGNORE_FILE))?;
    collect_untracked(
        repo.work_tree(),
        repo.work_tree(),
        index,
        &ignores,
        &mut report.untracked,
    )?;

    Ok(report)
}

fn collect_untracked(
    work_tree: &Path,
    dir: &Path,
    index: &Index,
    ignores: &IgnoreList,
    out: &mut Vec<BString>,
) -> Result<(), RepoError> {
    let mut entries: Vec<fs::DirEntry> = fs::read_dir(dir)?.filter_map(Result::ok).collect();
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        if path.file_name().map(|n| n == RVS_DIR_NAME).unwrap_or(false) {
            continue;
        }
        let rel = match rpath::workdir_relative(work_tree, &path) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        let is_dir = path.is_dir();
        if ignores.is_ignored(rel.as_ref(), is_dir) {
            continue;
        }

        if is_dir {
            if dir_has_tracked_files(work_tree, &path, index, ignores) {
                collect_untracked(work_tree, &path, index, ignores, out)?;
            } else if dir_has_any_file(&path) {
                let mut shown = rel.clone();
                shown.extend_from_slice(b"/");
                out.push(shown);
            }
        } else if !index.contains(rel.as_ref()) {
            out.push(rel);
        }
    }
    Ok(())
}

fn dir_has_tracked_files(
    work_tree: &Path,
    dir: &Path,
    index: &Index,
    ignores: &IgnoreList,
) -> bool {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return false,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.file_name().map(|n| n == RVS_DIR_NAME).unwrap_or(false) {
            continue;
        }
        let rel = match rpath::workdir_relative(work_tree, &path) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        if ignores.is_ignored(rel.as_ref(), path.is_dir()) {
            continue;
        }
        if path.is_dir() {
            if dir_has_tracked_files(work_tree, &path, index, ignores) {
                return true;
            }
        } else if index.contains(rel.as_ref()) {
            return true;
        }
    }
    false
}

fn dir_has_any_file(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
