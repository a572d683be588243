use std::cmp::Ordering;

use bstr::{BStr, BString, ByteSlice};
use rvs_hash::ObjectId;

use crate::ObjectError;

/// File mode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileMode {
    /// Regular file (100644).
    Regular,
    /// Executable file (100755).
    Executable,
    /// Symbolic link (120000).
    Symlink,
    /// Subtree (40000).
    Dir,
}

impl FileMode {
    /// Parse from octal ASCII as written in tree payloads.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"100644" => Ok(Self::Regular),
            b"100755" => Ok(Self::Executable),
            b"120000" => Ok(Self::Symlink),
            b"40000" | b"040000" => Ok(Self::Dir),
            other => Err(ObjectError::InvalidFileMode(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Canonical octal ASCII form (trees carry no leading zero).
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Regular => b"100644",
            Self::Executable => b"100755",
            Self::Symlink => b"120000",
            Self::Dir => b"40000",
        }
    }

    /// Numeric value, as shown by `ls-tree`.
    pub fn raw(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
            Self::Dir => 0o40000,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Dir)
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::Regular | Self::Executable)
    }
}

/// One `(mode, name, oid)` row of a directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: FileMode,
    pub name: BString,
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Order entries the way git does: after the common prefix a directory
    /// name compares as if it carried a trailing `/`. This puts the dir
    /// `foo` after `foo-bar` but before `foo0`.
    pub fn compare(a: &TreeEntry, b: &TreeEntry) -> Ordering {
        name_compare(&a.name, a.mode.is_dir(), &b.name, b.mode.is_dir())
    }
}

impl PartialOrd for TreeEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TreeEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        Self::compare(self, other)
    }
}

/// The directory-aware byte comparison behind tree ordering.
pub fn name_compare(name1: &[u8], is_dir1: bool, name2: &[u8], is_dir2: bool) -> Ordering {
    let common = name1.len().min(name2.len());
    match name1[..common].cmp(&name2[..common]) {
        Ordering::Equal => {}
        other => return other,
    }
    // One name is a prefix of the other. The "next byte" is the real byte
    // where one remains, `/` for an exhausted directory name, NUL otherwise.
    let next = |name: &[u8], is_dir: bool| -> u8 {
        if name.len() > common {
            name[common]
        } else if is_dir {
            b'/'
        } else {
            0
        }
    };
    next(name1, is_dir1).cmp(&next(name2, is_dir2))
}

/// A directory snapshot: a sorted run of entries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tree {
    pub entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse binary payload: repeated `<mode> <name>\0<20-byte-oid>`.
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < payload.len() {
            let space = payload[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: pos,
                    reason: "missing space after mode".into(),
                })?
                + pos;
            let mode = FileMode::from_bytes(&payload[pos..space])?;

            let name_start = space + 1;
            let nul = payload[name_start..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "missing NUL after name".into(),
                })?
                + name_start;
            let name = BString::from(&payload[name_start..nul]);
            if name.is_empty() || name.contains(&b'/') {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: name_start,
                    reason: "bad entry name".into(),
                });
            }

            let oid_start = nul + 1;
            let oid_end = oid_start + 20;
            if oid_end > payload.len() {
                return Err(ObjectError::InvalidTreeEntry {
                    offset: oid_start,
                    reason: "truncated OID".into(),
                });
            }
            let oid = ObjectId::from_bytes(&payload[oid_start..oid_end])?;

            entries.push(TreeEntry { mode, name, oid });
            pos = oid_end;
        }

        Ok(Self { entries })
    }

    /// Serialize to binary payload, in canonical sort order. Identical
    /// logical content therefore always yields identical bytes.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut sorted: Vec<&TreeEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| TreeEntry::compare(a, b));

        let mut out = Vec::new();
        for entry in sorted {
            out.extend_from_slice(entry.mode.as_bytes());
            out.push(b' ');
            out.extend_from_slice(&entry.name);
            out.push(0);
            out.extend_from_slice(entry.oid.as_bytes());
        }
        out
    }

    pub fn sort(&mut self) {
        self.entries.sort_by(TreeEntry::compare);
    }

    pub fn find(&self, name: &BStr) -> Option<&TreeEntry> {
        self.entries.iter().find(|e| e.name.as_bstr() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entry(mode: FileMode, name: &str) -> TreeEntry {
        TreeEntry {
            mode,
            name: BString::from(name),
            oid: ObjectId::NULL,
        }
    }

    #[test]
    fn mode_roundtrip() {
        for mode in [
            FileMode::Regular,
            FileMode::Executable,
            FileMode::Symlink,
            FileMode::Dir,
        ] {
            assert_eq!(FileMode::from_bytes(mode.as_bytes()).unwrap(), mode);
        }
        assert!(FileMode::from_bytes(b"160000").is_err());
    }

    #[test]
    fn dir_sorts_with_implicit_slash() {
        // "foo/" > "foo.c" because '/' (0x2f) > '.' (0x2e)
        let dir = entry(FileMode::Dir, "foo");
        let file = entry(FileMode::Regular, "foo.c");
        assert_eq!(TreeEntry::compare(&dir, &file), Ordering::Greater);

        // "foo/" > "foo-bar" because '/' > '-'
        let hyphen = entry(FileMode::Regular, "foo-bar");
        assert_eq!(TreeEntry::compare(&dir, &hyphen), Ordering::Greater);

        // "foo/" < "foo0" because '/' < '0'
        let digit = entry(FileMode::Regular, "foo0");
        assert_eq!(TreeEntry::compare(&dir, &digit), Ordering::Less);
    }

    #[test]
    fn plain_file_prefix_sorts_first() {
        let short = entry(FileMode::Regular, "foo");
        let long = entry(FileMode::Regular, "foobar");
        assert_eq!(TreeEntry::compare(&short, &long), Ordering::Less);
    }

    #[test]
    fn parse_rejects_slash_in_name() {
        let mut data = Vec::new();
        data.extend_from_slice(b"100644 a/b\0");
        data.extend_from_slice(ObjectId::NULL.as_bytes());
        assert!(Tree::parse(&data).is_err());
    }

    #[test]
    fn payload_roundtrip_sorts() {
        let tree = Tree {
            entries: vec![
                entry(FileMode::Regular, "b.txt"),
                entry(FileMode::Dir, "a-dir"),
            ],
        };
        let payload = tree.to_payload();
        let parsed = Tree::parse(&payload).unwrap();
        assert_eq!(parsed.entries[0].name, "a-dir");
        assert_eq!(parsed.entries[1].name, "b.txt");
    }

    #[test]
    fn empty_tree_parses() {
        assert!(Tree::parse(b"").unwrap().is_empty());
    }

    proptest! {
        // Serializing any permutation of the same entry set yields the same
        // bytes, hence the same OID.
        #[test]
        fn serialization_is_order_independent(indices in proptest::sample::subsequence(
            vec![0usize, 1, 2, 3, 4, 5], 0..=6)) {
            let names = ["a", "b", "dir", "dir-x", "x.txt", "zz"];
            let mut entries: Vec<TreeEntry> = indices
                .iter()
                .map(|&i| entry(
                    if names[i] == "dir" { FileMode::Dir } else { FileMode::Regular },
                    names[i],
                ))
                .collect();
            let forward = Tree { entries: entries.clone() }.to_payload();
            entries.reverse();
            let reversed = Tree { entries }.to_payload();
            prop_assert_eq!(forward, reversed);
        }
    }
}
