//! Reflog entries.
//!
//! rvs keeps a log only for `refs/stash`: each stash push appends a line and
//! the stack is read back newest-first. The line format is git's:
//! `<old-oid> <new-oid> <name> <email> <epoch> <±HHMM>\t<message>`.

use std::fs;
use std::io::Write;
use std::path::Path;

use bstr::{BStr, BString, ByteSlice, ByteVec};
use rvs_hash::ObjectId;
use rvs_utils::date::Signature;

use crate::RefError;

/// One line of a reflog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflogEntry {
    pub old: ObjectId,
    pub new: ObjectId,
    pub who: Signature,
    pub message: BString,
}

impl ReflogEntry {
    /// Serialize to a single log line (with trailing newline).
    pub fn to_line(&self) -> BString {
        let mut out = BString::from(self.old.to_hex());
        out.push_byte(b' ');
        out.push_str(self.new.to_hex().as_bytes());
        out.push_byte(b' ');
        out.push_str(&self.who.to_bytes());
        out.push_byte(b'\t');
        out.push_str(&self.message);
        out.push_byte(b'\n');
        out
    }

    /// Parse a single log line (no trailing newline required).
    pub fn parse_line(line: &BStr) -> Result<Self, RefError> {
        let line = line.trim_end();
        let (meta, message) = match line.find_byte(b'\t') {
            Some(tab) => (&line[..tab], BString::from(&line[tab + 1..])),
            None => (line.as_bytes(), BString::new(Vec::new())),
        };

        let bad = |what: &str| RefError::Parse(format!("reflog line: {what}"));

        if meta.len() < 82 || meta[40] != b' ' || meta[81] != b' ' {
            return Err(bad("missing OID pair"));
        }
        let old_hex = std::str::from_utf8(&meta[..40]).map_err(|_| bad("old OID"))?;
        let new_hex = std::str::from_utf8(&meta[41..81]).map_err(|_| bad("new OID"))?;
        let old = ObjectId::from_hex(old_hex).map_err(|_| bad("old OID"))?;
        let new = ObjectId::from_hex(new_hex).map_err(|_| bad("new OID"))?;
        let who = Signature::parse(meta[82..].as_bstr())
            .map_err(|e| bad(&format!("signature: {e}")))?;

        Ok(Self {
            old,
            new,
            who,
            message,
        })
    }
}

/// Append an entry to the log at `path`, creating parents as needed.
pub fn append(path: &Path, entry: &ReflogEntry) -> Result<(), RefError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RefError::IoPath {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| RefError::IoPath {
            path: path.to_path_buf(),
            source: e,
        })?;
    file.write_all(&entry.to_line()).map_err(|e| RefError::IoPath {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

/// Read the whole log, oldest first. A missing file is an empty log.
pub fn read(path: &Path) -> Result<Vec<ReflogEntry>, RefError> {
    let raw = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RefError::IoPath {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    raw.lines()
        .filter(|l| !l.is_empty())
        .map(|l| ReflogEntry::parse_line(l.as_bstr()))
        .collect()
}

/// Replace the whole log, oldest first. An empty list removes the file.
pub fn rewrite(path: &Path, entries: &[ReflogEntry]) -> Result<(), RefError> {
    if entries.is_empty() {
        if path.exists() {
            fs::remove_file(path).map_err(|e| RefError::IoPath {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        return Ok(());
    }
    let mut content = BString::new(Vec::new());
    for entry in entries {
        content.push_str(&entry.to_line());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| RefError::IoPath {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::write(path, &content).map_err(|e| RefError::IoPath {
        path: path.to_path_buf(),
        source: e,
    })
}
