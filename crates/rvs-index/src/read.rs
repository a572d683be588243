//! Index file parsing (format v2).

use bstr::BString;
use rvs_hash::{Hasher, ObjectId};
use rvs_object::FileMode;

use crate::entry::{IndexEntry, StatData};
use crate::{Index, IndexError, Stage};

const SIGNATURE: &[u8; 4] = b"DIRC";

pub(crate) fn parse(data: &[u8]) -> Result<Index, IndexError> {
    if data.len() < 12 + 20 {
        return Err(IndexError::InvalidHeader("file too short".into()));
    }

    // The trailer is the SHA-1 of everything before it.
    let content_end = data.len() - 20;
    let actual = Hasher::digest(&data[..content_end])
        .map_err(|e| IndexError::InvalidHeader(e.to_string()))?;
    let stored = ObjectId::from_bytes(&data[content_end..])
        .map_err(|e| IndexError::InvalidHeader(e.to_string()))?;
    if actual != stored {
        return Err(IndexError::ChecksumMismatch);
    }

    if &data[..4] != SIGNATURE {
        return Err(IndexError::InvalidHeader(format!(
            "bad signature {:?}",
            &data[..4]
        )));
    }
    let version = read_u32(&data[4..]);
    if version != 2 {
        return Err(IndexError::UnsupportedVersion(version));
    }
    let entry_count = read_u32(&data[8..]) as usize;

    let mut cursor = 12;
    let mut entries = Vec::with_capacity(entry_count);
    for _ in 0..entry_count {
        let (entry, next) = parse_entry(data, cursor, content_end)?;
        entries.push(entry);
        cursor = next;
    }
    // Anything between the last entry and the trailer would be an extension;
    // rvs writes none and ignores any found.

    Ok(Index { entries })
}

/// v2 entry layout: 40 bytes of stat+mode, 20-byte OID, 2-byte flags, the
/// NUL-terminated path, then NUL padding to an 8-byte boundary.
fn parse_entry(
    data: &[u8],
    start: usize,
    content_end: usize,
) -> Result<(IndexEntry, usize), IndexError> {
    if start + 62 > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry too short".into(),
        });
    }

    let stat = StatData {
        ctime_secs: read_u32(&data[start..]),
        ctime_nsecs: read_u32(&data[start + 4..]),
        mtime_secs: read_u32(&data[start + 8..]),
        mtime_nsecs: read_u32(&data[start + 12..]),
        dev: read_u32(&data[start + 16..]),
        ino: read_u32(&data[start + 20..]),
        uid: read_u32(&data[start + 28..]),
        gid: read_u32(&data[start + 32..]),
        size: read_u32(&data[start + 36..]),
    };
    let mode_raw = read_u32(&data[start + 24..]);
    let mode = match mode_raw {
        0o100644 => FileMode::Regular,
        0o100755 => FileMode::Executable,
        0o120000 => FileMode::Symlink,
        other => {
            return Err(IndexError::InvalidEntry {
                offset: start,
                reason: format!("bad mode {other:o}"),
            })
        }
    };

    let oid = ObjectId::from_bytes(&data[start + 40..start + 60]).map_err(|_| {
        IndexError::InvalidEntry {
            offset: start,
            reason: "bad OID".into(),
        }
    })?;

    let flags = read_u16(&data[start + 60..]);
    let stage = Stage::from_u8(((flags >> 12) & 0x3) as u8).ok_or(IndexError::InvalidEntry {
        offset: start,
        reason: "bad stage".into(),
    })?;

    let path_start = start + 62;
    let nul = data[path_start..content_end]
        .iter()
        .position(|&b| b == 0)
        .ok_or(IndexError::InvalidEntry {
            offset: start,
            reason: "unterminated path".into(),
        })?;
    let path = BString::from(&data[path_start..path_start + nul]);

    let entry_size = (62 + path.len() + 8) & !7;
    let next = start + entry_size;
    if next > content_end {
        return Err(IndexError::InvalidEntry {
            offset: start,
            reason: "entry overruns file".into(),
        });
    }

    Ok((
        IndexEntry {
            path,
            oid,
            mode,
            stage,
            stat,
        },
        next,
    ))
}

fn read_u32(data: &[u8]) -> u32 {
    u32::from_be_bytes([data[0], data[1], data[2], data[3]])
}

fn read_u16(data: &[u8]) -> u16 {
    u16::from_be_bytes([data[0], data[1]])
}
