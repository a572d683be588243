//! Index file serialization (format v2).

use std::io::Write;
use std::path::Path;

use rvs_hash::Hasher;
use rvs_utils::{Lockfile, UtilError};

use crate::entry::IndexEntry;
use crate::{Index, IndexError};

const SIGNATURE: &[u8; 4] = b"DIRC";

/// Serialize and atomically replace the file at `path` under its lock.
pub(crate) fn write(index: &Index, path: &Path) -> Result<(), IndexError> {
    let mut lock = Lockfile::hold(path).map_err(|e| match e {
        UtilError::Lock(_) => IndexError::Locked {
            path: path.to_path_buf(),
        },
        UtilError::Io(io) => IndexError::Io(io),
        other => IndexError::InvalidHeader(other.to_string()),
    })?;

    let data = serialize(index)?;
    lock.write_all(&data)?;
    lock.commit().map_err(|_| IndexError::Locked {
        path: path.to_path_buf(),
    })?;
    Ok(())
}

pub(crate) fn serialize(index: &Index) -> Result<Vec<u8>, IndexError> {
    let mut buf = Vec::new();
    buf.extend_from_slice(SIGNATURE);
    buf.extend_from_slice(&2u32.to_be_bytes());
    buf.extend_from_slice(&(index.len() as u32).to_be_bytes());

    for entry in index.iter() {
        write_entry(&mut buf, entry);
    }

    let checksum =
        Hasher::digest(&buf).map_err(|e| IndexError::InvalidHeader(e.to_string()))?;
    buf.extend_from_slice(checksum.as_bytes());
    Ok(buf)
}

fn write_entry(buf: &mut Vec<u8>, entry: &IndexEntry) {
    let start = buf.len();

    buf.extend_from_slice(&entry.stat.ctime_secs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.ctime_nsecs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.mtime_secs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.mtime_nsecs.to_be_bytes());
    buf.extend_from_slice(&entry.stat.dev.to_be_bytes());
    buf.extend_from_slice(&entry.stat.ino.to_be_bytes());
    buf.extend_from_slice(&entry.mode.raw().to_be_bytes());
    buf.extend_from_slice(&entry.stat.uid.to_be_bytes());
    buf.extend_from_slice(&entry.stat.gid.to_be_bytes());
    buf.extend_from_slice(&entry.stat.size.to_be_bytes());
    buf.extend_from_slice(entry.oid.as_bytes());

    let name_len = entry.path.len().min(0xFFF) as u16;
    let flags = name_len | ((entry.stage.as_u8() as u16) << 12);
    buf.extend_from_slice(&flags.to_be_bytes());
    buf.extend_from_slice(&entry.path);

    // Pad with NULs to an 8-byte boundary; at least one terminates the path.
    let entry_size = (62 + entry.path.len() + 8) & !7;
    buf.resize(start + entry_size, 0);
}
