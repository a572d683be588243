//! Short object id resolution.
//!
//! Abbreviations of at least four hex characters resolve against the fan-out
//! directory named by the first two; a prefix matching more than one object
//! is an error rather than a guess.

use std::fs;

use rvs_hash::{hex, ObjectId};

use crate::{ObjectStore, StoreError};

/// Shortest accepted abbreviation.
const MINIMUM_ABBREV: usize = 4;

impl ObjectStore {
    /// Resolve a hex abbreviation to the full OID it names.
    pub fn resolve_prefix(&self, prefix: &str) -> Result<ObjectId, StoreError> {
        if prefix.len() < MINIMUM_ABBREV
            || prefix.len() > ObjectId::HEX_LEN
            || !hex::is_hex(prefix)
        {
            return Err(StoreError::NotFound(prefix.to_string()));
        }

        if prefix.len() == ObjectId::HEX_LEN {
            let oid = ObjectId::from_hex(prefix)?;
            return if self.contains(&oid) {
                Ok(oid)
            } else {
                Err(StoreError::NotFound(prefix.to_string()))
            };
        }

        let prefix_lower = prefix.to_ascii_lowercase();
        let fanout = self.objects_dir.join(&prefix_lower[..2]);
        let mut matches: Vec<ObjectId> = Vec::new();

        if fanout.is_dir() {
            for entry in fs::read_dir(&fanout)? {
                let entry = entry?;
                let rest = entry.file_name();
                let rest = rest.to_string_lossy();
                if !rest.starts_with(&prefix_lower[2..]) {
                    continue;
                }
                if let Ok(oid) = ObjectId::from_hex(&format!("{}{}", &prefix_lower[..2], rest)) {
                    matches.push(oid);
                }
            }
        }

        matches.sort();
        matches.dedup();
        match matches.len() {
            0 => Err(StoreError::NotFound(prefix.to_string())),
            1 => Ok(matches[0]),
            _ => Err(StoreError::Ambiguous {
                prefix: prefix.to_string(),
            }),
        }
    }
}
