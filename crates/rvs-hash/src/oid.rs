use std::fmt;
use std::str::FromStr;

use crate::hex;
use crate::HashError;

/// The identity of an object: the SHA-1 of its framed bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl ObjectId {
    /// The all-zeros OID, used as a placeholder for "no object".
    pub const NULL: Self = Self([0u8; 20]);

    /// Number of hex characters in a full OID.
    pub const HEX_LEN: usize = 40;

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        if bytes.len() != 20 {
            return Err(HashError::InvalidDigestLength {
                expected: 20,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, HashError> {
        let mut arr = [0u8; 20];
        hex::decode(hex_str, &mut arr)?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Abbreviated hex form (git's usual 7 characters).
    pub fn short(&self) -> String {
        self.to_hex()[..7].to_string()
    }

    /// Whether the hex form starts with `prefix` (case-insensitive).
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }

    /// Fan-out path component for loose storage: `"xx/yyyy…"`.
    pub fn fanout_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short())
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_BLOB: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

    #[test]
    fn hex_roundtrip() {
        let oid = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert_eq!(oid.to_hex(), EMPTY_BLOB);
        let parsed: ObjectId = EMPTY_BLOB.parse().unwrap();
        assert_eq!(parsed, oid);
    }

    #[test]
    fn short_form() {
        let oid = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert_eq!(oid.short(), "e69de29");
    }

    #[test]
    fn fanout_path_splits_after_two() {
        let oid = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert_eq!(oid.fanout_path(), format!("e6/{}", &EMPTY_BLOB[2..]));
    }

    #[test]
    fn null_oid() {
        assert!(ObjectId::NULL.is_null());
        assert!(!ObjectId::from_hex(EMPTY_BLOB).unwrap().is_null());
    }

    #[test]
    fn prefix_match_is_case_insensitive() {
        let oid = ObjectId::from_hex(EMPTY_BLOB).unwrap();
        assert!(oid.matches_prefix("e69d"));
        assert!(oid.matches_prefix("E69D"));
        assert!(!oid.matches_prefix("ffff"));
    }

    #[test]
    fn from_bytes_wrong_length() {
        assert!(matches!(
            ObjectId::from_bytes(&[0; 19]).unwrap_err(),
            HashError::InvalidDigestLength {
                expected: 20,
                actual: 19
            }
        ));
    }

    #[test]
    fn ordering_is_bytewise() {
        let a = ObjectId::from_hex("0000000000000000000000000000000000000001").unwrap();
        let b = ObjectId::from_hex("0000000000000000000000000000000000000002").unwrap();
        assert!(a < b);
    }
}
