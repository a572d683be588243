//! The rvs object model: blobs, trees, and commits.
//!
//! All three kinds share the framing contract `"<type> <length>\0<payload>"`
//! and differ only in payload grammar. The framed bytes are what gets hashed
//! and what gets compressed onto disk, so two objects with equal logical
//! content always share one identity.

mod blob;
mod commit;
pub mod header;
pub mod tree;

pub use blob::Blob;
pub use commit::Commit;
pub use tree::{FileMode, Tree, TreeEntry};

use bstr::BString;
use rvs_hash::{HashError, Hasher, ObjectId};

/// Errors produced by object parsing and serialization.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("truncated object: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: usize, reason: String },

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("invalid file mode: {0}")]
    InvalidFileMode(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// The three kinds of object rvs stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectKind {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}

/// A parsed object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    Blob(Blob),
    Tree(Tree),
    Commit(Commit),
}

impl Object {
    /// Parse framed bytes (header + payload).
    pub fn parse(data: &[u8]) -> Result<Self, ObjectError> {
        let (kind, payload_len, header_len) = header::parse(data)?;
        let payload = &data[header_len..];
        if payload.len() < payload_len {
            return Err(ObjectError::Truncated {
                expected: payload_len,
                actual: payload.len(),
            });
        }
        Self::parse_payload(kind, &payload[..payload_len])
    }

    /// Parse a payload whose kind is already known.
    pub fn parse_payload(kind: ObjectKind, payload: &[u8]) -> Result<Self, ObjectError> {
        match kind {
            ObjectKind::Blob => Ok(Self::Blob(Blob::from_bytes(payload))),
            ObjectKind::Tree => Ok(Self::Tree(Tree::parse(payload)?)),
            ObjectKind::Commit => Ok(Self::Commit(Commit::parse(payload)?)),
        }
    }

    /// Serialize the payload alone (no header).
    pub fn to_payload(&self) -> Vec<u8> {
        match self {
            Self::Blob(b) => b.data.to_vec(),
            Self::Tree(t) => t.to_payload(),
            Self::Commit(c) => c.to_payload(),
        }
    }

    /// Serialize to framed form (header + payload).
    pub fn to_framed(&self) -> Vec<u8> {
        let payload = self.to_payload();
        let hdr = header::write(self.kind(), payload.len());
        let mut out = Vec::with_capacity(hdr.len() + payload.len());
        out.extend_from_slice(&hdr);
        out.extend_from_slice(&payload);
        out
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
            Self::Commit(_) => ObjectKind::Commit,
        }
    }

    /// The identity of this object: the hash of its framed bytes.
    pub fn id(&self) -> Result<ObjectId, ObjectError> {
        Ok(Hasher::hash_object(self.kind().as_str(), &self.to_payload())?)
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Self::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tree(&self) -> Option<&Tree> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_commit(&self) -> Option<&Commit> {
        match self {
            Self::Commit(c) => Some(c),
            _ => None,
        }
    }
}
