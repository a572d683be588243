//! Object identity for rvs: the 20-byte SHA-1 `ObjectId`, hex codec, and
//! streaming hasher over framed object bytes.

pub mod hasher;
pub mod hex;
mod oid;

pub use hasher::Hasher;
pub use oid::ObjectId;

/// Errors produced by hashing and OID parsing.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("invalid hex length: expected {expected}, got {actual}")]
    InvalidHexLength { expected: usize, actual: usize },

    #[error("invalid hex character '{character}' at position {position}")]
    InvalidHex { position: usize, character: char },

    #[error("invalid digest length: expected {expected}, got {actual}")]
    InvalidDigestLength { expected: usize, actual: usize },

    #[error("SHA-1 collision attack detected")]
    Collision,
}
