use bstr::{BStr, BString, ByteSlice};
use rvs_hash::ObjectId;
use rvs_utils::date::Signature;

use crate::ObjectError;

/// An immutable record of a tree plus parents, identities, and a message.
///
/// Header lines appear in the serialized payload in this order: `tree`,
/// zero or more `parent`, `author`, `committer`, then a blank line and the
/// message. Headers written by other tools (gpgsig and friends) are kept
/// verbatim so foreign commits keep their identity through a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
    pub author: Signature,
    pub committer: Signature,
    /// Unrecognized headers, preserved byte-for-byte (multi-line values keep
    /// their continuation encoding folded out).
    pub extra_headers: Vec<(BString, BString)>,
    pub message: BString,
}

impl Commit {
    /// Parse a commit payload (no framing header).
    pub fn parse(payload: &[u8]) -> Result<Self, ObjectError> {
        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;
        let mut extra_headers = Vec::new();

        let mut pos = 0;
        while pos < payload.len() {
            if payload[pos] == b'\n' {
                pos += 1;
                break;
            }

            let line_end = payload[pos..]
                .find_byte(b'\n')
                .map(|p| p + pos)
                .unwrap_or(payload.len());
            let line = &payload[pos..line_end];

            let space = line.find_byte(b' ').ok_or_else(|| {
                ObjectError::InvalidHeader(format!("malformed line '{}'", line.as_bstr()))
            })?;
            let (key, value) = (&line[..space], &line[space + 1..]);

            match key {
                b"tree" => tree = Some(parse_oid_value(value)?),
                b"parent" => parents.push(parse_oid_value(value)?),
                b"author" => author = Some(parse_signature(value)?),
                b"committer" => committer = Some(parse_signature(value)?),
                _ => {
                    // Multi-line values continue on lines starting with a space.
                    let mut folded = Vec::from(value);
                    let mut next = line_end + 1;
                    while next < payload.len() && payload[next] == b' ' {
                        let cont_end = payload[next..]
                            .find_byte(b'\n')
                            .map(|p| p + next)
                            .unwrap_or(payload.len());
                        folded.push(b'\n');
                        folded.extend_from_slice(&payload[next + 1..cont_end]);
                        next = cont_end + 1;
                    }
                    extra_headers.push((BString::from(key), BString::from(folded)));
                    pos = next;
                    continue;
                }
            }
            pos = line_end + 1;
        }

        let message = BString::from(&payload[pos.min(payload.len())..]);

        Ok(Self {
            tree: tree.ok_or(ObjectError::MissingCommitField { field: "tree" })?,
            parents,
            author: author.ok_or(ObjectError::MissingCommitField { field: "author" })?,
            committer: committer.ok_or(ObjectError::MissingCommitField { field: "committer" })?,
            extra_headers,
            message,
        })
    }

    /// Serialize to payload bytes (no framing header).
    pub fn to_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.extend_from_slice(b"tree ");
        out.extend_from_slice(self.tree.to_hex().as_bytes());
        out.push(b'\n');

        for parent in &self.parents {
            out.extend_from_slice(b"parent ");
            out.extend_from_slice(parent.to_hex().as_bytes());
            out.push(b'\n');
        }

        out.extend_from_slice(b"author ");
        out.extend_from_slice(&self.author.to_bytes());
        out.push(b'\n');

        out.extend_from_slice(b"committer ");
        out.extend_from_slice(&self.committer.to_bytes());
        out.push(b'\n');

        for (key, value) in &self.extra_headers {
            out.extend_from_slice(key);
            out.push(b' ');
            for (i, line) in value.split(|&b| b == b'\n').enumerate() {
                if i > 0 {
                    out.extend_from_slice(b"\n ");
                }
                out.extend_from_slice(line);
            }
            out.push(b'\n');
        }

        out.push(b'\n');
        out.extend_from_slice(&self.message);
        out
    }

    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// First line of the message.
    pub fn summary(&self) -> &BStr {
        match self.message.find_byte(b'\n') {
            Some(pos) => self.message[..pos].as_bstr(),
            None => self.message.as_bstr(),
        }
    }
}

fn parse_oid_value(value: &[u8]) -> Result<ObjectId, ObjectError> {
    let hex = std::str::from_utf8(value)
        .map_err(|_| ObjectError::InvalidHeader("non-UTF-8 OID".into()))?;
    Ok(ObjectId::from_hex(hex)?)
}

fn parse_signature(value: &[u8]) -> Result<Signature, ObjectError> {
    Signature::parse(BStr::new(value)).map_err(|e| ObjectError::InvalidSignature(e.to_string()))
}
