//! The framing header shared by every object: `"<type> <length>\0"`.

use crate::{ObjectError, ObjectKind};

/// Parse a framing header. Returns `(kind, payload_length, header_length)`
/// where `header_length` includes the NUL terminator.
pub fn parse(data: &[u8]) -> Result<(ObjectKind, usize, usize), ObjectError> {
    let nul = data
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ObjectError::InvalidHeader("missing NUL terminator".into()))?;

    let header = &data[..nul];
    let space = header
        .iter()
        .position(|&b| b == b' ')
        .ok_or_else(|| ObjectError::InvalidHeader("missing space".into()))?;

    let kind = ObjectKind::from_bytes(&header[..space])?;
    let len_str = std::str::from_utf8(&header[space + 1..])
        .map_err(|_| ObjectError::InvalidHeader("non-ASCII length".into()))?;
    let payload_len: usize = len_str
        .parse()
        .map_err(|_| ObjectError::InvalidHeader(format!("bad length '{len_str}'")))?;

    Ok((kind, payload_len, nul + 1))
}

/// Write a framing header for the given kind and payload length.
pub fn write(kind: ObjectKind, payload_len: usize) -> Vec<u8> {
    format!("{} {}\0", kind, payload_len).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_blob() {
        let (kind, len, hdr) = parse(b"blob 6\0Hello\n").unwrap();
        assert_eq!(kind, ObjectKind::Blob);
        assert_eq!(len, 6);
        assert_eq!(hdr, 7);
    }

    #[test]
    fn write_then_parse() {
        let hdr = write(ObjectKind::Commit, 123);
        let (kind, len, n) = parse(&hdr).unwrap();
        assert_eq!(kind, ObjectKind::Commit);
        assert_eq!(len, 123);
        assert_eq!(n, hdr.len());
    }

    #[test]
    fn rejects_missing_nul() {
        assert!(parse(b"blob 6").is_err());
    }

    #[test]
    fn rejects_missing_space() {
        assert!(parse(b"blob6\0").is_err());
    }

    #[test]
    fn rejects_unknown_kind() {
        assert!(parse(b"tag 3\0abc").is_err());
    }

    #[test]
    fn rejects_bad_length() {
        assert!(parse(b"blob xyz\0").is_err());
    }
}
