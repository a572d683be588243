use std::fmt;

use bstr::{BStr, BString, ByteSlice};

use crate::RefError;

/// A validated reference name, e.g. `HEAD` or `refs/heads/main`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefName(BString);

/// Bytes forbidden anywhere in a ref name.
const FORBIDDEN: &[u8] = b" ~^:?*[\\";

/// Names valid without a `refs/` prefix.
const SPECIAL: &[&str] = &["HEAD", "MERGE_HEAD", "ORIG_HEAD"];

impl RefName {
    /// Validate and wrap a full ref name.
    pub fn new(name: impl Into<BString>) -> Result<Self, RefError> {
        let name = name.into();
        validate(&name)?;
        Ok(Self(name))
    }

    /// Build `refs/heads/<branch>` from a branch's short name.
    pub fn branch(short: impl AsRef<[u8]>) -> Result<Self, RefError> {
        let mut full = BString::from("refs/heads/");
        full.extend_from_slice(short.as_ref());
        Self::new(full)
    }

    /// The short name: `main` for `refs/heads/main`, otherwise unchanged.
    pub fn short(&self) -> &BStr {
        self.0
            .strip_prefix(b"refs/heads/")
            .map(|s| s.as_bstr())
            .unwrap_or(self.0.as_bstr())
    }

    pub fn is_branch(&self) -> bool {
        self.0.starts_with(b"refs/heads/")
    }

    pub fn as_bstr(&self) -> &BStr {
        self.0.as_bstr()
    }

    pub fn as_str(&self) -> &str {
        // Validation rejects non-ASCII control bytes but not high bytes;
        // every name rvs itself creates is ASCII.
        std::str::from_utf8(&self.0).unwrap_or("<non-utf8 ref>")
    }
}

impl AsRef<BStr> for RefName {
    fn as_ref(&self) -> &BStr {
        self.0.as_bstr()
    }
}

impl fmt::Display for RefName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn validate(name: &[u8]) -> Result<(), RefError> {
    let shown = || String::from_utf8_lossy(name).into_owned();

    if name.is_empty() {
        return Err(RefError::InvalidName("empty name".into()));
    }
    if SPECIAL.iter().any(|s| s.as_bytes() == name) {
        return Ok(());
    }
    if name[0] == b'-' {
        return Err(RefError::InvalidName(format!("'{}': starts with '-'", shown())));
    }
    if name[0] == b'/' || name.last() == Some(&b'/') {
        return Err(RefError::InvalidName(format!(
            "'{}': leading or trailing '/'",
            shown()
        )));
    }
    if name.find(b"..").is_some() {
        return Err(RefError::InvalidName(format!("'{}': contains '..'", shown())));
    }
    if name.find(b"//").is_some() {
        return Err(RefError::InvalidName(format!("'{}': contains '//'", shown())));
    }
    if name.find(b"@{").is_some() {
        return Err(RefError::InvalidName(format!("'{}': contains '@{{'", shown())));
    }
    if name.ends_with(b".") || name.ends_with(b".lock") {
        return Err(RefError::InvalidName(format!("'{}': bad suffix", shown())));
    }
    for &b in name {
        if b < 0x20 || b == 0x7f {
            return Err(RefError::InvalidName(format!(
                "'{}': contains control byte",
                shown()
            )));
        }
        if FORBIDDEN.contains(&b) {
            return Err(RefError::InvalidName(format!(
                "'{}': contains '{}'",
                shown(),
                b as char
            )));
        }
    }
    Ok(())
}
