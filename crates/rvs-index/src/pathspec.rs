//! Pathspec matching for `add`, `rm`, `restore`, and friends.
//!
//! A pathspec is a set of normalized worktree-relative paths. Each element
//! matches itself, everything under it when it names a directory, or, when
//! it contains glob characters, whatever the ignore-style glob matches.
//! The empty set (or `.` from the worktree root, which normalizes to the
//! empty path) matches everything.

use bstr::{BStr, BString, ByteSlice};

use crate::ignore;

#[derive(Debug, Clone, Default)]
pub struct Pathspec {
    specs: Vec<BString>,
}

impl Pathspec {
    /// Build from already-normalized paths.
    pub fn new(specs: Vec<BString>) -> Self {
        Self { specs }
    }

    /// Matches every path.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_all(&self) -> bool {
        self.specs.is_empty() || self.specs.iter().any(|s| s.is_empty())
    }

    /// Whether `path` is selected by this pathspec.
    pub fn matches(&self, path: &BStr) -> bool {
        if self.is_all() {
            return true;
        }
        self.specs.iter().any(|spec| {
            if spec.as_bstr() == path {
                return true;
            }
            // Directory prefix: "sub" selects "sub/anything".
            if path.len() > spec.len()
                && path.starts_with(spec.as_bytes())
                && path[spec.len()] == b'/'
            {
                return true;
            }
            if spec.iter().any(|&b| matches!(b, b'*' | b'?' | b'[')) {
                return ignore::glob(spec.as_bytes(), path.as_bytes());
            }
            false
        })
    }

    /// The individual specs (for reporting unmatched arguments).
    pub fn specs(&self) -> &[BString] {
        &self.specs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(items: &[&str]) -> Pathspec {
        Pathspec::new(items.iter().map(|s| BString::from(*s)).collect())
    }

    fn hit(p: &Pathspec, path: &str) -> bool {
        p.matches(BStr::new(path.as_bytes()))
    }

    #[test]
    fn empty_matches_all() {
        assert!(Pathspec::all().matches(BStr::new(b"anything")));
        assert!(spec(&[""]).matches(BStr::new(b"anything")));
    }

    #[test]
    fn literal_match() {
        let p = spec(&["a.txt"]);
        assert!(hit(&p, "a.txt"));
        assert!(!hit(&p, "b.txt"));
        assert!(!hit(&p, "a.txt.bak"));
    }

    #[test]
    fn directory_prefix_match() {
        let p = spec(&["src"]);
        assert!(hit(&p, "src/lib.rs"));
        assert!(hit(&p, "src/deep/mod.rs"));
        assert!(hit(&p, "src"));
        assert!(!hit(&p, "srcfile"));
    }

    #[test]
    fn glob_match() {
        let p = spec(&["*.rs"]);
        assert!(hit(&p, "lib.rs"));
        assert!(!hit(&p, "lib.c"));
    }
}
