//! Ignore patterns, in git's grammar.
//!
//! Patterns come from `.rvsignore` at the worktree root. Supported syntax:
//! blank lines and `#` comments, `!` negation (last match wins), trailing
//! `/` for directory-only patterns, `/`-anchored patterns, `*`, `?`,
//! character classes, and `**` spanning directories. A `*` or `?` never
//! crosses a `/`.

use std::path::Path;

use bstr::{BStr, BString, ByteSlice};

use crate::IndexError;

#[derive(Debug, Clone)]
struct Pattern {
    glob: BString,
    negated: bool,
    dir_only: bool,
    /// `/`-containing patterns match from the root; others match any
    /// path component.
    anchored: bool,
}

/// An ordered list of ignore patterns; later patterns override earlier ones.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    patterns: Vec<Pattern>,
}

impl IgnoreList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load patterns from an ignore file; a missing file adds nothing.
    pub fn load(path: &Path) -> Result<Self, IndexError> {
        let mut list = Self::new();
        match std::fs::read(path) {
            Ok(content) => list.add_bytes(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IndexError::Io(e)),
        }
        Ok(list)
    }

    /// Parse and append patterns from raw ignore-file content.
    pub fn add_bytes(&mut self, content: &[u8]) {
        for line in content.lines() {
            if let Some(pattern) = parse_line(line) {
                self.patterns.push(pattern);
            }
        }
    }

    /// Whether `path` (normalized, worktree-relative) is ignored.
    pub fn is_ignored(&self, path: &BStr, is_dir: bool) -> bool {
        let mut ignored = false;
        for pat in &self.patterns {
            if pat.dir_only && !is_dir {
                continue;
            }
            if matches(pat, path) {
                ignored = !pat.negated;
            }
        }
        ignored
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn parse_line(mut line: &[u8]) -> Option<Pattern> {
    if line.is_empty() || line[0] == b'#' {
        return None;
    }
    // Trailing unescaped spaces are not part of the pattern.
    while line.len() > 1 && line.last() == Some(&b' ') && line[line.len() - 2] != b'\\' {
        line = &line[..line.len() - 1];
    }

    let negated = line[0] == b'!';
    if negated {
        line = &line[1..];
    }
    if line.first() == Some(&b'\\') && matches!(line.get(1), Some(b'#') | Some(b'!')) {
        line = &line[1..];
    }

    let dir_only = line.last() == Some(&b'/');
    if dir_only {
        line = &line[..line.len() - 1];
    }
    if line.is_empty() {
        return None;
    }

    let anchored = line.contains(&b'/');
    let glob = if line[0] == b'/' { &line[1..] } else { line };
    if glob.is_empty() {
        return None;
    }

    Some(Pattern {
        glob: BString::from(glob),
        negated,
        dir_only,
        anchored,
    })
}

fn matches(pat: &Pattern, path: &BStr) -> bool {
    if pat.anchored {
        return glob_match(&pat.glob, path);
    }
    // Unanchored: the pattern may match the whole path or any basename.
    if glob_match(&pat.glob, path) {
        return true;
    }
    match path.rfind_byte(b'/') {
        Some(cut) => glob_match(&pat.glob, path[cut + 1..].as_bstr()),
        None => false,
    }
}

/// Glob matching with pathname semantics: `*` and `?` stop at `/`, a
/// `**` component spans any number of components.
pub(crate) fn glob(glob: &[u8], text: &[u8]) -> bool {
    glob_match(glob, text)
}

fn glob_match(glob: &[u8], text: &[u8]) -> bool {
    // `**/` at the start, `/**/` in the middle, `/**` at the end.
    if let Some(rest) = glob.strip_prefix(b"**/") {
        if glob_match(rest, text) {
            return true;
        }
        return text
            .iter()
            .enumerate()
            .filter(|(_, &b)| b == b'/')
            .any(|(i, _)| glob_match(rest, &text[i + 1..]));
    }

    match glob.first() {
        None => text.is_empty(),
        Some(b'*') => {
            if glob.starts_with(b"**") {
                // `a/**` style: match anything, slashes included.
                let rest = &glob[2..];
                (0..=text.len()).any(|i| glob_match(rest, &text[i..]))
            } else {
                let rest = &glob[1..];
                // `*` consumes any run of non-slash bytes.
                (0..=text.len())
                    .take_while(|&i| i == 0 || text[i - 1] != b'/')
                    .any(|i| glob_match(rest, &text[i..]))
            }
        }
        Some(b'?') => match text.first() {
            Some(&b) if b != b'/' => glob_match(&glob[1..], &text[1..]),
            _ => false,
        },
        Some(b'[') => match class_match(&glob[1..], text.first().copied()) {
            Some(rest) => glob_match(rest, &text[1..]),
            None => false,
        },
        Some(&g) => match text.first() {
            Some(&b) if b == g => glob_match(&glob[1..], &text[1..]),
            _ => false,
        },
    }
}

/// Match one byte against a `[...]` class; returns the glob remainder after
/// the closing bracket on success.
fn class_match(class: &[u8], byte: Option<u8>) -> Option<&[u8]> {
    let byte = byte?;
    if byte == b'/' {
        return None;
    }
    let (negated, mut i) = if class.first() == Some(&b'!') {
        (true, 1)
    } else {
        (false, 0)
    };

    let mut hit = false;
    let mut first = true;
    while i < class.len() {
        let c = class[i];
        if c == b']' && !first {
            return if hit != negated {
                Some(&class[i + 1..])
            } else {
                None
            };
        }
        first = false;
        if i + 2 < class.len() && class[i + 1] == b'-' && class[i + 2] != b']' {
            if (class[i]..=class[i + 2]).contains(&byte) {
                hit = true;
            }
            i += 3;
        } else {
            if c == byte {
                hit = true;
            }
            i += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(content: &[u8]) -> IgnoreList {
        let mut l = IgnoreList::new();
        l.add_bytes(content);
        l
    }

    fn ignored(l: &IgnoreList, path: &str) -> bool {
        l.is_ignored(BStr::new(path.as_bytes()), false)
    }

    #[test]
    fn star_suffix() {
        let l = list(b"*.o\n");
        assert!(ignored(&l, "main.o"));
        assert!(ignored(&l, "deep/dir/main.o"));
        assert!(!ignored(&l, "main.c"));
    }

    #[test]
    fn star_does_not_cross_slash() {
        let l = list(b"build/*.o\n");
        assert!(ignored(&l, "build/main.o"));
        assert!(!ignored(&l, "build/sub/main.o"));
    }

    #[test]
    fn negation_reincludes() {
        let l = list(b"*.log\n!keep.log\n");
        assert!(ignored(&l, "debug.log"));
        assert!(!ignored(&l, "keep.log"));
    }

    #[test]
    fn directory_only() {
        let l = list(b"target/\n");
        assert!(l.is_ignored(BStr::new(b"target"), true));
        assert!(!l.is_ignored(BStr::new(b"target"), false));
    }

    #[test]
    fn anchored_pattern() {
        let l = list(b"/top.txt\n");
        assert!(ignored(&l, "top.txt"));
        assert!(!ignored(&l, "sub/top.txt"));
    }

    #[test]
    fn double_star_prefix() {
        let l = list(b"**/generated.rs\n");
        assert!(ignored(&l, "generated.rs"));
        assert!(ignored(&l, "a/b/generated.rs"));
    }

    #[test]
    fn double_star_middle() {
        let l = list(b"src/**/tests\n");
        assert!(ignored(&l, "src/tests"));
        assert!(ignored(&l, "src/a/b/tests"));
        assert!(!ignored(&l, "other/tests"));
    }

    #[test]
    fn question_mark_and_class() {
        let l = list(b"file.?\ntmp[0-9].txt\n");
        assert!(ignored(&l, "file.c"));
        assert!(!ignored(&l, "file.rs"));
        assert!(ignored(&l, "tmp3.txt"));
        assert!(!ignored(&l, "tmpx.txt"));
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let l = list(b"# a comment\n\n*.tmp\n");
        assert!(ignored(&l, "x.tmp"));
        assert!(!ignored(&l, "# a comment"));
    }

    #[test]
    fn escaped_bang_is_literal() {
        let l = list(b"\\!important\n");
        assert!(ignored(&l, "!important"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let l = IgnoreList::load(Path::new("/nonexistent/.rvsignore")).unwrap();
        assert!(l.is_empty());
    }
}
