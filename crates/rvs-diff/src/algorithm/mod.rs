//! Line-level diffing: edit scripts and hunk assembly.

mod myers;

use bstr::BString;

use crate::{DiffLine, Hunk};

/// One step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Line present on both sides.
    Equal,
    /// Line present only in the new sequence.
    Insert,
    /// Line present only in the old sequence.
    Delete,
}

/// An edit referencing lines by index.
///
/// `old_index` is meaningful for `Equal` and `Delete`; `new_index` for
/// `Equal` and `Insert`. The other index records the position the cursor
/// had reached on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub op: EditOp,
    pub old_index: usize,
    pub new_index: usize,
}

/// Split bytes into lines, keeping each line's terminator. A final line
/// without `\n` is kept as-is, so the split concatenates back to the input.
pub fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        if b == b'\n' {
            lines.push(&data[start..=i]);
            start = i + 1;
        }
    }
    if start < data.len() {
        lines.push(&data[start..]);
    }
    lines
}

/// DJB2a line hash for cheap inequality checks.
pub(crate) fn line_hash(line: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for &b in line {
        hash = hash.wrapping_mul(33) ^ u64::from(b);
    }
    hash
}

/// Compute the edit script turning `old` into `new`, line by line.
pub fn diff_edits(old: &[u8], new: &[u8]) -> Vec<Edit> {
    myers::diff(&split_lines(old), &split_lines(new))
}

/// Turn an edit script into hunks with `context` lines of surrounding
/// context; nearby changes whose gap fits within the shared context are
/// merged into one hunk.
pub fn hunks(old: &[u8], new: &[u8], context: u32) -> Vec<Hunk> {
    let old_lines = split_lines(old);
    let new_lines = split_lines(new);
    let edits = myers::diff(&old_lines, &new_lines);
    assemble_hunks(&edits, &old_lines, &new_lines, context as usize)
}

fn assemble_hunks(
    edits: &[Edit],
    old_lines: &[&[u8]],
    new_lines: &[&[u8]],
    context: usize,
) -> Vec<Hunk> {
    // Index ranges of consecutive non-Equal edits.
    let mut changes: Vec<(usize, usize)> = Vec::new();
    let mut i = 0;
    while i < edits.len() {
        if edits[i].op == EditOp::Equal {
            i += 1;
            continue;
        }
        let start = i;
        while i < edits.len() && edits[i].op != EditOp::Equal {
            i += 1;
        }
        changes.push((start, i));
    }
    if changes.is_empty() {
        return Vec::new();
    }

    // Merge ranges whose gap is covered by shared context.
    let mut merged: Vec<(usize, usize)> = vec![changes[0]];
    for &(start, end) in &changes[1..] {
        let last = merged.last_mut().unwrap();
        if start - last.1 <= 2 * context {
            last.1 = end;
        } else {
            merged.push((start, end));
        }
    }

    merged
        .into_iter()
        .map(|(start, end)| {
            let window_start = start.saturating_sub(context);
            let window_end = (end + context).min(edits.len());
            build_hunk(&edits[window_start..window_end], old_lines, new_lines)
        })
        .collect()
}

fn build_hunk(window: &[Edit], old_lines: &[&[u8]], new_lines: &[&[u8]]) -> Hunk {
    let mut lines = Vec::with_capacity(window.len());
    let mut old_count = 0u32;
    let mut new_count = 0u32;

    for edit in window {
        match edit.op {
            EditOp::Equal => {
                lines.push(DiffLine::Context(BString::from(old_lines[edit.old_index])));
                old_count += 1;
                new_count += 1;
            }
            EditOp::Delete => {
                lines.push(DiffLine::Deletion(BString::from(old_lines[edit.old_index])));
                old_count += 1;
            }
            EditOp::Insert => {
                lines.push(DiffLine::Addition(BString::from(new_lines[edit.new_index])));
                new_count += 1;
            }
        }
    }

    // Hunk headers are 1-based; a side with no lines keeps the 0-based
    // position before which the change applies (git's `-0,0` form).
    let first = &window[0];
    let old_start = if old_count == 0 {
        first.old_index as u32
    } else {
        first.old_index as u32 + 1
    };
    let new_start = if new_count == 0 {
        first.new_index as u32
    } else {
        first.new_index as u32 + 1
    };

    Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_preserves_terminators() {
        assert_eq!(split_lines(b"a\nb\n"), vec![b"a\n".as_slice(), b"b\n"]);
        assert_eq!(split_lines(b"a\nb"), vec![b"a\n".as_slice(), b"b"]);
        assert!(split_lines(b"").is_empty());
    }

    #[test]
    fn no_change_no_hunks() {
        assert!(hunks(b"a\nb\nc\n", b"a\nb\nc\n", 3).is_empty());
    }

    #[test]
    fn single_line_change() {
        let got = hunks(b"a\nb\nc\n", b"a\nX\nc\n", 3);
        assert_eq!(got.len(), 1);
        let hunk = &got[0];
        assert_eq!((hunk.old_start, hunk.old_count), (1, 3));
        assert_eq!((hunk.new_start, hunk.new_count), (1, 3));
        assert_eq!(
            hunk.lines,
            vec![
                DiffLine::Context(BString::from("a\n")),
                DiffLine::Deletion(BString::from("b\n")),
                DiffLine::Addition(BString::from("X\n")),
                DiffLine::Context(BString::from("c\n")),
            ]
        );
    }

    #[test]
    fn distant_changes_make_two_hunks() {
        let old = b"1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n13\n14\n15\n";
        let new = b"one\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n12\n13\n14\nfifteen\n";
        let got = hunks(old, new, 3);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].old_start, 1);
        assert_eq!(got[1].old_start, 12);
    }

    #[test]
    fn close_changes_merge_into_one_hunk() {
        let old = b"1\n2\n3\n4\n5\n";
        let new = b"one\n2\n3\n4\nfive\n";
        let got = hunks(old, new, 3);
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn creation_hunk_uses_zero_old_start() {
        let got = hunks(b"", b"new\n", 3);
        assert_eq!(got.len(), 1);
        assert_eq!((got[0].old_start, got[0].old_count), (0, 0));
        assert_eq!((got[0].new_start, got[0].new_count), (1, 1));
    }

    fn apply_edits(edits: &[Edit], old: &[&[u8]], new: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for edit in edits {
            match edit.op {
                EditOp::Equal => out.extend_from_slice(old[edit.old_index]),
                EditOp::Insert => out.extend_from_slice(new[edit.new_index]),
                EditOp::Delete => {}
            }
        }
        out
    }

    proptest! {
        // Replaying the edit script over the old lines reconstructs the new
        // file exactly.
        #[test]
        fn edit_script_reconstructs_new(
            old in proptest::collection::vec("[ab]{0,3}\n", 0..12),
            new in proptest::collection::vec("[ab]{0,3}\n", 0..12),
        ) {
            let old_bytes: Vec<u8> = old.concat().into_bytes();
            let new_bytes: Vec<u8> = new.concat().into_bytes();
            let old_lines = split_lines(&old_bytes);
            let new_lines = split_lines(&new_bytes);
            let edits = diff_edits(&old_bytes, &new_bytes);
            prop_assert_eq!(apply_edits(&edits, &old_lines, &new_lines), new_bytes);
        }
    }
}
