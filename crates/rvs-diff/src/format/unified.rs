//! Unified patch output: `diff --git` headers, `index` lines, and `@@`
//! hunks, matching git's conventions byte for byte.

use bstr::ByteSlice;

use crate::tree::{ChangeKind, TreeChange};
use crate::{algorithm, is_binary, DiffLine, Hunk};

/// Render one changed file as a unified patch. `old_data`/`new_data` are
/// the blob contents of each side (empty for an absent side).
pub fn format_patch(
    change: &TreeChange,
    old_data: &[u8],
    new_data: &[u8],
    context: u32,
) -> String {
    let mut out = String::new();
    let path = change.path.to_str_lossy();

    out.push_str(&format!("diff --git a/{path} b/{path}\n"));

    match change.kind {
        ChangeKind::Added => {
            let mode = change.new.expect("added change has a new side").mode;
            out.push_str(&format!("new file mode {:06o}\n", mode.raw()));
        }
        ChangeKind::Deleted => {
            let mode = change.old.expect("deleted change has an old side").mode;
            out.push_str(&format!("deleted file mode {:06o}\n", mode.raw()));
        }
        ChangeKind::Modified | ChangeKind::TypeChanged => {
            let (old, new) = (
                change.old.expect("modified change has an old side"),
                change.new.expect("modified change has a new side"),
            );
            if old.mode != new.mode {
                out.push_str(&format!("old mode {:06o}\n", old.mode.raw()));
                out.push_str(&format!("new mode {:06o}\n", new.mode.raw()));
            }
        }
    }

    let old_short = change.old.map(|v| v.oid.short());
    let new_short = change.new.map(|v| v.oid.short());
    let index_line = match (old_short, new_short, change.old, change.new) {
        (Some(o), Some(n), Some(ov), Some(nv)) if ov.mode == nv.mode => {
            format!("index {o}..{n} {:06o}\n", ov.mode.raw())
        }
        (o, n, _, _) => format!(
            "index {}..{}\n",
            o.as_deref().unwrap_or("0000000"),
            n.as_deref().unwrap_or("0000000"),
        ),
    };
    out.push_str(&index_line);

    if is_binary(old_data) || is_binary(new_data) {
        let a = if change.old.is_some() {
            format!("a/{path}")
        } else {
            "/dev/null".to_string()
        };
        let b = if change.new.is_some() {
            format!("b/{path}")
        } else {
            "/dev/null".to_string()
        };
        out.push_str(&format!("Binary files {a} and {b} differ\n"));
        return out;
    }

    let hunks = algorithm::hunks(old_data, new_data, context);
    if hunks.is_empty() {
        return out;
    }

    if change.old.is_some() {
        out.push_str(&format!("--- a/{path}\n"));
    } else {
        out.push_str("--- /dev/null\n");
    }
    if change.new.is_some() {
        out.push_str(&format!("+++ b/{path}\n"));
    } else {
        out.push_str("+++ /dev/null\n");
    }

    for hunk in &hunks {
        format_hunk(&mut out, hunk);
    }
    out
}

fn format_hunk(out: &mut String, hunk: &Hunk) {
    let side = |start: u32, count: u32| {
        if count == 1 {
            format!("{start}")
        } else {
            format!("{start},{count}")
        }
    };
    out.push_str(&format!(
        "@@ -{} +{} @@\n",
        side(hunk.old_start, hunk.old_count),
        side(hunk.new_start, hunk.new_count),
    ));

    for line in &hunk.lines {
        let (marker, content) = match line {
            DiffLine::Context(c) => (' ', c),
            DiffLine::Addition(c) => ('+', c),
            DiffLine::Deletion(c) => ('-', c),
        };
        out.push(marker);
        out.push_str(&content.to_str_lossy());
        if !content.ends_with(b"\n") {
            out.push_str("\n\\ No newline at end of file\n");
        }
    }
}
