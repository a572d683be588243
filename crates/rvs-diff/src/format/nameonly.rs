//! `--name-only` and `--name-status` renderings of the tree-diff stream.

use bstr::ByteSlice;

use crate::tree::TreeChange;

/// One path per line.
pub fn name_only(changes: &[TreeChange]) -> String {
    let mut out = String::new();
    for change in changes {
        out.push_str(&change.path.to_str_lossy());
        out.push('\n');
    }
    out
}

/// `<status-letter>\t<path>` per line.
pub fn name_status(changes: &[TreeChange]) -> String {
    let mut out = String::new();
    for change in changes {
        out.push(change.kind.letter());
        out.push('\t');
        out.push_str(&change.path.to_str_lossy());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;

    use crate::tree::ChangeKind;

    fn change(kind: ChangeKind, path: &str) -> TreeChange {
        TreeChange {
            kind,
            path: BString::from(path),
            old: None,
            new: None,
        }
    }

    #[test]
    fn renders_names_and_statuses() {
        let changes = vec![
            change(ChangeKind::Added, "a.txt"),
            change(ChangeKind::Modified, "src/lib.rs"),
            change(ChangeKind::Deleted, "gone"),
        ];
        assert_eq!(name_only(&changes), "a.txt\nsrc/lib.rs\ngone\n");
        assert_eq!(name_status(&changes), "A\ta.txt\nM\tsrc/lib.rs\nD\tgone\n");
    }
}
