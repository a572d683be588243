//! `--stat` diffstat rendering.

use bstr::ByteSlice;

/// Per-file counts feeding the diffstat.
#[derive(Debug, Clone)]
pub struct StatEntry {
    pub path: bstr::BString,
    pub additions: usize,
    pub deletions: usize,
    pub binary: bool,
}

/// Width of the +/- graph column.
const GRAPH_WIDTH: usize = 40;

/// Render git's `--stat` table: one ` path | N ++--` row per file plus the
/// closing summary line.
pub fn render(entries: &[StatEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let name_width = entries
        .iter()
        .map(|e| e.path.len())
        .max()
        .unwrap_or(0);
    let max_change = entries
        .iter()
        .map(|e| e.additions + e.deletions)
        .max()
        .unwrap_or(0)
        .max(1);

    let mut out = String::new();
    let mut total_add = 0;
    let mut total_del = 0;

    for entry in entries {
        total_add += entry.additions;
        total_del += entry.deletions;

        if entry.binary {
            out.push_str(&format!(
                " {:<name_width$} | Bin\n",
                entry.path.to_str_lossy(),
            ));
            continue;
        }

        let change = entry.additions + entry.deletions;
        // Scale the graph down only when it would overflow the column.
        let scale = |n: usize| {
            if max_change <= GRAPH_WIDTH {
                n
            } else {
                n * GRAPH_WIDTH / max_change
            }
        };
        let plus = "+".repeat(scale(entry.additions));
        let minus = "-".repeat(scale(entry.deletions));
        out.push_str(&format!(
            " {:<name_width$} | {:>change_width$} {plus}{minus}\n",
            entry.path.to_str_lossy(),
            change,
            change_width = max_change.to_string().len().min(6),
        ));
    }

    let files = entries.len();
    out.push_str(&format!(
        " {} file{} changed",
        files,
        if files == 1 { "" } else { "s" }
    ));
    if total_add > 0 {
        out.push_str(&format!(
            ", {} insertion{}(+)",
            total_add,
            if total_add == 1 { "" } else { "s" }
        ));
    }
    if total_del > 0 {
        out.push_str(&format!(
            ", {} deletion{}(-)",
            total_del,
            if total_del == 1 { "" } else { "s" }
        ));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bstr::BString;

    #[test]
    fn single_file_stat() {
        let out = render(&[StatEntry {
            path: BString::from("f.txt"),
            additions: 2,
            deletions: 1,
            binary: false,
        }]);
        assert_eq!(
            out,
            " f.txt | 3 ++-\n 1 file changed, 2 insertions(+), 1 deletion(-)\n"
        );
    }

    #[test]
    fn binary_file_shows_bin() {
        let out = render(&[StatEntry {
            path: BString::from("img"),
            additions: 0,
            deletions: 0,
            binary: true,
        }]);
        assert!(out.contains(" img | Bin\n"));
        assert!(out.contains("1 file changed\n"));
    }

    #[test]
    fn totals_and_alignment() {
        let out = render(&[
            StatEntry {
                path: BString::from("a"),
                additions: 1,
                deletions: 0,
                binary: false,
            },
            StatEntry {
                path: BString::from("longer-name"),
                additions: 0,
                deletions: 2,
                binary: false,
            },
        ]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], format!(" {:<11} | 1 +", "a"));
        assert_eq!(lines[1], " longer-name | 2 --");
        assert_eq!(lines[2], " 2 files changed, 1 insertion(+), 2 deletions(-)");
    }

    #[test]
    fn empty_input_renders_nothing() {
        assert_eq!(render(&[]), "");
    }
}
