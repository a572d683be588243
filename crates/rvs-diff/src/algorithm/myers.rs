//! Myers' O(ND) shortest edit script, per "An O(ND) Difference Algorithm
//! and Its Variations" (1986). The edit script is the complement of the
//! longest common subsequence of the two line sequences.

use super::{line_hash, Edit, EditOp};

/// Diff two line sequences into an edit script.
pub fn diff(old: &[&[u8]], new: &[&[u8]]) -> Vec<Edit> {
    // Common prefix and suffix cost nothing to peel off and keep the
    // search space small.
    let old_hashes: Vec<u64> = old.iter().map(|l| line_hash(l)).collect();
    let new_hashes: Vec<u64> = new.iter().map(|l| line_hash(l)).collect();

    let mut prefix = 0;
    while prefix < old.len()
        && prefix < new.len()
        && old_hashes[prefix] == new_hashes[prefix]
        && old[prefix] == new[prefix]
    {
        prefix += 1;
    }

    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && old_hashes[old.len() - 1 - suffix] == new_hashes[new.len() - 1 - suffix]
        && old[old.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mid_old = &old[prefix..old.len() - suffix];
    let mid_new = &new[prefix..new.len() - suffix];
    let mid_old_h = &old_hashes[prefix..old.len() - suffix];
    let mid_new_h = &new_hashes[prefix..new.len() - suffix];

    let mut edits = Vec::with_capacity(old.len().max(new.len()));
    for i in 0..prefix {
        edits.push(Edit {
            op: EditOp::Equal,
            old_index: i,
            new_index: i,
        });
    }
    for edit in shortest_edit(mid_old, mid_new, mid_old_h, mid_new_h) {
        edits.push(Edit {
            op: edit.op,
            old_index: edit.old_index + prefix,
            new_index: edit.new_index + prefix,
        });
    }
    for i in 0..suffix {
        edits.push(Edit {
            op: EditOp::Equal,
            old_index: old.len() - suffix + i,
            new_index: new.len() - suffix + i,
        });
    }
    edits
}

/// The classic forward search with a saved trace for backtracking.
fn shortest_edit(old: &[&[u8]], new: &[&[u8]], old_h: &[u64], new_h: &[u64]) -> Vec<Edit> {
    let n = old.len();
    let m = new.len();
    if n == 0 {
        return (0..m)
            .map(|j| Edit {
                op: EditOp::Insert,
                old_index: 0,
                new_index: j,
            })
            .collect();
    }
    if m == 0 {
        return (0..n)
            .map(|i| Edit {
                op: EditOp::Delete,
                old_index: i,
                new_index: 0,
            })
            .collect();
    }

    let max_d = n + m;
    let offset = max_d as isize;
    let mut v = vec![0usize; 2 * max_d + 1];
    let mut trace: Vec<Vec<usize>> = Vec::new();

    'search: for d in 0..=max_d {
        let mut row = v.clone();
        let mut k = -(d as isize);
        while k <= d as isize {
            let down = k == -(d as isize)
                || (k != d as isize
                    && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize]);
            let mut x = if down {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = (x as isize - k) as usize;

            while x < n && y < m && old_h[x] == new_h[y] && old[x] == new[y] {
                x += 1;
                y += 1;
            }
            row[(k + offset) as usize] = x;

            if x >= n && y >= m {
                trace.push(row);
                break 'search;
            }
            k += 2;
        }
        trace.push(row);
        v.clone_from(trace.last().unwrap());
    }

    backtrack(&trace, n, m, offset)
}

fn backtrack(trace: &[Vec<usize>], n: usize, m: usize, offset: isize) -> Vec<Edit> {
    let mut edits = Vec::new();
    let mut x = n;
    let mut y = m;

    for d in (0..trace.len()).rev() {
        let k = x as isize - y as isize;
        let came_down = d > 0
            && (k == -(d as isize)
                || (k != d as isize
                    && trace[d - 1][(k - 1 + offset) as usize]
                        < trace[d - 1][(k + 1 + offset) as usize]));
        let prev_k = if d == 0 {
            k
        } else if came_down {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 {
            0
        } else {
            trace[d - 1][(prev_k + offset) as usize]
        };
        let prev_y = (prev_x as isize - prev_k) as usize;

        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            edits.push(Edit {
                op: EditOp::Equal,
                old_index: x,
                new_index: y,
            });
        }

        if d > 0 {
            if came_down {
                y -= 1;
                edits.push(Edit {
                    op: EditOp::Insert,
                    old_index: x,
                    new_index: y,
                });
            } else {
                x -= 1;
                edits.push(Edit {
                    op: EditOp::Delete,
                    old_index: x,
                    new_index: y,
                });
            }
        }
    }

    edits.reverse();
    edits
}
