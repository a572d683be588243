//! Merge-base: the lowest common ancestor of two commits.
//!
//! Both tips are expanded breadth-first in lockstep, one generation per
//! round. The first commit found reachable from both sides wins; when a
//! round surfaces several, the smallest OID is taken, so the answer is
//! deterministic and symmetric in its arguments.

use std::collections::HashSet;

use rvs_hash::ObjectId;
use rvs_store::ObjectStore;

use crate::WalkError;

/// Find the merge base of `a` and `b`, if any ancestor is shared.
pub fn merge_base(
    store: &ObjectStore,
    a: &ObjectId,
    b: &ObjectId,
) -> Result<Option<ObjectId>, WalkError> {
    if a == b {
        return Ok(Some(*a));
    }

    let mut reach_a: HashSet<ObjectId> = HashSet::from([*a]);
    let mut reach_b: HashSet<ObjectId> = HashSet::from([*b]);
    let mut frontier_a = vec![*a];
    let mut frontier_b = vec![*b];

    if reach_a.contains(b) {
        return Ok(Some(*b));
    }

    while !frontier_a.is_empty() || !frontier_b.is_empty() {
        let mut found: Vec<ObjectId> = Vec::new();

        frontier_a = expand(store, &frontier_a, &mut reach_a)?;
        for oid in &frontier_a {
            if reach_b.contains(oid) {
                found.push(*oid);
            }
        }

        frontier_b = expand(store, &frontier_b, &mut reach_b)?;
        for oid in &frontier_b {
            if reach_a.contains(oid) && !found.contains(oid) {
                found.push(*oid);
            }
        }

        if !found.is_empty() {
            found.sort();
            return Ok(Some(found[0]));
        }
    }

    Ok(None)
}

/// Whether `ancestor` is reachable from `descendant` (inclusive).
pub fn is_ancestor(
    store: &ObjectStore,
    ancestor: &ObjectId,
    descendant: &ObjectId,
) -> Result<bool, WalkError> {
    if ancestor == descendant {
        return Ok(true);
    }
    let mut seen: HashSet<ObjectId> = HashSet::from([*descendant]);
    let mut frontier = vec![*descendant];
    while !frontier.is_empty() {
        frontier = expand(store, &frontier, &mut seen)?;
        if frontier.contains(ancestor) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// One BFS generation: the unvisited parents of every frontier commit.
fn expand(
    store: &ObjectStore,
    frontier: &[ObjectId],
    seen: &mut HashSet<ObjectId>,
) -> Result<Vec<ObjectId>, WalkError> {
    let mut next = Vec::new();
    for oid in frontier {
        let commit = store.read_commit(oid)?;
        for parent in &commit.parents {
            if seen.insert(*parent) {
                next.push(*parent);
            }
        }
    }
    Ok(next)
}
