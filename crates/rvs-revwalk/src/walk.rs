use std::collections::{BinaryHeap, HashSet};

use rvs_hash::ObjectId;
use rvs_object::Commit;
use rvs_store::ObjectStore;

use crate::WalkError;

/// Queue entry ordered by committer date, newest first; ties break toward
/// the larger OID so the order is fully deterministic.
struct Pending {
    oid: ObjectId,
    date: i64,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.date == other.date && self.oid == other.oid
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.oid.cmp(&other.oid))
    }
}

/// History iterator: yields commits reachable from the start point, newest
/// committer date first.
pub struct RevWalk<'a> {
    store: &'a ObjectStore,
    queue: BinaryHeap<Pending>,
    seen: HashSet<ObjectId>,
}

impl<'a> RevWalk<'a> {
    /// Start a walk at `tip`.
    pub fn new(store: &'a ObjectStore, tip: &ObjectId) -> Result<Self, WalkError> {
        let mut walk = Self {
            store,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
        };
        walk.enqueue(tip)?;
        Ok(walk)
    }

    fn enqueue(&mut self, oid: &ObjectId) -> Result<(), WalkError> {
        if !self.seen.insert(*oid) {
            return Ok(());
        }
        let commit = self.store.read_commit(oid)?;
        self.queue.push(Pending {
            oid: *oid,
            date: commit.committer.when.seconds,
        });
        Ok(())
    }
}

impl Iterator for RevWalk<'_> {
    type Item = Result<(ObjectId, Commit), WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.queue.pop()?;
        let commit = match self.store.read_commit(&next.oid) {
            Ok(c) => c,
            Err(e) => return Some(Err(e.into())),
        };
        for parent in &commit.parents {
            if let Err(e) = self.enqueue(parent) {
                return Some(Err(e));
            }
        }
        Some(Ok((next.oid, commit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge_base::tests::{commit, store_in};

    #[test]
    fn linear_history_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let c1 = commit(&store, &[], 100, "one");
        let c2 = commit(&store, &[c1], 200, "two");
        let c3 = commit(&store, &[c2], 300, "three");

        let oids: Vec<ObjectId> = RevWalk::new(&store, &c3)
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(oids, vec![c3, c2, c1]);
    }

    #[test]
    fn merge_history_visits_each_commit_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let base = commit(&store, &[], 100, "base");
        let left = commit(&store, &[base], 200, "left");
        let right = commit(&store, &[base], 250, "right");
        let merge = commit(&store, &[left, right], 300, "merge");

        let oids: Vec<ObjectId> = RevWalk::new(&store, &merge)
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(oids, vec![merge, right, left, base]);
    }

    #[test]
    fn yields_commit_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        let c1 = commit(&store, &[], 100, "subject line");

        let items: Vec<(ObjectId, Commit)> = RevWalk::new(&store, &c1)
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].1.summary(), "subject line");
    }
}
