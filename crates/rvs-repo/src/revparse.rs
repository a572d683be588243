//! Revision parsing: `HEAD`, branch names, full/abbreviated OIDs, and the
//! `~N` / `^` ancestry suffixes.

use rvs_hash::ObjectId;
use rvs_ref::RefName;
use rvs_store::StoreError;

use crate::{RepoError, Repository};

/// Resolve a revision expression to a commit OID.
///
/// The base is tried as `HEAD`, a branch short name, a full ref name, and
/// finally a full or abbreviated (≥ 4 hex chars) object id. Suffixes walk
/// first parents: `~N` by N steps, `^` by one.
pub fn resolve(repo: &Repository, spec: &str) -> Result<ObjectId, RepoError> {
    let (base, suffixes) = split_suffixes(spec);
    if base.is_empty() {
        return Err(RepoError::UnknownRev(spec.to_string()));
    }

    let mut oid = resolve_base(repo, base, spec)?;
    for steps in suffixes {
        for _ in 0..steps {
            let commit = repo.store().read_commit(&oid)?;
            oid = *commit
                .first_parent()
                .ok_or_else(|| RepoError::UnknownRev(spec.to_string()))?;
        }
    }
    Ok(oid)
}

/// Resolve a revision down to its tree OID.
pub fn resolve_to_tree(repo: &Repository, spec: &str) -> Result<ObjectId, RepoError> {
    let commit = resolve(repo, spec)?;
    Ok(repo.store().read_commit(&commit)?.tree)
}

/// Split `main~2^~1` into the base name and parent-walk step counts.
fn split_suffixes(spec: &str) -> (&str, Vec<usize>) {
    let bytes = spec.as_bytes();
    let mut cut = bytes.len();
    let mut suffixes = Vec::new();

    let mut i = bytes.len();
    loop {
        // Consume one trailing `~N` or `^` at a time.
        let digits_start = {
            let mut j = i;
            while j > 0 && bytes[j - 1].is_ascii_digit() {
                j -= 1;
            }
            j
        };
        if digits_start > 0 && bytes[digits_start - 1] == b'~' {
            let n: usize = spec[digits_start..i].parse().unwrap_or(1);
            suffixes.push(n);
            i = digits_start - 1;
            cut = i;
            continue;
        }
        if i > 0 && bytes[i - 1] == b'^' {
            suffixes.push(1);
            i -= 1;
            cut = i;
            continue;
        }
        break;
    }

    suffixes.reverse();
    (&spec[..cut], suffixes)
}

fn resolve_base(repo: &Repository, base: &str, full_spec: &str) -> Result<ObjectId, RepoError> {
    // HEAD and other worktree-local refs.
    if base == "HEAD" {
        return repo
            .head()?
            .oid
            .ok_or_else(|| RepoError::UnknownRev(full_spec.to_string()));
    }

    // A branch short name, then a full ref name.
    if let Ok(name) = RefName::branch(base) {
        if let Some(oid) = repo.refs().resolve(&name)? {
            return Ok(oid);
        }
    }
    if let Ok(name) = RefName::new(base) {
        if let Some(oid) = repo.refs().resolve(&name)? {
            return Ok(oid);
        }
    }

    // A full or abbreviated object id.
    if base.len() >= 4 && base.len() <= ObjectId::HEX_LEN {
        match repo.store().resolve_prefix(base) {
            Ok(oid) => return Ok(oid),
            Err(StoreError::Ambiguous { prefix }) => {
                return Err(RepoError::AmbiguousRev(prefix));
            }
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Err(RepoError::UnknownRev(full_spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{commit_file, init_repo};

    #[test]
    fn split_parses_suffix_grammar() {
        assert_eq!(split_suffixes("HEAD"), ("HEAD", vec![]));
        assert_eq!(split_suffixes("HEAD~2"), ("HEAD", vec![2]));
        assert_eq!(split_suffixes("HEAD^"), ("HEAD", vec![1]));
        assert_eq!(split_suffixes("main~1^"), ("main", vec![1, 1]));
        assert_eq!(split_suffixes("HEAD~"), ("HEAD", vec![1]));
        assert_eq!(split_suffixes("v1.0~3"), ("v1.0", vec![3]));
    }

    #[test]
    fn resolves_head_branch_and_prefix() {
        let (_dir, repo) = init_repo();
        let c1 = commit_file(&repo, "f.txt", b"one\n", "first");
        let c2 = commit_file(&repo, "f.txt", b"two\n", "second");

        assert_eq!(resolve(&repo, "HEAD").unwrap(), c2);
        assert_eq!(resolve(&repo, "main").unwrap(), c2);
        assert_eq!(resolve(&repo, "refs/heads/main").unwrap(), c2);
        assert_eq!(resolve(&repo, "HEAD~1").unwrap(), c1);
        assert_eq!(resolve(&repo, "HEAD^").unwrap(), c1);
        assert_eq!(resolve(&repo, &c1.to_hex()).unwrap(), c1);
        assert_eq!(resolve(&repo, &c2.to_hex()[..8]).unwrap(), c2);
    }

    #[test]
    fn walking_past_the_root_is_unknown() {
        let (_dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"one\n", "first");
        assert!(matches!(
            resolve(&repo, "HEAD~5").unwrap_err(),
            RepoError::UnknownRev(_)
        ));
    }

    #[test]
    fn nonsense_is_unknown() {
        let (_dir, repo) = init_repo();
        commit_file(&repo, "f.txt", b"one\n", "first");
        assert!(matches!(
            resolve(&repo, "does-not-exist").unwrap_err(),
            RepoError::UnknownRev(_)
        ));
    }
}
