//! End-to-end coverage of branch, checkout (all four modes), and reset.

mod common;

use common::*;

#[test]
fn branch_create_list_delete() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 2);

    rvs(dir.path(), &["branch", "feature"]).assert_success();
    rvs(dir.path(), &["branch", "older", "HEAD~1"]).assert_success();

    let list = rvs(dir.path(), &["branch"]);
    list.assert_success();
    assert_eq!(list.stdout, "  feature\n* main\n  older\n");

    // Both are merged into HEAD, so -d works.
    rvs(dir.path(), &["branch", "-d", "older"])
        .assert_success()
        .assert_stdout_contains("Deleted branch older");

    // A branch ahead of HEAD needs -D.
    rvs(dir.path(), &["checkout", "feature"]).assert_success();
    write_file(dir.path(), "extra.txt", b"extra\n");
    rvs(dir.path(), &["add", "extra.txt"]).assert_success();
    rvs_at(dir.path(), &["commit", "-m", "ahead"], "1234568000 +0000").assert_success();
    rvs(dir.path(), &["checkout", "main"]).assert_success();

    rvs(dir.path(), &["branch", "-d", "feature"])
        .assert_exit(1)
        .assert_stderr_contains("not fully merged");
    rvs(dir.path(), &["branch", "-D", "feature"]).assert_success();
}

#[test]
fn duplicate_branch_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    rvs(dir.path(), &["branch", "dup"]).assert_success();
    rvs(dir.path(), &["branch", "dup"])
        .assert_exit(1)
        .assert_stderr_contains("already exists");
}

#[test]
fn invalid_branch_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    for bad in ["has space", "double..dot", "-leading"] {
        let result = rvs(dir.path(), &["branch", bad]);
        assert_ne!(result.exit_code, 0, "accepted bad name {bad:?}");
    }
}

#[test]
fn checkout_branch_switches_tree_and_head() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 2);
    rvs(dir.path(), &["branch", "old", "HEAD~1"]).assert_success();

    rvs(dir.path(), &["checkout", "old"])
        .assert_success()
        .assert_stdout_contains("Switched to branch 'old'");
    assert_eq!(read_ref(dir.path(), "HEAD"), "ref: refs/heads/old");
    assert!(dir.path().join("file_0.txt").exists());
    assert!(!dir.path().join("file_1.txt").exists());
}

#[test]
fn checkout_detached_head() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    let commit = head_oid(dir.path());

    rvs(dir.path(), &["checkout", "--detach", "HEAD"])
        .assert_success()
        .assert_stdout_contains("HEAD is now at");

    // HEAD now holds the OID directly.
    assert_eq!(read_ref(dir.path(), "HEAD"), commit);
    rvs(dir.path(), &["status"])
        .assert_success()
        .assert_stdout_contains(&format!("HEAD detached at {}", &commit[..7]));
}

#[test]
fn checkout_new_branch_with_start_point() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 2);

    rvs(dir.path(), &["checkout", "-b", "topic", "HEAD~1"])
        .assert_success()
        .assert_stdout_contains("Switched to branch 'topic'");
    assert!(!dir.path().join("file_1.txt").exists());

    // -B resets an existing branch.
    rvs(dir.path(), &["checkout", "main"]).assert_success();
    rvs(dir.path(), &["checkout", "-b", "topic"])
        .assert_exit(1)
        .assert_stderr_contains("already exists");
    rvs(dir.path(), &["checkout", "-B", "topic"]).assert_success();
    assert_eq!(head_oid(dir.path()), read_ref(dir.path(), "refs/heads/main"));
}

#[test]
fn checkout_refuses_to_overwrite_local_changes() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    let mut counter = 0;

    write_file(dir.path(), "f.txt", b"v1\n");
    let d1 = next_date(&mut counter);
    rvs_at(dir.path(), &["add", "f.txt"], &d1).assert_success();
    rvs_at(dir.path(), &["commit", "-m", "v1"], &d1).assert_success();

    write_file(dir.path(), "f.txt", b"v2\n");
    let d2 = next_date(&mut counter);
    rvs_at(dir.path(), &["add", "f.txt"], &d2).assert_success();
    rvs_at(dir.path(), &["commit", "-m", "v2"], &d2).assert_success();

    write_file(dir.path(), "f.txt", b"precious local edit\n");
    rvs(dir.path(), &["checkout", "--detach", "HEAD~1"])
        .assert_exit(1)
        .assert_stderr_contains("would be overwritten by checkout");
    assert_eq!(read_file(dir.path(), "f.txt"), "precious local edit\n");
}

#[test]
fn checkout_paths_restores_without_moving_head() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    let mut counter = 0;

    write_file(dir.path(), "a.txt", b"old a\n");
    write_file(dir.path(), "b.txt", b"old b\n");
    let d1 = next_date(&mut counter);
    rvs_at(dir.path(), &["add", "."], &d1).assert_success();
    rvs_at(dir.path(), &["commit", "-m", "old"], &d1).assert_success();

    write_file(dir.path(), "a.txt", b"new a\n");
    write_file(dir.path(), "b.txt", b"new b\n");
    let d2 = next_date(&mut counter);
    rvs_at(dir.path(), &["add", "."], &d2).assert_success();
    rvs_at(dir.path(), &["commit", "-m", "new"], &d2).assert_success();
    let head_before = head_oid(dir.path());

    rvs(dir.path(), &["checkout", "HEAD~1", "--", "a.txt"]).assert_success();

    assert_eq!(read_file(dir.path(), "a.txt"), "old a\n");
    assert_eq!(read_file(dir.path(), "b.txt"), "new b\n");
    assert_eq!(head_oid(dir.path()), head_before);

    // The restored version is also staged.
    let status = rvs(dir.path(), &["status", "--short"]);
    assert_eq!(status.stdout, "M  a.txt\n");
}

#[test]
fn reset_soft_moves_head_only() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 3);
    let target = rvs(dir.path(), &["log", "--oneline"]);
    target.assert_success();

    rvs(dir.path(), &["reset", "--soft", "HEAD~1"]).assert_success();

    // The last commit's file is still staged and on disk.
    assert!(dir.path().join("file_2.txt").exists());
    let status = rvs(dir.path(), &["status", "--short"]);
    assert_eq!(status.stdout, "A  file_2.txt\n");
}

#[test]
fn reset_mixed_rewrites_index() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 2);

    rvs(dir.path(), &["reset", "HEAD~1"]).assert_success();

    // Still on disk, but no longer staged.
    assert!(dir.path().join("file_1.txt").exists());
    let status = rvs(dir.path(), &["status", "--short"]);
    assert_eq!(status.stdout, "?? file_1.txt\n");
}

#[test]
fn reset_hard_restores_everything() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 3);
    let first = {
        // Walk back two steps to find C1's OID via the log.
        let log = rvs(dir.path(), &["log", "--oneline"]);
        log.assert_success();
        log.stdout.lines().last().unwrap().split(' ').next().unwrap().to_string()
    };

    rvs(dir.path(), &["reset", "--hard", "HEAD~2"])
        .assert_success()
        .assert_stdout_contains("HEAD is now at");

    // main points at C1; index and worktree hold exactly C1's files.
    assert!(read_ref(dir.path(), "refs/heads/main").starts_with(&first));
    assert!(dir.path().join("file_0.txt").exists());
    assert!(!dir.path().join("file_1.txt").exists());
    assert!(!dir.path().join("file_2.txt").exists());
    let status = rvs(dir.path(), &["status"]);
    status.assert_success().assert_stdout_contains("nothing to commit, working tree clean");
}

#[test]
fn round_trip_reproduces_files_byte_identically() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());

    let files: [(&str, &[u8]); 3] = [
        ("a.bin", b"\x00\x01\x02binary"),
        ("b.txt", b"text with\nlines\n"),
        ("nested/c.txt", b"no trailing newline"),
    ];
    for (path, data) in &files {
        write_file(dir.path(), path, data);
    }
    rvs(dir.path(), &["add", "."]).assert_success();
    rvs(dir.path(), &["commit", "-m", "snapshot"]).assert_success();

    // Wipe the worktree, then restore it from the commit.
    for (path, _) in &files {
        std::fs::remove_file(dir.path().join(path)).unwrap();
    }
    rvs(dir.path(), &["reset", "--hard", "HEAD"]).assert_success();

    for (path, data) in &files {
        assert_eq!(std::fs::read(dir.path().join(path)).unwrap(), *data);
    }
}
