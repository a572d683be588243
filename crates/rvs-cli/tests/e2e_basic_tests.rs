//! End-to-end coverage of init, add, commit, status, log, show, ls-files,
//! ls-tree, rm, and restore.

mod common;

use common::*;

const HELLO_BLOB: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

#[test]
fn init_creates_repository_layout() {
    let dir = tempfile::tempdir().unwrap();
    let result = rvs(dir.path(), &["init"]);
    result.assert_success().assert_stdout_contains("Initialized empty rvs repository");

    let rvs_dir = dir.path().join(".rvs");
    assert!(rvs_dir.join("objects").is_dir());
    assert!(rvs_dir.join("refs/heads").is_dir());
    assert_eq!(read_ref(dir.path(), "HEAD"), "ref: refs/heads/main");
    assert!(rvs_dir.join("config").is_file());
}

#[test]
fn first_commit_produces_git_compatible_objects() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "hello.txt", b"Hello\n");

    rvs(dir.path(), &["add", "hello.txt"]).assert_success();
    rvs(dir.path(), &["commit", "-m", "first"])
        .assert_success()
        .assert_stdout_contains("[main (root-commit)");

    // The blob landed under its git-compatible address.
    let blob_path = dir
        .path()
        .join(".rvs/objects")
        .join(&HELLO_BLOB[..2])
        .join(&HELLO_BLOB[2..]);
    assert!(blob_path.is_file());

    // refs/heads/main now points at a commit whose tree holds the entry.
    let commit = read_ref(dir.path(), "refs/heads/main");
    assert_eq!(commit.len(), 40);
    rvs(dir.path(), &["ls-tree", "HEAD"])
        .assert_success()
        .assert_stdout_contains(&format!("100644 blob {HELLO_BLOB}\thello.txt"));
}

#[test]
fn add_of_unchanged_file_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "f.txt", b"stable\n");

    rvs(dir.path(), &["add", "f.txt"]).assert_success();
    let before = std::fs::read(dir.path().join(".rvs/index")).unwrap();

    rvs(dir.path(), &["add", "f.txt"]).assert_success();
    let after = std::fs::read(dir.path().join(".rvs/index")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn commit_with_nothing_staged_fails() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    rvs(dir.path(), &["commit", "-m", "empty"])
        .assert_exit(1)
        .assert_stdout_contains("nothing to commit, working tree clean");
}

#[test]
fn commit_allow_empty_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    rvs_at(
        dir.path(),
        &["commit", "--allow-empty", "-m", "marker"],
        "1234568000 +0000",
    )
    .assert_success();
    rvs(dir.path(), &["log", "--oneline"])
        .assert_success()
        .assert_stdout_contains("marker");
}

#[test]
fn path_normalization_stages_one_entry() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    std::fs::create_dir_all(dir.path().join("sub")).unwrap();
    write_file(dir.path(), "a.txt", b"content\n");

    rvs(dir.path(), &["add", "./sub/../a.txt"]).assert_success();

    let ls = rvs(dir.path(), &["ls-files"]);
    ls.assert_success();
    assert_eq!(ls.stdout, "a.txt\n");

    let status = rvs(dir.path(), &["status", "--short"]);
    status.assert_success();
    assert_eq!(status.stdout.matches("a.txt").count(), 1);
}

#[test]
fn status_reports_three_sets() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    write_file(dir.path(), "staged.txt", b"staged\n");
    rvs(dir.path(), &["add", "staged.txt"]).assert_success();
    write_file(dir.path(), "file_0.txt", b"modified\n");
    write_file(dir.path(), "untracked.txt", b"untracked\n");

    let long = rvs(dir.path(), &["status"]);
    long.assert_success()
        .assert_stdout_contains("On branch main")
        .assert_stdout_contains("Changes to be committed:")
        .assert_stdout_contains("new file:   staged.txt")
        .assert_stdout_contains("Changes not staged for commit:")
        .assert_stdout_contains("modified:   file_0.txt")
        .assert_stdout_contains("Untracked files:")
        .assert_stdout_contains("untracked.txt");

    let short = rvs(dir.path(), &["status", "--short"]);
    short.assert_success();
    assert_eq!(short.stdout, " M file_0.txt\nA  staged.txt\n?? untracked.txt\n");
}

#[test]
fn status_on_clean_repo() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    rvs(dir.path(), &["status"])
        .assert_success()
        .assert_stdout_contains("nothing to commit, working tree clean");
}

#[test]
fn status_before_first_commit() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    rvs(dir.path(), &["status"])
        .assert_success()
        .assert_stdout_contains("No commits yet");
}

#[test]
fn log_oneline_and_limit() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 3);

    let all = rvs(dir.path(), &["log", "--oneline"]);
    all.assert_success();
    let lines: Vec<&str> = all.stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("(HEAD -> main) commit 2"));
    assert!(lines[1].ends_with("commit 1"));
    assert!(lines[2].ends_with("commit 0"));

    let limited = rvs(dir.path(), &["log", "--oneline", "-n", "1"]);
    limited.assert_success();
    assert_eq!(limited.stdout.lines().count(), 1);
}

#[test]
fn log_full_format() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    let log = rvs(dir.path(), &["log"]);
    log.assert_success()
        .assert_stdout_contains("commit ")
        .assert_stdout_contains("(HEAD -> main)")
        .assert_stdout_contains("Author: Test Author <author@example.com>")
        .assert_stdout_contains("Date:   ")
        .assert_stdout_contains("    commit 0");
}

#[test]
fn log_on_unborn_branch_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    rvs(dir.path(), &["log"])
        .assert_exit(128)
        .assert_stderr_contains("does not have any commits yet");
}

#[test]
fn show_prints_commit_and_patch() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "f.txt", b"one\n");
    rvs(dir.path(), &["add", "f.txt"]).assert_success();
    rvs(dir.path(), &["commit", "-m", "add f"]).assert_success();

    let show = rvs(dir.path(), &["show", "HEAD"]);
    show.assert_success()
        .assert_stdout_contains("    add f")
        .assert_stdout_contains("diff --git a/f.txt b/f.txt")
        .assert_stdout_contains("new file mode 100644")
        .assert_stdout_contains("+one");

    let name_status = rvs(dir.path(), &["show", "HEAD", "--name-status"]);
    name_status.assert_success().assert_stdout_contains("A\tf.txt");

    let stat = rvs(dir.path(), &["show", "HEAD", "--stat"]);
    stat.assert_success()
        .assert_stdout_contains("f.txt | 1 +")
        .assert_stdout_contains("1 file changed, 1 insertion(+)");
}

#[test]
fn diff_unstaged_and_cached() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "f.txt", b"a\nb\nc\n");
    rvs(dir.path(), &["add", "f.txt"]).assert_success();
    rvs(dir.path(), &["commit", "-m", "base"]).assert_success();

    // Unstaged edit shows in plain diff, not --cached.
    write_file(dir.path(), "f.txt", b"a\nB\nc\n");
    rvs(dir.path(), &["diff"])
        .assert_success()
        .assert_stdout_contains("-b")
        .assert_stdout_contains("+B");
    let cached = rvs(dir.path(), &["diff", "--cached"]);
    cached.assert_success();
    assert_eq!(cached.stdout, "");

    // After staging it flips.
    rvs(dir.path(), &["add", "f.txt"]).assert_success();
    let plain = rvs(dir.path(), &["diff"]);
    plain.assert_success();
    assert_eq!(plain.stdout, "");
    rvs(dir.path(), &["diff", "--cached"])
        .assert_success()
        .assert_stdout_contains("+B");
}

#[test]
fn diff_tree_raw_and_name_status() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 2);

    let raw = rvs(dir.path(), &["diff-tree", "-r", "HEAD"]);
    raw.assert_success();
    let head = head_oid(dir.path());
    assert!(raw.stdout.starts_with(&head));
    assert!(raw.stdout.contains(":000000 100644"));
    assert!(raw.stdout.contains("A\tfile_1.txt"));

    let quiet = rvs(dir.path(), &["diff-tree", "--no-commit-id", "--name-status", "-r", "HEAD"]);
    quiet.assert_success();
    assert_eq!(quiet.stdout, "A\tfile_1.txt\n");
}

#[test]
fn ls_files_lists_sorted_paths() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "b.txt", b"b\n");
    write_file(dir.path(), "a.txt", b"a\n");
    write_file(dir.path(), "sub/c.txt", b"c\n");
    rvs(dir.path(), &["add", "."]).assert_success();

    let ls = rvs(dir.path(), &["ls-files"]);
    ls.assert_success();
    assert_eq!(ls.stdout, "a.txt\nb.txt\nsub/c.txt\n");
}

#[test]
fn ls_tree_recursive() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), "top.txt", b"t\n");
    write_file(dir.path(), "sub/inner.txt", b"i\n");
    rvs(dir.path(), &["add", "."]).assert_success();
    rvs(dir.path(), &["commit", "-m", "tree"]).assert_success();

    let flat = rvs(dir.path(), &["ls-tree", "HEAD"]);
    flat.assert_success()
        .assert_stdout_contains("040000 tree ")
        .assert_stdout_contains("\tsub")
        .assert_stdout_contains("\ttop.txt");

    let deep = rvs(dir.path(), &["ls-tree", "-r", "HEAD"]);
    deep.assert_success().assert_stdout_contains("\tsub/inner.txt");
    assert!(!deep.stdout.contains("040000"));
}

#[test]
fn rm_removes_from_index_and_worktree() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    rvs(dir.path(), &["rm", "file_0.txt"])
        .assert_success()
        .assert_stdout_contains("rm 'file_0.txt'");
    assert!(!dir.path().join("file_0.txt").exists());

    let ls = rvs(dir.path(), &["ls-files"]);
    assert_eq!(ls.stdout, "");
}

#[test]
fn rm_cached_keeps_worktree_file() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);

    rvs(dir.path(), &["rm", "--cached", "file_0.txt"]).assert_success();
    assert!(dir.path().join("file_0.txt").exists());
    assert_eq!(rvs(dir.path(), &["ls-files"]).stdout, "");
}

#[test]
fn rm_refuses_modified_file_without_force() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    write_file(dir.path(), "file_0.txt", b"changed\n");

    rvs(dir.path(), &["rm", "file_0.txt"])
        .assert_exit(1)
        .assert_stderr_contains("local modifications");
    assert!(dir.path().join("file_0.txt").exists());

    rvs(dir.path(), &["rm", "-f", "file_0.txt"]).assert_success();
    assert!(!dir.path().join("file_0.txt").exists());
}

#[test]
fn restore_discards_worktree_changes() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    write_file(dir.path(), "file_0.txt", b"scratch\n");

    rvs(dir.path(), &["restore", "file_0.txt"]).assert_success();
    assert_eq!(read_file(dir.path(), "file_0.txt"), "content 0\n");
}

#[test]
fn restore_staged_unstages() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    write_file(dir.path(), "new.txt", b"new\n");
    rvs(dir.path(), &["add", "new.txt"]).assert_success();

    rvs(dir.path(), &["restore", "--staged", "new.txt"]).assert_success();

    // Unstaged again: the file stays on disk but leaves the index.
    assert!(dir.path().join("new.txt").exists());
    let status = rvs(dir.path(), &["status", "--short"]);
    assert_eq!(status.stdout, "?? new.txt\n");
}

#[test]
fn add_honors_ignore_rules_for_directories() {
    let dir = tempfile::tempdir().unwrap();
    setup_empty_repo(dir.path());
    write_file(dir.path(), ".rvsignore", b"*.log\n");
    write_file(dir.path(), "keep.txt", b"keep\n");
    write_file(dir.path(), "noise.log", b"noise\n");

    rvs(dir.path(), &["add", "."]).assert_success();
    let ls = rvs(dir.path(), &["ls-files"]);
    assert_eq!(ls.stdout, ".rvsignore\nkeep.txt\n");

    // Naming the ignored file explicitly still stages it.
    rvs(dir.path(), &["add", "noise.log"]).assert_success();
    assert!(rvs(dir.path(), &["ls-files"]).stdout.contains("noise.log"));
}

#[test]
fn add_stages_deletions() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    std::fs::remove_file(dir.path().join("file_0.txt")).unwrap();

    rvs(dir.path(), &["add", "."]).assert_success();
    let status = rvs(dir.path(), &["status", "--short"]);
    assert_eq!(status.stdout, "D  file_0.txt\n");
}

#[test]
fn unknown_revision_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    setup_linear_history(dir.path(), 1);
    rvs(dir.path(), &["show", "no-such-rev"])
        .assert_exit(128)
        .assert_stderr_contains("unknown revision");
}

#[test]
fn outside_a_repository_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    rvs(dir.path(), &["status"])
        .assert_exit(128)
        .assert_stderr_contains("not an rvs repository");
}
