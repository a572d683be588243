//! Shared test harness for rvs-cli integration tests.
//!
//! Provides a process runner with fully pinned identity and timestamp
//! environment (deterministic OIDs across machines), assertion helpers,
//! and scratch-repository builders.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured output from running the binary.
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn assert_success(&self) -> &Self {
        assert_eq!(
            self.exit_code, 0,
            "expected success\nstdout:\n{}\nstderr:\n{}",
            self.stdout, self.stderr,
        );
        self
    }

    pub fn assert_exit(&self, code: i32) -> &Self {
        assert_eq!(
            self.exit_code, code,
            "expected exit {code}\nstdout:\n{}\nstderr:\n{}",
            self.stdout, self.stderr,
        );
        self
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stdout.contains(needle),
            "stdout missing {needle:?}:\n{}",
            self.stdout,
        );
        self
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stderr.contains(needle),
            "stderr missing {needle:?}:\n{}",
            self.stderr,
        );
        self
    }
}

/// Path of the compiled `rvs` binary.
pub fn rvs_bin() -> PathBuf {
    let mut path = std::env::current_exe()
        .unwrap()
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    path.push("rvs");
    path
}

/// Base epoch for pinned commit dates.
pub const EPOCH: u64 = 1234567890;

fn pin_env(cmd: &mut Command, date: &str) {
    cmd.env("RVS_AUTHOR_NAME", "Test Author")
        .env("RVS_AUTHOR_EMAIL", "author@example.com")
        .env("RVS_AUTHOR_DATE", date)
        .env("RVS_COMMITTER_NAME", "Test Committer")
        .env("RVS_COMMITTER_EMAIL", "committer@example.com")
        .env("RVS_COMMITTER_DATE", date)
        .env("TZ", "UTC")
        .env_remove("RVS_DIR");
}

/// Run `rvs` in `dir` with pinned date `EPOCH`.
pub fn rvs(dir: &Path, args: &[&str]) -> CommandResult {
    rvs_at(dir, args, &format!("{EPOCH} +0000"))
}

/// Run `rvs` in `dir` with an explicit `<epoch> <zone>` date.
pub fn rvs_at(dir: &Path, args: &[&str], date: &str) -> CommandResult {
    let mut cmd = Command::new(rvs_bin());
    cmd.args(args).current_dir(dir);
    pin_env(&mut cmd, date);
    let output = cmd.output().expect("failed to run rvs");
    CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(128),
    }
}

/// Monotonic date helper so later commits sort after earlier ones.
pub fn next_date(counter: &mut u64) -> String {
    *counter += 1;
    format!("{} +0000", EPOCH + *counter)
}

pub fn write_file(dir: &Path, rel: &str, content: &[u8]) {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

pub fn read_file(dir: &Path, rel: &str) -> String {
    String::from_utf8_lossy(&std::fs::read(dir.join(rel)).unwrap()).to_string()
}

/// `init` plus nothing else; HEAD is on the unborn `main`.
pub fn setup_empty_repo(dir: &Path) {
    rvs(dir, &["init"]).assert_success();
}

/// A repo with `n` commits on `main`, each adding `file_<i>.txt`.
pub fn setup_linear_history(dir: &Path, n: usize) {
    setup_empty_repo(dir);
    let mut counter = 0;
    for i in 0..n {
        let name = format!("file_{i}.txt");
        write_file(dir, &name, format!("content {i}\n").as_bytes());
        let date = next_date(&mut counter);
        rvs_at(dir, &["add", &name], &date).assert_success();
        rvs_at(dir, &["commit", "-m", &format!("commit {i}")], &date).assert_success();
    }
}

/// Base file `A\nB\nC\n`; branch `x` changes line 2 to B1, branch `y` to
/// B2. HEAD is left on `x`.
pub fn setup_conflicting_branches(dir: &Path) {
    setup_empty_repo(dir);
    let mut counter = 0;

    write_file(dir, "f.txt", b"A\nB\nC\n");
    let date = next_date(&mut counter);
    rvs_at(dir, &["add", "f.txt"], &date).assert_success();
    rvs_at(dir, &["commit", "-m", "base"], &date).assert_success();

    rvs(dir, &["checkout", "-b", "x"]).assert_success();
    write_file(dir, "f.txt", b"A\nB1\nC\n");
    let date = next_date(&mut counter);
    rvs_at(dir, &["add", "f.txt"], &date).assert_success();
    rvs_at(dir, &["commit", "-m", "change on x"], &date).assert_success();

    rvs(dir, &["checkout", "-b", "y", "main"]).assert_success();
    write_file(dir, "f.txt", b"A\nB2\nC\n");
    let date = next_date(&mut counter);
    rvs_at(dir, &["add", "f.txt"], &date).assert_success();
    rvs_at(dir, &["commit", "-m", "change on y"], &date).assert_success();

    rvs(dir, &["checkout", "x"]).assert_success();
}

/// The commit OID a ref file holds.
pub fn read_ref(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(".rvs").join(name))
        .unwrap()
        .trim()
        .to_string()
}

/// Resolve HEAD (following a symbolic ref) to a commit OID.
pub fn head_oid(dir: &Path) -> String {
    let head = read_ref(dir, "HEAD");
    match head.strip_prefix("ref: ") {
        Some(target) => read_ref(dir, target),
        None => head,
    }
}
