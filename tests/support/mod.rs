/*!
Test support helpers shared across integration tests.

- have_git(): check git availability on PATH
- git(dir, args): run git in `dir`, assert success, return trimmed stdout
- init_repo_with_default_user(dir): initialize a repo on `main` with a default identity
- commit_file(dir, name, content, msg): write, stage and commit one file
- bare_upstream(parent): a bare repository with one commit on `main`
- clone_fork(upstream, dir, origin_url): clone, then rewire remotes as a fork would have them

These helpers do not print skip messages themselves so tests keep their own
"skipping: ..." outputs.
*/

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use forkwatch::{GitOracle, GitRunner, RepositoryHandle};

/// Return true if `git` is available on PATH.
#[allow(dead_code)]
pub fn have_git() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run git with a neutral configuration; panics with stderr on failure.
#[allow(dead_code)]
pub fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(["-c", "commit.gpgsign=false", "-c", "init.defaultBranch=main"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .stdin(Stdio::null())
        .output()
        .expect("spawn git");
    assert!(
        out.status.success(),
        "git {:?} failed in {}:\n{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

/// Initialize a git repository at `dir` on branch `main` with a default identity.
#[allow(dead_code)]
pub fn init_repo_with_default_user(dir: &Path) {
    std::fs::create_dir_all(dir).expect("mkdir");
    git(dir, &["init", "-q"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(dir, &["config", "user.name", "Forkwatch Test"]);
    git(dir, &["config", "user.email", "forkwatch@example.com"]);
}

#[allow(dead_code)]
pub fn commit_file(dir: &Path, name: &str, content: &str, msg: &str) {
    std::fs::write(dir.join(name), content).expect("write");
    git(dir, &["add", "--", name]);
    git(dir, &["commit", "-q", "-m", msg]);
}

/// Bare repository `<parent>/upstream.git` whose `main` has one commit ("init").
#[allow(dead_code)]
pub fn bare_upstream(parent: &Path) -> PathBuf {
    let seed = parent.join("seed");
    init_repo_with_default_user(&seed);
    commit_file(&seed, "README.md", "hello\n", "init");
    let bare = parent.join("upstream.git");
    git(
        parent,
        &["clone", "-q", "--bare", &seed.to_string_lossy(), &bare.to_string_lossy()],
    );
    bare
}

/// Push `n` new commits to the bare upstream through a scratch clone.
#[allow(dead_code)]
pub fn advance_upstream(upstream: &Path, scratch: &Path, n: usize) {
    if !scratch.exists() {
        git(
            upstream.parent().expect("parent"),
            &["clone", "-q", &upstream.to_string_lossy(), &scratch.to_string_lossy()],
        );
        git(scratch, &["config", "user.name", "Upstream Dev"]);
        git(scratch, &["config", "user.email", "dev@example.com"]);
    }
    for i in 0..n {
        commit_file(scratch, "CHANGES.md", &format!("change {i}\n"), &format!("change {i}"));
    }
    git(scratch, &["push", "-q", "origin", "HEAD:main"]);
}

/// Clone `upstream` into `dir`; origin gets `origin_url`, `upstream` points at the bare repo
/// and is fetched once so its tracking refs exist.
#[allow(dead_code)]
pub fn clone_fork(upstream: &Path, dir: &Path, origin_url: &str) {
    git(
        upstream.parent().expect("parent"),
        &["clone", "-q", &upstream.to_string_lossy(), &dir.to_string_lossy()],
    );
    git(dir, &["config", "user.name", "Forkwatch Test"]);
    git(dir, &["config", "user.email", "forkwatch@example.com"]);
    git(dir, &["remote", "set-url", "origin", origin_url]);
    git(dir, &["remote", "add", "upstream", &upstream.to_string_lossy()]);
    git(dir, &["fetch", "-q", "upstream"]);
}

#[allow(dead_code)]
pub fn oracle(fetch: bool) -> GitOracle {
    let git = GitRunner::locate(Duration::from_secs(15), Duration::from_secs(60)).expect("git");
    GitOracle::new(git, fetch)
}

#[allow(dead_code)]
pub fn handle(dir: &Path) -> RepositoryHandle {
    RepositoryHandle::new(dir).expect("handle")
}
