//! Status oracle: answers questions about one working copy by asking `git`.
//!
//! Nothing in here returns an error for a broken or half-configured repository. Each fact
//! degrades on its own: a missing remote is `None`, an undeterminable branch is
//! `Branch::Unknown`, an uncountable comparison is `divergence: None`.
pub mod git;

use std::path::Path;

use tracing::instrument;

pub use git::GitRunner;

use crate::model::{
    Branch, Divergence, HeadCommit, RemoteSet, RepositoryHandle, StatusRecord, ORIGIN, UPSTREAM,
};

/// Ref written by `git fetch <url> HEAD`.
pub const FETCH_HEAD: &str = "FETCH_HEAD";

/// Branch names tried, in order, when a remote's HEAD cannot be resolved.
const FALLBACK_DEFAULT_BRANCHES: &[&str] = &["main", "master"];

#[derive(Debug, Clone)]
pub struct GitOracle {
    git: GitRunner,
    fetch: bool,
}

impl GitOracle {
    pub fn new(git: GitRunner, fetch: bool) -> Self {
        Self { git, fetch }
    }

    fn dir<'a>(&self, handle: &'a RepositoryHandle) -> &'a Path {
        handle.path()
    }

    /// URL of a named remote. Exit status 1 from `git config --get` means "not set".
    pub fn remote_url(&self, handle: &RepositoryHandle, name: &str) -> Option<String> {
        let key = format!("remote.{name}.url");
        let out = self
            .git
            .run(self.dir(handle), &["config", "--get", key.as_str()])?;
        if out.success() {
            Some(out.stdout.trim().to_string())
        } else {
            None
        }
    }

    pub fn remotes(&self, handle: &RepositoryHandle) -> RemoteSet {
        RemoteSet {
            origin_url: self.remote_url(handle, ORIGIN),
            upstream_url: self.remote_url(handle, UPSTREAM),
        }
    }

    pub fn current_branch(&self, handle: &RepositoryHandle) -> Branch {
        let dir = self.dir(handle);
        if let Some(name) = self
            .git
            .stdout(dir, &["symbolic-ref", "--quiet", "--short", "HEAD"])
            .filter(|s| !s.is_empty())
        {
            return Branch::Named(name);
        }
        if self.resolve_commit(handle, "HEAD").is_some() {
            Branch::Detached
        } else {
            Branch::Unknown
        }
    }

    pub fn head_commit(&self, handle: &RepositoryHandle) -> Option<HeadCommit> {
        let raw = self
            .git
            .stdout(self.dir(handle), &["log", "-1", "--format=%h%x00%s"])?;
        parse_head_line(&raw)
    }

    /// Tracked-file modifications relative to HEAD (staged or not). Untracked files do not count.
    pub fn is_dirty(&self, handle: &RepositoryHandle) -> bool {
        match self
            .git
            .exit_code(self.dir(handle), &["diff", "--quiet", "HEAD", "--"])
        {
            Some(0) => false,
            Some(1) => true,
            _ => false,
        }
    }

    /// Refresh a remote's tracking refs. Failure is tolerated and reported as `false`.
    #[instrument(level = "debug", skip(self, handle), fields(repo = %handle.name()))]
    pub fn fetch(&self, handle: &RepositoryHandle, remote: &str) -> bool {
        if !self.fetch {
            return false;
        }
        let ok = self
            .git
            .run_network(self.dir(handle), &["fetch", "--quiet", "--no-tags", remote])
            .is_some_and(|o| o.success());
        if !ok {
            tracing::debug!(remote, "fetch failed; counting against local refs");
        }
        ok
    }

    /// Fetch the default branch of a URL that is not a configured remote into `FETCH_HEAD`.
    /// Returns `false` when fetching is disabled or the fetch failed, in which case
    /// `FETCH_HEAD` does not describe `url`.
    #[instrument(level = "debug", skip(self, handle), fields(repo = %handle.name()))]
    pub fn fetch_url(&self, handle: &RepositoryHandle, url: &str) -> bool {
        if !self.fetch || url.is_empty() || url.starts_with('-') {
            return false;
        }
        let ok = self
            .git
            .run_network(self.dir(handle), &["fetch", "--quiet", "--no-tags", url, "HEAD"])
            .is_some_and(|o| o.success());
        if !ok {
            tracing::debug!(url, "fetch of declared upstream failed");
        }
        ok
    }

    /// Full commit id of a ref, if it resolves to a commit.
    pub fn resolve_commit(&self, handle: &RepositoryHandle, refname: &str) -> Option<String> {
        let rev = format!("{refname}^{{commit}}");
        self.git
            .stdout(
                self.dir(handle),
                &["rev-parse", "--verify", "--quiet", rev.as_str()],
            )
            .filter(|s| !s.is_empty())
    }

    /// Default branch of a remote, resolved per remote (never assumed to be a fixed name
    /// unless every dynamic lookup failed and a conventional branch exists locally).
    pub fn default_branch(&self, handle: &RepositoryHandle, remote: &str) -> Option<String> {
        let dir = self.dir(handle);
        let head_ref = format!("refs/remotes/{remote}/HEAD");
        if let Some(short) = self
            .git
            .stdout(dir, &["symbolic-ref", "--quiet", "--short", head_ref.as_str()])
        {
            if let Some(b) = strip_remote_prefix(&short, remote) {
                return Some(b.to_string());
            }
        }
        if self.fetch {
            if let Some(out) = self
                .git
                .run_network(dir, &["ls-remote", "--symref", remote, "HEAD"])
            {
                if let Some(b) = out.stdout_trimmed().and_then(parse_symref_head) {
                    return Some(b);
                }
            }
        }
        FALLBACK_DEFAULT_BRANCHES
            .iter()
            .find(|b| {
                self.resolve_commit(handle, &format!("refs/remotes/{remote}/{b}"))
                    .is_some()
            })
            .map(|b| b.to_string())
    }

    /// Number of commits in a `A..B` range.
    pub fn count_commits(&self, handle: &RepositoryHandle, range: &str) -> Option<u32> {
        self.git
            .stdout(self.dir(handle), &["rev-list", "--count", range])
            .and_then(|s| s.parse().ok())
    }

    /// Ahead/behind of HEAD against `reference`, from a single symmetric-difference walk so
    /// both counts are known or unknown together.
    pub fn divergence(&self, handle: &RepositoryHandle, reference: &str) -> Option<Divergence> {
        let range = format!("HEAD...{reference}");
        let raw = self.git.stdout(
            self.dir(handle),
            &["rev-list", "--left-right", "--count", range.as_str()],
        )?;
        parse_left_right(&raw)
    }

    /// Refresh the reference remote and name its default-branch tracking ref.
    /// Returns (`remote/branch`, fetch succeeded).
    pub fn reference_ref(
        &self,
        handle: &RepositoryHandle,
        remotes: &RemoteSet,
    ) -> (Option<String>, bool) {
        let Some(remote) = remotes.reference_remote() else {
            return (None, false);
        };
        let fetched = self.fetch(handle, remote);
        let reference = self
            .default_branch(handle, remote)
            .map(|b| format!("{remote}/{b}"));
        (reference, fetched)
    }

    pub fn status(&self, handle: &RepositoryHandle) -> StatusRecord {
        let remotes = self.remotes(handle);
        self.status_with_remotes(handle, remotes)
    }

    /// Status when the remotes are already known (the walker resolved them).
    #[instrument(level = "debug", skip(self, handle, remotes), fields(repo = %handle.name()))]
    pub fn status_with_remotes(&self, handle: &RepositoryHandle, remotes: RemoteSet) -> StatusRecord {
        let branch = self.current_branch(handle);
        let head_commit = self.head_commit(handle);
        let dirty = self.is_dirty(handle);
        let (reference, fetched) = self.reference_ref(handle, &remotes);
        let divergence = reference
            .as_deref()
            .and_then(|r| self.divergence(handle, r));
        if divergence.is_none() {
            tracing::debug!(reference = ?reference, "ahead/behind unknown");
        }
        StatusRecord {
            name: handle.name().to_string(),
            path: handle.path().to_path_buf(),
            branch,
            head_commit,
            dirty,
            divergence,
            remotes,
            reference,
            fetched,
        }
    }
}

fn parse_head_line(raw: &str) -> Option<HeadCommit> {
    let (hash, subject) = match raw.split_once('\0') {
        Some((h, s)) => (h, s),
        None => (raw, ""),
    };
    let hc = HeadCommit::new(hash, subject);
    if hc.short_hash.is_empty() {
        None
    } else {
        Some(hc)
    }
}

/// `upstream/main` -> `main` for remote `upstream`.
fn strip_remote_prefix<'a>(short: &'a str, remote: &str) -> Option<&'a str> {
    short
        .strip_prefix(remote)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|b| !b.is_empty())
}

/// Branch from `ls-remote --symref <remote> HEAD` output (`ref: refs/heads/main\tHEAD`).
fn parse_symref_head(out: &str) -> Option<String> {
    out.lines().find_map(|line| {
        let rest = line.strip_prefix("ref:")?;
        let target = rest.split_whitespace().next()?;
        target
            .strip_prefix("refs/heads/")
            .filter(|b| !b.is_empty())
            .map(str::to_string)
    })
}

/// `rev-list --left-right --count HEAD...ref` prints "<only-in-HEAD>\t<only-in-ref>".
fn parse_left_right(raw: &str) -> Option<Divergence> {
    let mut it = raw.split_whitespace();
    let ahead = it.next()?.parse().ok()?;
    let behind = it.next()?.parse().ok()?;
    if it.next().is_some() {
        return None;
    }
    Some(Divergence { ahead, behind })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_left_right() {
        assert_eq!(
            parse_left_right("2\t5\n"),
            Some(Divergence { ahead: 2, behind: 5 })
        );
        assert_eq!(parse_left_right("0 0"), Some(Divergence::default()));
        assert_eq!(parse_left_right("3"), None);
        assert_eq!(parse_left_right("x\t1"), None);
        assert_eq!(parse_left_right(""), None);
    }

    #[test]
    fn test_parse_symref_head() {
        let out = "ref: refs/heads/trunk\tHEAD\n3f2a0c1e9b7d\tHEAD";
        assert_eq!(parse_symref_head(out).as_deref(), Some("trunk"));
        assert_eq!(parse_symref_head("3f2a0c1e9b7d\tHEAD"), None);
    }

    #[test]
    fn test_strip_remote_prefix() {
        assert_eq!(strip_remote_prefix("upstream/main", "upstream"), Some("main"));
        assert_eq!(
            strip_remote_prefix("origin/release/2.x", "origin"),
            Some("release/2.x")
        );
        assert_eq!(strip_remote_prefix("upstreamx/main", "upstream"), None);
        assert_eq!(strip_remote_prefix("upstream/", "upstream"), None);
    }

    #[test]
    fn test_parse_head_line_sanitizes_subject() {
        let hc = parse_head_line("1a2b3c4\0feat: add\u{1b}[1m thing").expect("head");
        assert_eq!(hc.short_hash, "1a2b3c4");
        assert_eq!(hc.subject, "feat: add[1m thing");
        assert!(parse_head_line("").is_none());
        assert_eq!(
            parse_head_line("1a2b3c4").map(|h| h.subject),
            Some(String::new())
        );
    }
}
