//! Thin `git` invocation layer. Every call is addressed with `-C <repo>` and bounded by a timeout;
//! no call relies on the process working directory.
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::util::{ExecOutput, ExecRequest, ExecService};

#[derive(Debug, Clone)]
pub struct GitRunner {
    exec: ExecService,
    git: PathBuf,
    network_timeout: Duration,
}

impl GitRunner {
    pub fn new(git: impl Into<PathBuf>, timeout: Duration, network_timeout: Duration) -> Self {
        Self {
            exec: ExecService::new(timeout),
            git: git.into(),
            network_timeout,
        }
    }

    /// Locate `git` on PATH.
    pub fn locate(timeout: Duration, network_timeout: Duration) -> Result<Self> {
        let git = which::which("git").context("git not found in PATH")?;
        Ok(Self::new(git, timeout, network_timeout))
    }

    pub fn git_path(&self) -> &Path {
        &self.git
    }

    fn request(&self, repo: &Path, args: &[&str]) -> ExecRequest {
        ExecRequest::new(self.git.as_os_str())
            .arg("-C")
            .arg(repo.as_os_str())
            .args(args.iter().copied())
            // Never block on credential prompts; never take optional index locks.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_OPTIONAL_LOCKS", "0")
            .env("LC_ALL", "C")
    }

    fn finish(&self, repo: &Path, args: &[&str], res: Result<ExecOutput>) -> Option<ExecOutput> {
        match res {
            Ok(out) => {
                tracing::trace!(repo = %repo.display(), ?args, elapsed = ?out.duration, "git finished");
                if !out.success() {
                    tracing::debug!(
                        repo = %repo.display(),
                        ?args,
                        code = ?out.code(),
                        stderr = %out.stderr.trim(),
                        "git exited unsuccessfully"
                    );
                }
                Some(out)
            }
            Err(e) => {
                tracing::debug!(repo = %repo.display(), ?args, error = %e, "git invocation failed");
                None
            }
        }
    }

    /// Run a local git command. None when git could not be run or timed out.
    pub fn run(&self, repo: &Path, args: &[&str]) -> Option<ExecOutput> {
        let res = self.exec.run(self.request(repo, args));
        self.finish(repo, args, res)
    }

    /// Run a git command that talks to a remote, with the longer network timeout.
    pub fn run_network(&self, repo: &Path, args: &[&str]) -> Option<ExecOutput> {
        let res = self
            .exec
            .run(self.request(repo, args).timeout(self.network_timeout));
        self.finish(repo, args, res)
    }

    /// Trimmed stdout of a successful local command.
    pub fn stdout(&self, repo: &Path, args: &[&str]) -> Option<String> {
        self.run(repo, args)
            .and_then(|o| o.stdout_trimmed().map(str::to_string))
    }

    /// Exit code of a local command (None when it could not run or was killed).
    pub fn exit_code(&self, repo: &Path, args: &[&str]) -> Option<i32> {
        self.run(repo, args).and_then(|o| o.code())
    }
}
