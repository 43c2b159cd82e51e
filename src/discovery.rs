//! Discovery walker: lazily finds working copies under the search roots and keeps the ones the
//! fork filter accepts.
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::classify::ForkFilter;
use crate::model::{RemoteSet, RepositoryHandle};
use crate::oracle::GitOracle;

pub const DEFAULT_MAX_DEPTH: usize = 3;

/// Directory names never descended into (dependency caches, virtualenvs, IDE state, build output).
/// Matched against whole path components.
pub const DENYLIST: &[&str] = &[
    "node_modules",
    "bower_components",
    "vendor",
    ".venv",
    "venv",
    "virtualenv",
    "__pycache__",
    "site-packages",
    ".tox",
    ".idea",
    ".vscode",
    ".cache",
    "target",
];

const GIT_MARKER: &str = ".git";

pub fn is_denylisted_component(name: &str) -> bool {
    DENYLIST.contains(&name)
}

/// True when any component of `path` below `root` is denylisted.
pub fn path_is_denylisted(root: &Path, path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components().any(|c| match c {
        std::path::Component::Normal(s) => s.to_str().is_some_and(is_denylisted_component),
        _ => false,
    })
}

fn has_git_marker(dir: &Path) -> bool {
    // `.git` is a directory for ordinary clones and a file for worktrees/submodules.
    dir.join(GIT_MARKER).exists()
}

/// A working copy that passed the origin and fork checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub handle: RepositoryHandle,
    pub remotes: RemoteSet,
}

/// Iterator over repository directories (any working copy, no remote checks) under the roots.
pub struct RepoDirs {
    roots: std::vec::IntoIter<PathBuf>,
    current: Option<(PathBuf, walkdir::IntoIter)>,
    max_depth: usize,
}

impl RepoDirs {
    pub fn new(roots: Vec<PathBuf>, max_depth: usize) -> Self {
        Self {
            roots: roots.into_iter(),
            current: None,
            max_depth,
        }
    }

    fn next_root(&mut self) -> bool {
        for root in self.roots.by_ref() {
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "search root missing; skipped");
                continue;
            }
            let walker = WalkDir::new(&root)
                .follow_links(false)
                .max_depth(self.max_depth)
                .sort_by_file_name()
                .into_iter();
            self.current = Some((root, walker));
            return true;
        }
        false
    }
}

impl Iterator for RepoDirs {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if self.current.is_none() && !self.next_root() {
                return None;
            }
            let (root, walker) = self.current.as_mut()?;
            let entry = match walker.next() {
                Some(Ok(e)) => e,
                Some(Err(e)) => {
                    // Vanished or unreadable directory: drop it, keep walking.
                    tracing::debug!(error = %e, "walk entry skipped");
                    continue;
                }
                None => {
                    self.current = None;
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            let path = entry.path();
            if entry.depth() > 0 && path_is_denylisted(root, path) {
                walker.skip_current_dir();
                continue;
            }
            if entry.file_name() == GIT_MARKER {
                continue;
            }
            if has_git_marker(path) {
                let found = path.to_path_buf();
                walker.skip_current_dir();
                return Some(found);
            }
        }
    }
}

/// Lazy sequence of accepted candidates, in walk order.
pub struct DiscoveryWalker<'a> {
    dirs: RepoDirs,
    filter: ForkFilter,
    oracle: &'a GitOracle,
    scanned: usize,
}

impl<'a> DiscoveryWalker<'a> {
    pub fn new(
        roots: Vec<PathBuf>,
        max_depth: usize,
        filter: ForkFilter,
        oracle: &'a GitOracle,
    ) -> Self {
        Self {
            dirs: RepoDirs::new(roots, max_depth),
            filter,
            oracle,
            scanned: 0,
        }
    }

    /// Working copies seen so far, accepted or not.
    pub fn scanned(&self) -> usize {
        self.scanned
    }
}

impl Iterator for DiscoveryWalker<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        for dir in self.dirs.by_ref() {
            self.scanned += 1;
            let handle = match RepositoryHandle::new(&dir) {
                Ok(h) => h,
                Err(e) => {
                    tracing::debug!(error = %e, "candidate vanished during walk");
                    continue;
                }
            };
            let remotes = self.oracle.remotes(&handle);
            if remotes.origin_url.is_none() {
                tracing::debug!(repo = %handle.path().display(), "no origin remote; not trackable");
                continue;
            }
            if !self
                .filter
                .accepts(remotes.origin_url.as_deref(), remotes.upstream_url.as_deref())
            {
                tracing::debug!(repo = %handle.path().display(), "not a fork");
                continue;
            }
            return Some(Candidate { handle, remotes });
        }
        None
    }
}
