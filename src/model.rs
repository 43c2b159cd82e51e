//! Value types shared by discovery, the status oracle, reports and the watcher.
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::HandleError;

pub const ORIGIN: &str = "origin";
pub const UPSTREAM: &str = "upstream";

/// One local working copy. Construction guarantees the path was a directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryHandle {
    path: PathBuf,
    name: String,
}

impl RepositoryHandle {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, HandleError> {
        let path = path.as_ref();
        if !path.is_dir() {
            return Err(HandleError::NotADirectory(path.to_path_buf()));
        }
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let name = crate::util::display_name(&path);
        Ok(Self { path, name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The two remotes relevant to fork tracking. `None` means "not configured". A configured
/// remote with an empty URL cannot be compared against and counts as absent here, the same
/// way the fork classifier treats it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSet {
    pub origin_url: Option<String>,
    pub upstream_url: Option<String>,
}

fn usable(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|u| !u.is_empty())
}

impl RemoteSet {
    pub fn has_upstream(&self) -> bool {
        usable(&self.upstream_url).is_some()
    }

    /// Remote whose default branch is the comparison reference.
    pub fn reference_remote(&self) -> Option<&'static str> {
        if usable(&self.upstream_url).is_some() {
            Some(UPSTREAM)
        } else if usable(&self.origin_url).is_some() {
            Some(ORIGIN)
        } else {
            None
        }
    }

    /// URL of the reference remote.
    pub fn reference_url(&self) -> Option<&str> {
        usable(&self.upstream_url).or(usable(&self.origin_url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    Named(String),
    Detached,
    Unknown,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Named(b) => f.write_str(b),
            Branch::Detached => f.write_str("HEAD"),
            Branch::Unknown => f.write_str("unknown"),
        }
    }
}

/// Latest commit on HEAD. The subject never contains control characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadCommit {
    pub short_hash: String,
    pub subject: String,
}

impl HeadCommit {
    pub fn new(short_hash: &str, subject: &str) -> Self {
        Self {
            short_hash: crate::util::sanitize_single_line(short_hash),
            subject: crate::util::sanitize_single_line(subject),
        }
    }
}

impl fmt::Display for HeadCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subject.is_empty() {
            f.write_str(&self.short_hash)
        } else {
            write!(f, "{} {}", self.short_hash, self.subject)
        }
    }
}

/// Commit counts against one reference ref.
/// `ahead`: on HEAD but not on the reference. `behind`: on the reference but not on HEAD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Divergence {
    pub ahead: u32,
    pub behind: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub name: String,
    pub path: PathBuf,
    pub branch: Branch,
    pub head_commit: Option<HeadCommit>,
    pub dirty: bool,
    /// None when the comparison could not be computed; both counts are unknown together.
    pub divergence: Option<Divergence>,
    pub remotes: RemoteSet,
    /// Reference ref the counts were taken against, e.g. `upstream/main`.
    pub reference: Option<String>,
    /// Whether the refresh of the reference remote succeeded before counting.
    pub fetched: bool,
}

impl StatusRecord {
    pub fn ahead(&self) -> Option<u32> {
        self.divergence.map(|d| d.ahead)
    }

    pub fn behind(&self) -> Option<u32> {
        self.divergence.map(|d| d.behind)
    }

    /// The reference has commits this working copy does not.
    pub fn needs_update(&self) -> bool {
        self.behind().is_some_and(|n| n > 0)
    }
}
