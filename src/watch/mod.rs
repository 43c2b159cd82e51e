//! Poll loop: re-checks a fixed set of repositories and raises a notification when the
//! reference remote moves and brings commits the local HEAD does not have.
//!
//! States: Idle between cycles, Checking while a cycle runs. The target set is fixed for the
//! session. A target's bookkeeping is updated only after its own check finished.
pub mod notify;
pub mod signal;

use std::fmt;
use std::time::{Duration, Instant};

use tracing::instrument;

pub use notify::{NotificationSink, UpstreamAdvance};
pub use signal::CancelFlag;

use crate::discovery::Candidate;
use crate::model::{RemoteSet, RepositoryHandle};
use crate::oracle::{GitOracle, FETCH_HEAD};

/// Upper bound on one uninterrupted sleep while waiting for the next cycle.
const CANCEL_POLL_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub handle: RepositoryHandle,
    /// URL reported in notifications (upstream if configured, else origin, else as declared).
    pub upstream_url: String,
    /// `upstream_url` was declared by the user and is fetched directly instead of going
    /// through the configured remotes.
    pub declared: bool,
    /// Commit id of the reference ref at the last successful check.
    pub last_seen: Option<String>,
}

impl WatchTarget {
    pub fn new(handle: RepositoryHandle, upstream_url: impl Into<String>) -> Self {
        Self {
            handle,
            upstream_url: upstream_url.into(),
            declared: false,
            last_seen: None,
        }
    }

    /// Target compared against `url` itself, whatever the working copy's remotes say.
    pub fn with_declared_url(handle: RepositoryHandle, url: impl Into<String>) -> Self {
        Self {
            declared: true,
            ..Self::new(handle, url)
        }
    }

    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Target whose declared URL is the upstream URL, else origin, else the local path.
    pub fn from_remotes(handle: RepositoryHandle, remotes: &RemoteSet) -> Self {
        let url = remotes
            .reference_url()
            .map(str::to_string)
            .unwrap_or_else(|| handle.path().display().to_string());
        Self::new(handle, url)
    }
}

pub fn targets_from_candidates(candidates: Vec<Candidate>) -> Vec<WatchTarget> {
    candidates
        .into_iter()
        .map(|c| WatchTarget::from_remotes(c.handle, &c.remotes))
        .collect()
}

/// What one probe of a target observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Commit id of the reference ref after refreshing it.
    pub identity: String,
    /// Commits on the reference that HEAD lacks; None when uncountable.
    pub ahead_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    Missing(String),
    NoRemote,
    NoDefaultBranch(String),
    Unresolved(String),
    FetchFailed(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::Missing(p) => write!(f, "working copy is gone: {p}"),
            ProbeError::NoRemote => f.write_str("no upstream or origin remote configured"),
            ProbeError::NoDefaultBranch(r) => {
                write!(f, "cannot determine default branch of remote '{r}'")
            }
            ProbeError::Unresolved(r) => write!(f, "reference {r} does not resolve to a commit"),
            ProbeError::FetchFailed(url) => write!(f, "cannot fetch declared upstream {url}"),
        }
    }
}

impl std::error::Error for ProbeError {}

pub trait RemoteProbe {
    fn probe(&self, target: &WatchTarget) -> Result<Probe, ProbeError>;
}

impl RemoteProbe for GitOracle {
    #[instrument(level = "debug", skip(self, target), fields(repo = %target.name()))]
    fn probe(&self, target: &WatchTarget) -> Result<Probe, ProbeError> {
        let handle = &target.handle;
        if !handle.path().is_dir() {
            return Err(ProbeError::Missing(handle.path().display().to_string()));
        }
        let reference = if target.declared {
            // FETCH_HEAD left by anything else must never be mistaken for the declared URL.
            if !self.fetch_url(handle, &target.upstream_url) {
                return Err(ProbeError::FetchFailed(target.upstream_url.clone()));
            }
            FETCH_HEAD.to_string()
        } else {
            let remotes = self.remotes(handle);
            let remote = remotes.reference_remote().ok_or(ProbeError::NoRemote)?;
            self.fetch(handle, remote);
            let branch = self
                .default_branch(handle, remote)
                .ok_or_else(|| ProbeError::NoDefaultBranch(remote.to_string()))?;
            format!("{remote}/{branch}")
        };
        let identity = self
            .resolve_commit(handle, &reference)
            .ok_or_else(|| ProbeError::Unresolved(reference.clone()))?;
        let ahead_count = self.count_commits(handle, &format!("HEAD..{reference}"));
        Ok(Probe {
            identity,
            ahead_count,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Checking,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetFailure {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub total: usize,
    pub checked: usize,
    pub notified: Vec<UpstreamAdvance>,
    pub delivery_failures: usize,
    pub failures: Vec<TargetFailure>,
}

impl CycleReport {
    pub fn all_checked(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Watcher<P, S> {
    targets: Vec<WatchTarget>,
    probe: P,
    sink: S,
    state: WatchState,
}

impl<P: RemoteProbe, S: NotificationSink> Watcher<P, S> {
    pub fn new(targets: Vec<WatchTarget>, probe: P, sink: S) -> Self {
        Self {
            targets,
            probe,
            sink,
            state: WatchState::Idle,
        }
    }

    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// One Idle -> Checking -> Idle transition over every target.
    pub fn poll_once(&mut self) -> CycleReport {
        self.state = WatchState::Checking;
        let mut report = CycleReport {
            total: self.targets.len(),
            ..CycleReport::default()
        };
        for target in self.targets.iter_mut() {
            let probe = match self.probe.probe(target) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(repo = %target.name(), error = %e, "check failed");
                    report.failures.push(TargetFailure {
                        name: target.name().to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            report.checked += 1;
            let changed = target.last_seen.as_deref() != Some(probe.identity.as_str());
            if changed {
                if let Some(n) = probe.ahead_count.filter(|n| *n > 0) {
                    let event = UpstreamAdvance {
                        repository_name: target.name().to_string(),
                        ahead_count: n,
                        upstream_url: target.upstream_url.clone(),
                    };
                    if let Err(e) = self.sink.deliver(&event) {
                        tracing::warn!(repo = %target.name(), error = %e, "notification not delivered");
                        report.delivery_failures += 1;
                    }
                    report.notified.push(event);
                }
            }
            target.last_seen = Some(probe.identity);
        }
        self.state = WatchState::Idle;
        report
    }

    /// Poll every `interval` until cancelled. The first cycle runs immediately.
    /// Returns the number of completed cycles.
    pub fn run<F>(&mut self, interval: Duration, cancel: &CancelFlag, mut on_cycle: F) -> usize
    where
        F: FnMut(&CycleReport),
    {
        let mut cycles = 0usize;
        while !cancel.is_cancelled() {
            let report = self.poll_once();
            cycles += 1;
            tracing::info!(
                cycle = cycles,
                checked = report.checked,
                notified = report.notified.len(),
                failed = report.failures.len(),
                "poll cycle finished"
            );
            on_cycle(&report);
            if !sleep_unless_cancelled(interval, cancel) {
                break;
            }
        }
        cycles
    }
}

/// Sleep for `total` in short slices. Returns false as soon as cancellation is observed.
pub fn sleep_unless_cancelled(total: Duration, cancel: &CancelFlag) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if cancel.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        std::thread::sleep((deadline - now).min(CANCEL_POLL_SLICE));
    }
}
