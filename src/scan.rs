//! Scan driver: discovery, then one status record per accepted candidate, in discovery order.
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::classify::ForkFilter;
use crate::config::Config;
use crate::discovery::{Candidate, DiscoveryWalker};
use crate::model::StatusRecord;
use crate::oracle::GitOracle;
use crate::report::Report;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub roots: Vec<PathBuf>,
    pub max_depth: usize,
    pub filter: ForkFilter,
    pub jobs: usize,
}

impl ScanOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            roots: cfg.roots.clone(),
            max_depth: cfg.depth,
            filter: ForkFilter::from_usernames(cfg.usernames.clone()),
            jobs: cfg.jobs,
        }
    }
}

/// Walk the roots and return the accepted candidates plus the number of working copies seen.
pub fn discover(oracle: &GitOracle, opts: &ScanOptions) -> (Vec<Candidate>, usize) {
    let mut walker = DiscoveryWalker::new(
        opts.roots.clone(),
        opts.max_depth,
        opts.filter.clone(),
        oracle,
    );
    let candidates: Vec<Candidate> = walker.by_ref().collect();
    (candidates, walker.scanned())
}

/// Compute status for each candidate. With `jobs > 1` the work is spread over scoped threads;
/// results land in per-index slots so the output order always equals the input order.
pub fn collect_statuses(oracle: &GitOracle, candidates: &[Candidate], jobs: usize) -> Vec<StatusRecord> {
    let workers = jobs.clamp(1, candidates.len().max(1));
    if workers == 1 {
        return candidates
            .iter()
            .map(|c| oracle.status_with_remotes(&c.handle, c.remotes.clone()))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<StatusRecord>>> =
        candidates.iter().map(|_| Mutex::new(None)).collect();
    std::thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| loop {
                let i = next.fetch_add(1, Ordering::Relaxed);
                let Some(c) = candidates.get(i) else {
                    break;
                };
                let rec = oracle.status_with_remotes(&c.handle, c.remotes.clone());
                if let Ok(mut slot) = slots[i].lock() {
                    *slot = Some(rec);
                }
            });
        }
    });
    slots
        .into_iter()
        .filter_map(|m| m.into_inner().ok().flatten())
        .collect()
}

pub fn scan(oracle: &GitOracle, opts: &ScanOptions) -> Report {
    let (candidates, scanned) = discover(oracle, opts);
    tracing::info!(scanned, accepted = candidates.len(), "discovery finished");
    let records = collect_statuses(oracle, &candidates, opts.jobs);
    Report::new(records, scanned)
}
