use serde::Serialize;

use crate::model::StatusRecord;

/// Counters over one ordered record collection. Always derived, never edited in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportSummary {
    /// Working copies the walker looked at, accepted or not.
    pub scanned: usize,
    /// Records in the report (accepted forks).
    pub forks: usize,
    pub dirty: usize,
    pub needs_update: usize,
    pub with_upstream: usize,
    /// Records whose ahead/behind could not be computed.
    pub unknown: usize,
}

/// One pass over `records`; `scanned` comes from the walker.
pub fn aggregate(records: &[StatusRecord], scanned: usize) -> ReportSummary {
    let mut s = ReportSummary {
        scanned,
        forks: records.len(),
        ..ReportSummary::default()
    };
    for r in records {
        if r.dirty {
            s.dirty += 1;
        }
        if r.needs_update() {
            s.needs_update += 1;
        }
        if r.remotes.has_upstream() {
            s.with_upstream += 1;
        }
        if r.divergence.is_none() {
            s.unknown += 1;
        }
    }
    s
}
