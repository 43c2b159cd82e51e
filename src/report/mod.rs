//! Report assembly and rendering. Renderers only read records; they never reorder them.
pub mod json;
pub mod summary;
pub mod table;

pub use summary::{aggregate, ReportSummary};

use crate::model::StatusRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    records: Vec<StatusRecord>,
    summary: ReportSummary,
}

/// Which records a rendered report keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub dirty_only: bool,
    pub outdated_only: bool,
}

impl RecordFilter {
    fn keeps(&self, r: &StatusRecord) -> bool {
        (!self.dirty_only || r.dirty) && (!self.outdated_only || r.needs_update())
    }
}

impl Report {
    pub fn new(records: Vec<StatusRecord>, scanned: usize) -> Self {
        let summary = aggregate(&records, scanned);
        Self { records, summary }
    }

    pub fn records(&self) -> &[StatusRecord] {
        &self.records
    }

    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep matching records (order preserved) and recompute the summary over them.
    pub fn filtered(self, filter: RecordFilter) -> Self {
        let scanned = self.summary.scanned;
        let records = self
            .records
            .into_iter()
            .filter(|r| filter.keeps(r))
            .collect();
        Self::new(records, scanned)
    }
}
