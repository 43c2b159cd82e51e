//! JSON rendering. Unknown values are `null`, never a placeholder string.
use serde::Serialize;

use super::{Report, ReportSummary};
use crate::model::{Branch, StatusRecord};

#[derive(Serialize)]
struct JsonHead<'a> {
    short_hash: &'a str,
    subject: &'a str,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: &'a str,
    path: String,
    /// Branch name, "HEAD" when detached, null when unknown.
    branch: Option<String>,
    detached: bool,
    head_commit: Option<JsonHead<'a>>,
    dirty: bool,
    ahead: Option<u32>,
    behind: Option<u32>,
    needs_update: bool,
    origin_url: Option<&'a str>,
    upstream_url: Option<&'a str>,
    reference: Option<&'a str>,
    fetched: bool,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    repositories: Vec<JsonRecord<'a>>,
    summary: &'a ReportSummary,
}

fn record_view(r: &StatusRecord) -> JsonRecord<'_> {
    JsonRecord {
        name: &r.name,
        path: r.path.display().to_string(),
        branch: match &r.branch {
            Branch::Unknown => None,
            other => Some(other.to_string()),
        },
        detached: r.branch == Branch::Detached,
        head_commit: r.head_commit.as_ref().map(|h| JsonHead {
            short_hash: &h.short_hash,
            subject: &h.subject,
        }),
        dirty: r.dirty,
        ahead: r.ahead(),
        behind: r.behind(),
        needs_update: r.needs_update(),
        origin_url: r.remotes.origin_url.as_deref(),
        upstream_url: r.remotes.upstream_url.as_deref(),
        reference: r.reference.as_deref(),
        fetched: r.fetched,
    }
}

pub fn render_json(report: &Report) -> serde_json::Result<String> {
    let doc = JsonReport {
        repositories: report.records().iter().map(record_view).collect(),
        summary: report.summary(),
    };
    serde_json::to_string_pretty(&doc)
}
