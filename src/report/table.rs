//! Markdown-style table rendering with optional ANSI color.
use super::{Report, ReportSummary};
use crate::color::paint;
use crate::model::StatusRecord;
use crate::util::escape_table_cell;

const HEADERS: [&str; 7] = [
    "Repository",
    "Branch",
    "State",
    "Ahead",
    "Behind",
    "Reference",
    "Head",
];

const HEAD_MAX_CHARS: usize = 60;
const UNKNOWN: &str = "?";

struct Cell {
    text: String,
    color: Option<&'static str>,
}

impl Cell {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
        }
    }

    fn colored(text: impl Into<String>, code: &'static str) -> Self {
        Self {
            text: text.into(),
            color: Some(code),
        }
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn count_cell(n: Option<u32>, warn_code: &'static str) -> Cell {
    match n {
        None => Cell::colored(UNKNOWN, "\x1b[90m"),
        Some(0) => Cell::plain("0"),
        Some(v) => Cell::colored(v.to_string(), warn_code),
    }
}

fn row(r: &StatusRecord) -> Vec<Cell> {
    let state = if r.dirty {
        Cell::colored("dirty", "\x1b[33m")
    } else {
        Cell::colored("clean", "\x1b[32m")
    };
    let head = r
        .head_commit
        .as_ref()
        .map(|h| truncate_chars(&h.to_string(), HEAD_MAX_CHARS))
        .unwrap_or_else(|| "-".to_string());
    vec![
        Cell::colored(escape_table_cell(&r.name), "\x1b[1m"),
        Cell::plain(escape_table_cell(&r.branch.to_string())),
        state,
        count_cell(r.ahead(), "\x1b[36m"),
        count_cell(r.behind(), "\x1b[31;1m"),
        Cell::plain(escape_table_cell(r.reference.as_deref().unwrap_or("-"))),
        Cell::plain(escape_table_cell(&head)),
    ]
}

fn render_line(cells: &[Cell], widths: &[usize], use_color: bool) -> String {
    let mut line = String::from("|");
    for (cell, w) in cells.iter().zip(widths) {
        let pad = w.saturating_sub(cell.width());
        let text = match cell.color {
            Some(code) => paint(use_color, code, &cell.text),
            None => cell.text.clone(),
        };
        line.push(' ');
        line.push_str(&text);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

pub fn summary_line(s: &ReportSummary) -> String {
    format!(
        "{} fork(s) out of {} repositories scanned: {} dirty, {} need update, {} with upstream, {} unknown",
        s.forks, s.scanned, s.dirty, s.needs_update, s.with_upstream, s.unknown
    )
}

/// Render the whole table plus a trailing summary line. Never reorders records.
pub fn render_table(report: &Report, use_color: bool) -> String {
    let header: Vec<Cell> = HEADERS.iter().map(|h| Cell::plain(*h)).collect();
    let rows: Vec<Vec<Cell>> = report.records().iter().map(row).collect();

    let mut widths: Vec<usize> = header.iter().map(Cell::width).collect();
    for r in &rows {
        for (w, c) in widths.iter_mut().zip(r) {
            *w = (*w).max(c.width());
        }
    }

    let mut out = String::new();
    out.push_str(&render_line(&header, &widths, use_color));
    out.push('\n');
    out.push('|');
    for w in &widths {
        out.push_str(&"-".repeat(w + 2));
        out.push('|');
    }
    out.push('\n');
    for r in &rows {
        out.push_str(&render_line(r, &widths, use_color));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&summary_line(report.summary()));
    out.push('\n');
    out
}
