#![allow(clippy::module_name_repetitions)]
//! Small utilities: process execution, single-line text sanitizing, path expansion.

pub mod exec;

pub use exec::{ExecOutput, ExecRequest, ExecService};

use std::path::{Path, PathBuf};

/// Strip every control character (including CR, LF, NUL, ESC and DEL) so the result is a
/// single printable line. Surrounding whitespace is trimmed.
pub fn sanitize_single_line(s: &str) -> String {
    let out: String = s.chars().filter(|c| !c.is_control()).collect();
    out.trim().to_string()
}

/// Escape the Markdown table delimiter in a cell.
pub fn escape_table_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

/// Expand a leading `~` or `~/` to the home directory; other paths are returned unchanged.
pub fn expand_tilde(p: &str) -> PathBuf {
    if p == "~" {
        if let Some(h) = home::home_dir() {
            return h;
        }
    } else if let Some(rest) = p.strip_prefix("~/") {
        if let Some(h) = home::home_dir() {
            return h.join(rest);
        }
    }
    PathBuf::from(p)
}

/// Final path segment as a display label ("" for `/`).
pub fn display_name(p: &Path) -> String {
    p.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| p.display().to_string())
}
