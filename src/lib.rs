//! forkwatch: find local git forks, report their drift from upstream, and watch upstream
//! remotes for new commits.
pub mod classify;
pub mod color;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod oracle;
pub mod report;
pub mod scan;
pub mod telemetry;
pub mod util;
pub mod watch;

pub use classify::{is_fork, ForkFilter};
pub use color::{
    color_enabled_stderr, color_enabled_stdout, log_error_stderr, log_info_stderr,
    log_warn_stderr, paint, set_color_mode, ColorMode,
};
pub use config::Config;
pub use discovery::{Candidate, DiscoveryWalker};
pub use errors::{exit_code_for_error, ConfigError, HandleError};
pub use model::{Branch, Divergence, HeadCommit, RemoteSet, RepositoryHandle, StatusRecord};
pub use oracle::{GitOracle, GitRunner};
pub use report::{RecordFilter, Report, ReportSummary};
pub use scan::{scan, ScanOptions};
pub use telemetry::telemetry_init;
pub use watch::{CancelFlag, NotificationSink, UpstreamAdvance, WatchTarget, Watcher};
