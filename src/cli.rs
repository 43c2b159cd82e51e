use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use forkwatch::config::Overrides;
use forkwatch::ColorMode;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (rev ",
    env!("FORKWATCH_BUILD_REV"),
    ", ",
    env!("FORKWATCH_BUILD_TARGET"),
    ", built ",
    env!("FORKWATCH_BUILD_DATE"),
    ")"
);

fn parse_interval(s: &str) -> Result<Duration, String> {
    let d = humantime::parse_duration(s).map_err(|e| e.to_string())?;
    if d.is_zero() {
        return Err("must be greater than zero".to_string());
    }
    Ok(d)
}

fn parse_jobs(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err("must be a whole number >= 1".to_string()),
    }
}

/// Discovery flags shared by `scan` and `watch`.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct DiscoveryArgs {
    /// Search root (repeatable); replaces the configured roots
    #[arg(long = "root", value_name = "DIR")]
    pub(crate) roots: Vec<PathBuf>,

    /// Username to match in remote URLs (repeatable or comma separated)
    #[arg(long = "user", value_name = "NAME")]
    pub(crate) users: Vec<String>,

    /// Maximum directory depth below each root
    #[arg(long)]
    pub(crate) depth: Option<usize>,

    /// Accept every repository with an origin remote, ignoring usernames
    #[arg(long)]
    pub(crate) all: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Discover forks under the search roots and report their status
    Scan {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Do not fetch the reference remote; count against local refs
        #[arg(long = "no-fetch")]
        no_fetch: bool,

        /// Number of repositories to inspect in parallel
        #[arg(long, value_parser = parse_jobs)]
        jobs: Option<usize>,

        /// Only show repositories with uncommitted changes
        #[arg(long = "dirty-only")]
        dirty_only: bool,

        /// Only show repositories behind their reference
        #[arg(long = "outdated-only")]
        outdated_only: bool,
    },

    /// Poll upstream remotes and notify when they gain commits you do not have
    Watch {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Poll interval, e.g. 30s, 15m, 1h
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,

        /// Run a single cycle and exit
        #[arg(long, conflicts_with = "interval")]
        once: bool,

        /// Watch this working copy instead of discovering (repeatable)
        #[arg(long = "repo", value_name = "PATH")]
        repos: Vec<PathBuf>,

        /// Command to run per notification; supports {repo} {count} {url} {title} {body}
        #[arg(long = "notify-command", value_name = "CMD")]
        notify_command: Option<String>,

        /// Do not send desktop notifications
        #[arg(long = "no-desktop")]
        no_desktop: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}

#[derive(Parser, Debug)]
#[command(
    name = "forkwatch",
    version,
    long_version = LONG_VERSION,
    about = "Find your local git forks, report how far they drifted from upstream, and watch for new upstream commits.",
    after_long_help = "Examples:\n  forkwatch scan --user alice\n  forkwatch scan --json --root ~/work --no-fetch\n  forkwatch watch --interval 15m\n  forkwatch watch --once --repo ~/src/widget\n\n"
)]
pub(crate) struct Cli {
    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<ColorMode>,

    /// Print debug logs on stderr (FORKWATCH_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    pub(crate) verbose: bool,

    #[command(subcommand)]
    pub(crate) command: Command,
}

impl DiscoveryArgs {
    pub(crate) fn overrides(&self) -> Overrides {
        Overrides {
            roots: self.roots.clone(),
            usernames: self.users.clone(),
            all: self.all,
            depth: self.depth,
            ..Overrides::default()
        }
    }
}
