mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use forkwatch::config::{Config, Overrides, WatchSpec};
use forkwatch::report::{json::render_json, table::render_table};
use forkwatch::scan::discover;
use forkwatch::util::expand_tilde;
use forkwatch::watch::notify::{CommandSink, DesktopSink, FanoutSink, LogSink};
use forkwatch::watch::{targets_from_candidates, CycleReport};
use forkwatch::{
    color_enabled_stderr, color_enabled_stdout, exit_code_for_error, log_error_stderr,
    log_info_stderr, log_warn_stderr, scan, set_color_mode, CancelFlag, ConfigError, GitOracle,
    GitRunner, NotificationSink, RecordFilter, RepositoryHandle, ScanOptions, WatchTarget, Watcher,
};

use crate::cli::{Cli, Command, DiscoveryArgs};

fn oracle_for(cfg: &Config) -> Result<GitOracle> {
    let git = GitRunner::locate(cfg.timeout, cfg.fetch_timeout)?;
    tracing::debug!(git = %git.git_path().display(), fetch = cfg.fetch, "using git");
    Ok(GitOracle::new(git, cfg.fetch))
}

fn run_scan(
    mut cfg: Config,
    discovery: DiscoveryArgs,
    json: bool,
    no_fetch: bool,
    jobs: Option<usize>,
    filter: RecordFilter,
) -> Result<ExitCode> {
    cfg.apply_overrides(Overrides {
        no_fetch,
        jobs,
        ..discovery.overrides()
    })?;
    let oracle = oracle_for(&cfg)?;
    let report = scan(&oracle, &ScanOptions::from_config(&cfg)).filtered(filter);

    if json {
        println!("{}", render_json(&report).context("rendering JSON report")?);
    } else if !report.is_empty() {
        print!("{}", render_table(&report, color_enabled_stdout()));
    }
    if report.is_empty() {
        log_warn_stderr(
            color_enabled_stderr(),
            &format!(
                "forkwatch: no repositories matched ({} scanned)",
                report.summary().scanned
            ),
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn explicit_targets(oracle: &GitOracle, specs: &[WatchSpec]) -> Result<Vec<WatchTarget>> {
    specs
        .iter()
        .map(|entry| {
            let path = expand_tilde(&entry.path.to_string_lossy());
            let handle = RepositoryHandle::new(&path)
                .with_context(|| format!("cannot watch {}", path.display()))?;
            Ok(match &entry.upstream {
                Some(url) => WatchTarget::with_declared_url(handle, url.clone()),
                None => {
                    let remotes = oracle.remotes(&handle);
                    WatchTarget::from_remotes(handle, &remotes)
                }
            })
        })
        .collect()
}

fn report_cycle_failures(report: &CycleReport) {
    if !report.all_checked() {
        log_warn_stderr(
            color_enabled_stderr(),
            &format!(
                "forkwatch: {} of {} targets could not be checked",
                report.failures.len(),
                report.total
            ),
        );
    }
}

fn run_watch(
    mut cfg: Config,
    overrides: Overrides,
    once: bool,
    repos: Vec<PathBuf>,
) -> Result<ExitCode> {
    cfg.apply_overrides(overrides)?;
    let use_err = color_enabled_stderr();
    let oracle = oracle_for(&cfg)?;
    if !cfg.fetch {
        log_warn_stderr(
            use_err,
            "forkwatch: fetching is disabled; upstream changes are only seen once something else \
             refreshes the remote-tracking refs, and declared upstream URLs cannot be checked",
        );
    }

    let specs: Vec<WatchSpec> = if repos.is_empty() {
        cfg.watch.clone()
    } else {
        repos
            .into_iter()
            .map(|path| WatchSpec {
                path,
                upstream: None,
            })
            .collect()
    };
    let targets = if specs.is_empty() {
        let (candidates, scanned) = discover(&oracle, &ScanOptions::from_config(&cfg));
        tracing::info!(scanned, accepted = candidates.len(), "watch targets discovered");
        targets_from_candidates(candidates)
    } else {
        explicit_targets(&oracle, &specs)?
    };
    if targets.is_empty() {
        log_warn_stderr(use_err, "forkwatch: no repositories to watch");
        return Ok(ExitCode::SUCCESS);
    }

    let mut sinks: Vec<Box<dyn NotificationSink>> = vec![Box::new(LogSink { use_color: use_err })];
    if cfg.desktop {
        match DesktopSink::detect(cfg.timeout) {
            Some(d) => sinks.push(Box::new(d)),
            None => tracing::debug!("no desktop notifier found on PATH"),
        }
    }
    if let Some(argv) = cfg.notify_command.clone() {
        let sink = CommandSink::new(argv, cfg.timeout)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        sinks.push(Box::new(sink));
    }

    let total = targets.len();
    let mut watcher = Watcher::new(targets, oracle, FanoutSink::new(sinks));
    let interval = if once { None } else { cfg.interval };
    match interval {
        None => {
            let report = watcher.poll_once();
            report_cycle_failures(&report);
            Ok(if report.all_checked() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            })
        }
        Some(every) => {
            let cancel = CancelFlag::from_signals().context("installing signal handlers")?;
            log_info_stderr(
                use_err,
                &format!(
                    "forkwatch: watching {total} repositories every {}",
                    humantime::format_duration(every)
                ),
            );
            let cycles = watcher.run(every, &cancel, report_cycle_failures);
            log_info_stderr(use_err, &format!("forkwatch: stopped after {cycles} cycle(s)"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let cfg = Config::load().context("loading configuration")?;
    if let Some(mode) = cfg.color {
        // No-op when --color already set the mode.
        set_color_mode(mode);
    }
    match cli.command {
        Command::Config => {
            print!("{}", cfg.to_yaml().context("serializing configuration")?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Scan {
            discovery,
            json,
            no_fetch,
            jobs,
            dirty_only,
            outdated_only,
        } => run_scan(
            cfg,
            discovery,
            json,
            no_fetch,
            jobs,
            RecordFilter {
                dirty_only,
                outdated_only,
            },
        ),
        Command::Watch {
            discovery,
            interval,
            once,
            repos,
            notify_command,
            no_desktop,
        } => run_watch(
            cfg,
            Overrides {
                interval,
                notify_command,
                no_desktop,
                ..discovery.overrides()
            },
            once,
            repos,
        ),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Some(mode) = cli.color {
        set_color_mode(mode);
    }
    forkwatch::telemetry_init(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log_error_stderr(color_enabled_stderr(), &format!("forkwatch: {e:#}"));
            ExitCode::from(exit_code_for_error(&e))
        }
    }
}
