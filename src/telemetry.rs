use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Filter directive: `FORKWATCH_LOG` when set, else `debug` with `-v`, else `warn`.
pub fn filter_directive(env_value: Option<&str>, verbose: bool) -> String {
    match env_value.map(str::trim).filter(|s| !s.is_empty()) {
        Some(v) => v.to_string(),
        None if verbose => "forkwatch=debug,warn".to_string(),
        None => "warn".to_string(),
    }
}

/// Install the global fmt subscriber (stderr). Safe to call more than once.
pub fn telemetry_init(verbose: bool) {
    if INIT.get().is_some() {
        return;
    }
    let directive = filter_directive(env::var("FORKWATCH_LOG").ok().as_deref(), verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("forkwatch: ignoring invalid FORKWATCH_LOG '{directive}': {e}");
        EnvFilter::new("warn")
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("forkwatch: logging init skipped (global subscriber already set)");
        return;
    }
    let _ = INIT.set(());
}
