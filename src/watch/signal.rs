//! Cooperative cancellation for the watch loop (Ctrl-C / SIGTERM).
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Shared stop flag, checked between poll cycles and during the interval sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
    signals: bool,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag that also trips on SIGINT/SIGTERM. The handler is installed on first use.
    pub fn from_signals() -> std::io::Result<Self> {
        install_handlers()?;
        Ok(Self {
            inner: Arc::new(AtomicBool::new(false)),
            signals: true,
        })
    }

    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst) || (self.signals && INTERRUPTED.load(Ordering::SeqCst))
    }
}

#[cfg(unix)]
extern "C" fn on_signal(_: std::ffi::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_handlers() -> std::io::Result<()> {
    use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

    // SA_RESETHAND: a second Ctrl-C falls back to the default action and terminates at once.
    let action = SigAction::new(
        SigHandler::Handler(on_signal),
        SaFlags::SA_RESTART | SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM] {
        // Safety: the handler only stores to an atomic, which is async-signal-safe.
        unsafe { sigaction(sig, &action) }.map_err(std::io::Error::from)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_handlers() -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let a = CancelFlag::new();
        let b = a.clone();
        assert!(!b.is_cancelled());
        a.cancel();
        assert!(b.is_cancelled());
    }

    #[test]
    fn test_plain_flag_ignores_signal_state() {
        let f = CancelFlag::new();
        INTERRUPTED.store(true, Ordering::SeqCst);
        let ignored = f.is_cancelled();
        INTERRUPTED.store(false, Ordering::SeqCst);
        assert!(!ignored);
    }
}
