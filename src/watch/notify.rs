/*!
Notification sinks for upstream-advance events.

- CommandSink: user-configured argv with `{repo}`, `{count}`, `{url}`, `{title}`, `{body}`
  placeholders, executed without a shell and with a timeout.
- DesktopSink: `notify-send` (freedesktop) or `osascript` (macOS), found on PATH.
- LogSink: one line on stderr.

A failed delivery is reported to the caller, which logs it and carries on.
*/
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::util::{ExecRequest, ExecService};

/// One upstream advance: the reference ref moved and is now `ahead_count` commits ahead of HEAD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamAdvance {
    pub repository_name: String,
    pub ahead_count: u32,
    pub upstream_url: String,
}

impl UpstreamAdvance {
    pub fn title(&self) -> String {
        format!("{}: new upstream commits", self.repository_name)
    }

    pub fn body(&self) -> String {
        let noun = if self.ahead_count == 1 { "commit" } else { "commits" };
        format!("{} new {} on {}", self.ahead_count, noun, self.upstream_url)
    }
}

#[derive(Debug)]
pub enum NotifyError {
    Spawn(String),
    Failed { code: Option<i32>, stderr: String },
    Policy(String),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyError::Spawn(msg) => write!(f, "notification command failed to run: {msg}"),
            NotifyError::Failed { code, stderr } => {
                write!(f, "notification command exited with {code:?}")?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            NotifyError::Policy(msg) => write!(f, "invalid notification command: {msg}"),
        }
    }
}

impl std::error::Error for NotifyError {}

pub trait NotificationSink {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for Box<T> {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        (**self).deliver(event)
    }
}

/// Minimal shell-like tokenizer supporting single and double quotes.
/// Does not support escapes; quotes preserve spaces.
pub fn split_command_line(s: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_single = false;
    let mut in_double = false;
    let mut quoted = false;

    for ch in s.chars() {
        match ch {
            '\'' if !in_double => {
                in_single = !in_single;
                quoted = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single && !in_double => {
                if !current.is_empty() || quoted {
                    out.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() || quoted {
        out.push(current);
    }
    out
}

fn expand_placeholders(token: &str, event: &UpstreamAdvance) -> String {
    token
        .replace("{repo}", &event.repository_name)
        .replace("{count}", &event.ahead_count.to_string())
        .replace("{url}", &event.upstream_url)
        .replace("{title}", &event.title())
        .replace("{body}", &event.body())
}

fn run_argv(exec: &ExecService, argv: &[String]) -> Result<(), NotifyError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| NotifyError::Policy("command is empty".to_string()))?;
    let out = exec
        .run(ExecRequest::new(program).args(args))
        .map_err(|e| NotifyError::Spawn(format!("{e:#}")))?;
    if out.success() {
        Ok(())
    } else {
        Err(NotifyError::Failed {
            code: out.code(),
            stderr: out.stderr,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandSink {
    exec: ExecService,
    argv: Vec<String>,
}

impl CommandSink {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, NotifyError> {
        if argv.first().map_or(true, |p| p.trim().is_empty()) {
            return Err(NotifyError::Policy("command is empty".to_string()));
        }
        Ok(Self {
            exec: ExecService::new(timeout),
            argv,
        })
    }

    pub fn argv_for(&self, event: &UpstreamAdvance) -> Vec<String> {
        self.argv
            .iter()
            .map(|t| expand_placeholders(t, event))
            .collect()
    }
}

impl NotificationSink for CommandSink {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        run_argv(&self.exec, &self.argv_for(event))
    }
}

#[derive(Debug, Clone)]
enum DesktopBackend {
    NotifySend(PathBuf),
    Osascript(PathBuf),
}

#[derive(Debug, Clone)]
pub struct DesktopSink {
    exec: ExecService,
    backend: DesktopBackend,
}

/// Quote a string as an AppleScript string literal.
fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

impl DesktopSink {
    /// Find a desktop notifier for this host, if any.
    pub fn detect(timeout: Duration) -> Option<Self> {
        let backend = if cfg!(target_os = "macos") {
            which::which("osascript").ok().map(DesktopBackend::Osascript)
        } else {
            which::which("notify-send").ok().map(DesktopBackend::NotifySend)
        }?;
        Some(Self {
            exec: ExecService::new(timeout),
            backend,
        })
    }

    fn argv_for(&self, event: &UpstreamAdvance) -> Vec<String> {
        match &self.backend {
            DesktopBackend::NotifySend(p) => vec![
                p.display().to_string(),
                "--app-name=forkwatch".to_string(),
                event.title(),
                event.body(),
            ],
            DesktopBackend::Osascript(p) => vec![
                p.display().to_string(),
                "-e".to_string(),
                format!(
                    "display notification {} with title {}",
                    applescript_quote(&event.body()),
                    applescript_quote(&event.title())
                ),
            ],
        }
    }
}

impl NotificationSink for DesktopSink {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        run_argv(&self.exec, &self.argv_for(event))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink {
    pub use_color: bool,
}

impl NotificationSink for LogSink {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        crate::color::log_info_stderr(
            self.use_color,
            &format!("forkwatch: {} ({})", event.title(), event.body()),
        );
        Ok(())
    }
}

/// Deliver to every sink; report the first failure after trying them all.
pub struct FanoutSink {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Box<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }
}

impl NotificationSink for FanoutSink {
    fn deliver(&self, event: &UpstreamAdvance) -> Result<(), NotifyError> {
        let mut first_err = None;
        for sink in &self.sinks {
            if let Err(e) = sink.deliver(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
