//! Error mapping guide:
//! - Absent facts and failed git calls never become errors; they are Options/sentinels.
//! - Structural misuse (a path that is not a directory) and bad configuration map to exit code 2.
//! - io::ErrorKind::NotFound (git missing) maps to 127; everything else to 1.
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Raised when a caller hands a non-directory to something that needs a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    NotADirectory(PathBuf),
}

impl fmt::Display for HandleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleError::NotADirectory(p) => {
                write!(f, "not a directory: {}", p.display())
            }
        }
    }
}

impl std::error::Error for HandleError {}

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, io::Error),
    Parse(PathBuf, String),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(p, e) => write!(f, "cannot read config {}: {e}", p.display()),
            ConfigError::Parse(p, msg) => write!(f, "invalid config {}: {msg}", p.display()),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

/// Convert an application error chain into an exit code.
pub fn exit_code_for_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<HandleError>().is_some()
            || cause.downcast_ref::<ConfigError>().is_some()
        {
            return 2;
        }
        if let Some(ioe) = cause.downcast_ref::<io::Error>() {
            return exit_code_for_io_error(ioe);
        }
        if cause.downcast_ref::<which::Error>().is_some() {
            return 127;
        }
    }
    1
}
