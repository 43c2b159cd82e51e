/*!
Configuration: defaults, then the YAML file, then `FORKWATCH_*` environment, then CLI flags.

File location: `$FORKWATCH_CONFIG`, else `~/.config/forkwatch/config.yml`. A missing file is not
an error; a malformed one is.

```yaml
usernames: [alice]
roots: ["~/src", "/work"]
depth: 3
interval: 15m
timeout: 15s
fetch_timeout: 60s
fetch: true
jobs: 4
color: auto
notify_command: ["notify-send", "{title}", "{body}"]   # or a single string
desktop: true
watch:
  - path: ~/src/widget
    upstream: https://example.com/orig/widget.git
```
*/
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

use crate::color::{parse_color_mode, ColorMode};
use crate::discovery::DEFAULT_MAX_DEPTH;
use crate::errors::ConfigError;
use crate::util::expand_tilde;
use crate::watch::notify::split_command_line;

pub const DEFAULT_ROOTS: &[&str] = &["~/src", "~/code", "~/projects", "~/repos"];
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    fn into_argv(self) -> Vec<String> {
        match self {
            CommandSpec::Line(s) => split_command_line(&s),
            CommandSpec::Argv(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchEntry {
    pub path: String,
    #[serde(default)]
    pub upstream: Option<String>,
}

/// On-disk shape. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub usernames: Option<Vec<String>>,
    pub roots: Option<Vec<String>>,
    pub depth: Option<usize>,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub fetch_timeout: Option<String>,
    pub fetch: Option<bool>,
    pub jobs: Option<usize>,
    pub color: Option<String>,
    pub notify_command: Option<CommandSpec>,
    pub desktop: Option<bool>,
    pub watch: Vec<WatchEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchSpec {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<String>,
}

/// Effective settings after every layer has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    pub usernames: Vec<String>,
    pub roots: Vec<PathBuf>,
    pub depth: usize,
    #[serde(serialize_with = "ser_opt_duration")]
    pub interval: Option<Duration>,
    #[serde(serialize_with = "ser_duration")]
    pub timeout: Duration,
    #[serde(serialize_with = "ser_duration")]
    pub fetch_timeout: Duration,
    pub fetch: bool,
    pub jobs: usize,
    #[serde(serialize_with = "ser_color")]
    pub color: Option<ColorMode>,
    pub notify_command: Option<Vec<String>>,
    pub desktop: bool,
    pub watch: Vec<WatchSpec>,
}

fn ser_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(&humantime::format_duration(*d))
}

fn ser_opt_duration<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => ser_duration(d, s),
        None => s.serialize_none(),
    }
}

fn ser_color<S: Serializer>(c: &Option<ColorMode>, s: S) -> Result<S::Ok, S::Error> {
    match c {
        Some(c) => s.serialize_str(c.as_str()),
        None => s.serialize_none(),
    }
}

/// Flag values from the command line; `None`/`false`/empty leave the lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub roots: Vec<PathBuf>,
    pub usernames: Vec<String>,
    pub all: bool,
    pub depth: Option<usize>,
    pub no_fetch: bool,
    pub jobs: Option<usize>,
    pub interval: Option<Duration>,
    pub notify_command: Option<String>,
    pub no_desktop: bool,
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    let d = humantime::parse_duration(raw.trim())
        .map_err(|e| ConfigError::Invalid(format!("{key}: '{raw}': {e}")))?;
    if d.is_zero() {
        return Err(ConfigError::Invalid(format!("{key}: must be greater than zero")));
    }
    Ok(d)
}

fn parse_usernames(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn non_empty_argv(argv: Vec<String>) -> Result<Vec<String>, ConfigError> {
    if argv.first().map_or(true, |p| p.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "notify_command: parsed to an empty command".to_string(),
        ));
    }
    Ok(argv)
}

/// Resolve the config file path from `FORKWATCH_CONFIG` or the home directory.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("FORKWATCH_CONFIG") {
        let p = p.trim();
        if !p.is_empty() {
            return Some(expand_tilde(p));
        }
    }
    home::home_dir().map(|h| h.join(".config").join("forkwatch").join("config.yml"))
}

pub fn parse_file_config(text: &str, path: &Path) -> Result<FileConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(FileConfig::default());
    }
    serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))
}

/// Read and parse a config file. A missing file yields `None`.
pub fn load_file(path: &Path) -> Result<Option<FileConfig>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => parse_file_config(&text, path).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigError::Io(path.to_path_buf(), e)),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            usernames: Vec::new(),
            roots: DEFAULT_ROOTS.iter().map(|r| expand_tilde(r)).collect(),
            depth: DEFAULT_MAX_DEPTH,
            interval: None,
            timeout: DEFAULT_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            fetch: true,
            jobs: 1,
            color: None,
            notify_command: None,
            desktop: true,
            watch: Vec::new(),
        }
    }
}

impl Config {
    /// Defaults, the config file (if any) and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Config::default();
        if let Some(path) = config_path() {
            if let Some(file) = load_file(&path)? {
                tracing::debug!(path = %path.display(), "loaded config file");
                cfg.apply_file(file)?;
            }
        }
        cfg.apply_env(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn apply_file(&mut self, f: FileConfig) -> Result<(), ConfigError> {
        if let Some(u) = f.usernames {
            self.usernames = u
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(r) = f.roots {
            self.roots = r.iter().map(|p| expand_tilde(p.trim())).collect();
        }
        if let Some(d) = f.depth {
            self.depth = d;
        }
        if let Some(i) = f.interval {
            self.interval = Some(parse_duration("interval", &i)?);
        }
        if let Some(t) = f.timeout {
            self.timeout = parse_duration("timeout", &t)?;
        }
        if let Some(t) = f.fetch_timeout {
            self.fetch_timeout = parse_duration("fetch_timeout", &t)?;
        }
        if let Some(b) = f.fetch {
            self.fetch = b;
        }
        if let Some(j) = f.jobs {
            self.jobs = j;
        }
        if let Some(c) = f.color {
            self.color = Some(
                parse_color_mode(&c)
                    .ok_or_else(|| ConfigError::Invalid(format!("color: unknown mode '{c}'")))?,
            );
        }
        if let Some(cmd) = f.notify_command {
            self.notify_command = Some(non_empty_argv(cmd.into_argv())?);
        }
        if let Some(b) = f.desktop {
            self.desktop = b;
        }
        if !f.watch.is_empty() {
            self.watch = f
                .watch
                .into_iter()
                .map(|w| WatchSpec {
                    path: expand_tilde(w.path.trim()),
                    upstream: w.upstream.filter(|u| !u.trim().is_empty()),
                })
                .collect();
        }
        self.validate()
    }

    /// Apply `FORKWATCH_*` variables read through `get`.
    pub fn apply_env<F>(&mut self, get: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());
        if let Some(v) = get("FORKWATCH_USERNAMES") {
            self.usernames = parse_usernames(&v);
        }
        if let Some(v) = get("FORKWATCH_ROOTS") {
            self.roots = std::env::split_paths(&v)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| expand_tilde(&p.to_string_lossy()))
                .collect();
        }
        if let Some(v) = get("FORKWATCH_INTERVAL") {
            self.interval = Some(parse_duration("FORKWATCH_INTERVAL", &v)?);
        }
        if let Some(v) = get("FORKWATCH_DEPTH") {
            self.depth = v.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("FORKWATCH_DEPTH: '{v}' is not a number"))
            })?;
        }
        if get("FORKWATCH_NO_FETCH").as_deref().map(str::trim) == Some("1") {
            self.fetch = false;
        }
        if let Some(mode) = get("FORKWATCH_COLOR").and_then(|v| parse_color_mode(&v)) {
            self.color = Some(mode);
        }
        self.validate()
    }

    pub fn apply_overrides(&mut self, o: Overrides) -> Result<(), ConfigError> {
        if !o.roots.is_empty() {
            self.roots = o
                .roots
                .iter()
                .map(|p| expand_tilde(&p.to_string_lossy()))
                .collect();
        }
        if o.all {
            self.usernames.clear();
        } else if !o.usernames.is_empty() {
            self.usernames = o
                .usernames
                .iter()
                .flat_map(|u| parse_usernames(u))
                .collect();
        }
        if let Some(d) = o.depth {
            self.depth = d;
        }
        if o.no_fetch {
            self.fetch = false;
        }
        if let Some(j) = o.jobs {
            self.jobs = j;
        }
        if let Some(i) = o.interval {
            self.interval = Some(i);
        }
        if let Some(cmd) = o.notify_command {
            self.notify_command = Some(non_empty_argv(split_command_line(&cmd))?);
        }
        if o.no_desktop {
            self.desktop = false;
        }
        self.validate()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::Invalid("jobs: must be at least 1".to_string()));
        }
        if self.interval.is_some_and(|d| d.is_zero()) {
            return Err(ConfigError::Invalid(
                "interval: must be greater than zero".to_string(),
            ));
        }
        if self.roots.is_empty() {
            return Err(ConfigError::Invalid(
                "roots: at least one search root is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective configuration as YAML (what `forkwatch config` prints).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }
}
