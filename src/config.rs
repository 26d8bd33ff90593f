use anyhow::Context;
use audiowatch_engine::{BackendKind, WatcherOptions};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Platform default when unset.
    pub backend: Option<BackendKind>,
    pub format: OutputFormat,
    pub log_level: LogLevel,
    pub context_thread: String,
    pub trace_events: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let options = WatcherOptions::default();
        Self {
            backend: None,
            format: OutputFormat::default(),
            log_level: LogLevel::default(),
            context_thread: options.context_thread,
            trace_events: options.trace_events,
        }
    }
}

impl AppConfig {
    /// Load `path`, or the default location when `path` is `None`.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match default_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Watcher options from this file, with `AUDIOWATCH_*` environment
    /// overrides applied on top.
    pub fn watcher_options(&self) -> WatcherOptions {
        let defaults = WatcherOptions::default();
        WatcherOptions {
            backend: self.backend.unwrap_or(defaults.backend),
            context_thread: self.context_thread.clone(),
            trace_events: self.trace_events,
        }
        .with_env()
    }
}

/// `$XDG_CONFIG_HOME/audiowatch/config.toml`, else
/// `$HOME/.config/audiowatch/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    config_path_from(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

fn config_path_from(xdg: Option<PathBuf>, home: Option<PathBuf>) -> Option<PathBuf> {
    let base = xdg
        .filter(|p| p.is_absolute())
        .or_else(|| home.map(|h| h.join(".config")))?;
    Some(base.join("audiowatch").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_is_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.context_thread, "audiowatch-main");
    }

    #[test]
    fn parses_every_key() {
        let config: AppConfig = toml::from_str(
            r#"
            backend = "simulated"
            format = "json"
            log_level = "debug"
            context_thread = "hs-main"
            trace_events = true
            "#,
        )
        .unwrap();
        assert_eq!(config.backend, Some(BackendKind::Simulated));
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.context_thread, "hs-main");
        assert!(config.trace_events);
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(toml::from_str::<AppConfig>("backend = \"alsa\"").is_err());
    }

    #[test]
    fn loads_from_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "format = \"json\"").unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.backend, None);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn default_path_prefers_xdg() {
        assert_eq!(
            config_path_from(Some("/xdg".into()), Some("/home/me".into())),
            Some(PathBuf::from("/xdg/audiowatch/config.toml"))
        );
        assert_eq!(
            config_path_from(Some("relative".into()), Some("/home/me".into())),
            Some(PathBuf::from("/home/me/.config/audiowatch/config.toml"))
        );
        assert_eq!(config_path_from(None, None), None);
    }
}
