use crate::hw::config::{self, BACKEND_ENV, TRACE_EVENTS_ENV};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    CoreAudio,
    Simulated,
}

impl BackendKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::CoreAudio => "coreaudio",
            Self::Simulated => "simulated",
        }
    }
}

#[cfg(target_os = "macos")]
impl Default for BackendKind {
    fn default() -> Self {
        Self::CoreAudio
    }
}

#[cfg(not(target_os = "macos"))]
impl Default for BackendKind {
    fn default() -> Self {
        Self::Simulated
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coreaudio" | "core-audio" => Ok(Self::CoreAudio),
            "simulated" | "sim" => Ok(Self::Simulated),
            other => Err(format!("unknown backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherOptions {
    pub backend: BackendKind,
    pub context_thread: String,
    pub trace_events: bool,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            context_thread: "audiowatch-main".to_string(),
            trace_events: false,
        }
    }
}

impl WatcherOptions {
    /// Apply `AUDIOWATCH_BACKEND` and `AUDIOWATCH_TRACE_EVENTS`.
    pub fn with_env(mut self) -> Self {
        if let Some(value) = config::env_string(BACKEND_ENV) {
            match value.parse() {
                Ok(kind) => self.backend = kind,
                Err(e) => tracing::warn!("ignoring {BACKEND_ENV}: {e}"),
            }
        }
        if config::env_flag(TRACE_EVENTS_ENV) {
            self.trace_events = true;
        }
        self
    }
}
