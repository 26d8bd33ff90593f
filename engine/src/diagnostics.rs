//! Host diagnostic channel.
//!
//! Usage mistakes and failures that must not crash the watcher are reported
//! here instead of being returned to whoever triggered them (often an OS
//! thread with nobody to return to).

use std::error::Error as StdError;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    #[error("hardware watcher start() called without a callback")]
    MissingCallback,

    #[error("hardware notification {codes:?} arrived with no callback registered; dropped")]
    OrphanedNotification { codes: Vec<String> },

    #[error("hardware watcher callback failed for '{code}': {message}")]
    CallbackFailed { code: String, message: String },

    #[error("hardware watcher: {message}")]
    OsFailure { message: String },
}

pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: everything goes to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::MissingCallback | Diagnostic::OrphanedNotification { .. } => {
                warn!("{diagnostic}")
            }
            Diagnostic::CallbackFailed { .. } | Diagnostic::OsFailure { .. } => {
                error!("{diagnostic}")
            }
        }
    }
}

/// Keeps every diagnostic in memory, for hosts that surface them later and
/// for tests.
#[derive(Debug, Default)]
pub struct RecordingDiagnostics {
    reports: Mutex<Vec<Diagnostic>>,
}

impl RecordingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<Diagnostic> {
        match self.reports.lock() {
            Ok(reports) => reports.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn take(&self) -> Vec<Diagnostic> {
        match self.reports.lock() {
            Ok(mut reports) => std::mem::take(&mut *reports),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match self.reports.lock() {
            Ok(mut reports) => reports.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Best-effort text of a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug)]
    struct Outer(Inner);

    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "callback raised")
        }
    }

    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "device gone")
        }
    }

    impl StdError for Outer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    impl StdError for Inner {}

    #[test]
    fn error_chain_lists_causes() {
        assert_eq!(
            error_chain(&Outer(Inner)),
            "callback raised\n  caused by: device gone"
        );
    }

    #[test]
    fn recording_sink_keeps_order() {
        let sink = RecordingDiagnostics::new();
        sink.report(Diagnostic::MissingCallback);
        sink.report(Diagnostic::OrphanedNotification {
            codes: vec!["dOut".to_string()],
        });
        assert_eq!(sink.reports().len(), 2);
        assert_eq!(sink.take()[0], Diagnostic::MissingCallback);
        assert!(sink.reports().is_empty());
    }
}
