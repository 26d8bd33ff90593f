use crate::hw::error_fmt::OsStatus;
use crate::hw::property::PropertySelector;
use thiserror::Error;

/// Errors returned by the watcher and its listener backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WatcherError {
    #[error("no callback registered; call set_callback before start")]
    NoCallback,

    #[error("CoreAudio {operation} {selector} failed: {status}")]
    Os {
        operation: &'static str,
        selector: PropertySelector,
        status: OsStatus,
    },

    #[error("execution context is shut down")]
    ContextClosed,

    #[error("failed to spawn execution context thread {0}")]
    ContextSpawn(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl WatcherError {
    pub fn os(operation: &'static str, selector: PropertySelector, status: i32) -> Self {
        Self::Os {
            operation,
            selector,
            status: OsStatus(status),
        }
    }

    /// The raw `OSStatus`, when the error came from the audio subsystem.
    pub fn os_status(&self) -> Option<i32> {
        match self {
            Self::Os { status, .. } => Some(status.0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_error_names_operation_selector_and_status() {
        let err = WatcherError::os(
            "AudioObjectAddPropertyListener",
            PropertySelector::DEFAULT_OUTPUT_DEVICE,
            -1504,
        );
        assert_eq!(
            err.to_string(),
            "CoreAudio AudioObjectAddPropertyListener 'dOut' failed: kAudioHardwareIllegalOperationError (-1504)"
        );
        assert_eq!(err.os_status(), Some(-1504));
        assert_eq!(WatcherError::NoCallback.os_status(), None);
    }
}
