pub mod context;
pub mod diagnostics;
pub mod error;
pub mod hw;
pub mod message;
pub mod watcher;

pub use context::{ContextThread, ExecutionContext};
pub use diagnostics::{Diagnostic, Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use error::WatcherError;
pub use hw::options::{BackendKind, WatcherOptions};
pub use hw::property::{HardwareEvent, PropertyAddress, PropertySelector, WATCHED_SELECTORS};
pub use hw::sim::SimulatedHardware;
pub use watcher::{Callback, CallbackError, HardwareWatcher};

#[cfg(target_os = "macos")]
pub use hw::coreaudio::SystemObjectListeners;
