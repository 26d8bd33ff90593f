pub mod config;
#[cfg(target_os = "macos")]
pub mod coreaudio;
pub mod error_fmt;
pub mod options;
pub mod property;
pub mod sim;
pub mod traits;
