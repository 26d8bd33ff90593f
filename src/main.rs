mod config;
mod host;
mod logging;

use audiowatch_engine::{BackendKind, HardwareWatcher, SimulatedHardware};
use clap::Parser;
use config::{AppConfig, LogLevel, OutputFormat};
use std::path::PathBuf;
use std::sync::Arc;

/// Print system audio hardware changes as they happen
#[derive(Parser, Debug)]
#[command(name = "audiowatch")]
#[command(version, about, long_about = None)]
struct CliArgs {
    /// Config file (default: $XDG_CONFIG_HOME/audiowatch/config.toml)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Notification source (coreaudio, simulated)
    #[arg(short = 'b', long, value_name = "BACKEND")]
    backend: Option<BackendKind>,

    /// Event output format
    #[arg(short = 'f', long, value_name = "FORMAT")]
    format: Option<OutputFormat>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, value_name = "LEVEL")]
    log_level: Option<LogLevel>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = AppConfig::load(args.config.as_deref())?;

    logging::init_logging(args.log_level.unwrap_or(config.log_level), args.verbose);
    tracing::info!("Starting audiowatch v{}", env!("CARGO_PKG_VERSION"));

    let mut options = config.watcher_options();
    if let Some(backend) = args.backend {
        options.backend = backend;
    }
    let format = args.format.unwrap_or(config.format);

    match options.backend {
        BackendKind::Simulated => {
            let hw = Arc::new(SimulatedHardware::new());
            let watcher = HardwareWatcher::with_options(hw.clone(), &options)?;
            tracing::info!("simulated backend: type codes like `dOut dev#` on stdin");
            host::run(watcher, format, Some(hw)).await
        }
        BackendKind::CoreAudio => run_coreaudio(&options, format).await,
    }
}

#[cfg(target_os = "macos")]
async fn run_coreaudio(
    options: &audiowatch_engine::WatcherOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let backend = Arc::new(audiowatch_engine::SystemObjectListeners::new());
    let watcher = HardwareWatcher::with_options(backend, options)?;
    host::run(watcher, format, None).await
}

#[cfg(not(target_os = "macos"))]
async fn run_coreaudio(
    _options: &audiowatch_engine::WatcherOptions,
    _format: OutputFormat,
) -> anyhow::Result<()> {
    Err(audiowatch_engine::WatcherError::Unsupported(
        "the coreaudio backend needs macOS; try --backend simulated".to_string(),
    )
    .into())
}
