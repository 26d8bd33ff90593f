use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Logs go to stderr; stdout carries events.
///
/// `-v` flags raise the configured level; `RUST_LOG` overrides both.
pub fn init_logging(level: LogLevel, verbose_count: u8) {
    let effective_level = match verbose_count {
        0 => level,
        1 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };

    let filter = match effective_level {
        LogLevel::Error => "audiowatch=error,audiowatch_engine=error",
        LogLevel::Warn => "audiowatch=warn,audiowatch_engine=warn",
        LogLevel::Info => "audiowatch=info,audiowatch_engine=info",
        LogLevel::Debug => "audiowatch=debug,audiowatch_engine=debug",
        LogLevel::Trace => "audiowatch=trace,audiowatch_engine=trace",
    };

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
