//! Runs a watcher until interrupted and prints one line per event.

use crate::config::OutputFormat;
use audiowatch_engine::hw::property::parse_selector;
use audiowatch_engine::hw::traits::HwListenerBackend;
use audiowatch_engine::{
    Callback, HardwareEvent, HardwareWatcher, PropertyAddress, SimulatedHardware,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Serialize)]
struct EventLine<'a> {
    code: &'a str,
    event: HardwareEvent,
}

pub fn format_event(code: &str, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Text => Ok(code.to_string()),
        OutputFormat::Json => serde_json::to_string(&EventLine {
            code,
            event: HardwareEvent::from_code(code),
        }),
    }
}

fn printer(format: OutputFormat) -> Callback {
    Box::new(move |code: &str| {
        let line = format_event(code, format)?;
        let mut out = std::io::stdout().lock();
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    })
}

/// Parse one stdin line (`dOut dev#`) into a notification batch.
pub fn parse_batch(line: &str) -> Result<Vec<PropertyAddress>, String> {
    line.split_whitespace()
        .map(|code| {
            parse_selector(code)
                .map(PropertyAddress::global)
                .ok_or_else(|| format!("not a four-character code: {code:?}"))
        })
        .collect()
}

/// Start `watcher` and block until Ctrl-C, or until stdin closes when
/// `inject` feeds simulated notifications from it.
pub async fn run<B: HwListenerBackend + 'static>(
    watcher: HardwareWatcher<B>,
    format: OutputFormat,
    inject: Option<Arc<SimulatedHardware>>,
) -> anyhow::Result<()> {
    watcher.set_callback(Some(printer(format)))?;
    watcher.start()?;
    info!("{} watcher running; Ctrl-C to quit", B::LABEL);

    match inject {
        Some(hw) => {
            tokio::select! {
                res = tokio::signal::ctrl_c() => res?,
                res = inject_from_stdin(hw) => res?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    watcher.stop()?;
    watcher.set_callback(None)?;
    Ok(())
}

async fn inject_from_stdin(hw: Arc<SimulatedHardware>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let batch = match parse_batch(&line) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("{e}");
                continue;
            }
        };
        // notify() blocks until the callback has run.
        let hw = hw.clone();
        tokio::task::spawn_blocking(move || hw.notify(&batch)).await?;
    }
    info!("stdin closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use audiowatch_engine::PropertySelector;

    #[test]
    fn text_format_is_the_bare_code() {
        assert_eq!(format_event("dOut", OutputFormat::Text).unwrap(), "dOut");
    }

    #[test]
    fn json_format_names_the_event() {
        assert_eq!(
            format_event("sOut", OutputFormat::Json).unwrap(),
            r#"{"code":"sOut","event":"default_system_output"}"#
        );
        assert_eq!(
            format_event("nams", OutputFormat::Json).unwrap(),
            r#"{"code":"nams","event":{"other":"nams"}}"#
        );
    }

    #[test]
    fn parse_batch_keeps_order() {
        let batch = parse_batch("dOut  dev#").unwrap();
        let selectors: Vec<_> = batch.iter().map(|a| a.selector).collect();
        assert_eq!(
            selectors,
            vec![PropertySelector::DEFAULT_OUTPUT_DEVICE, PropertySelector::DEVICES]
        );
        assert!(parse_batch("dOut toolong").is_err());
    }
}
