//! File logging.
//!
//! The terminal belongs to the prompts, so tracing output goes to
//! `<data_local_dir>/tui-deck/logs/tui-deck.log` (override the directory
//! with `TUI_DECK_LOG_DIR`). `RUST_LOG` replaces the default filter.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE: &str = "tui-deck.log";

pub fn log_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TUI_DECK_LOG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tui-deck")
        .join("logs")
}

fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "tui_deck=debug,warn"
    } else {
        "tui_deck=info,warn"
    }
}

/// Installs the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn init(verbose: bool) -> Result<WorkerGuard> {
    let dir = log_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbose).into()))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(log = %dir.join(LOG_FILE).display(), "logging started");
    Ok(guard)
}
