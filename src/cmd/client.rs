//! Shared setup: resolve configuration and build the HTTP gateway.

use anyhow::{Context, Result, bail};
use dialoguer::{Password, theme::ColorfulTheme};
use std::path::PathBuf;

use tui_deck::config::{CliOverrides, DeckConfig};
use tui_deck::deck::HttpDeckApi;

use crate::Cli;

pub fn overrides(cli: &Cli) -> CliOverrides {
    CliOverrides {
        url: cli.url.clone(),
        user: cli.user.clone(),
    }
}

/// Config file → environment → flags.
pub fn load_config(cli: &Cli) -> Result<(DeckConfig, PathBuf)> {
    let (mut config, path) = DeckConfig::resolve(cli.config.as_deref(), &overrides(cli))?;
    if cli.no_color {
        config.color = false;
    }
    Ok((config, path))
}

/// Builds the gateway, asking for the password when none is configured.
pub fn connect(cli: &Cli) -> Result<(DeckConfig, HttpDeckApi)> {
    let (mut config, path) = load_config(cli)?;
    if config.url.trim().is_empty() || config.user.trim().is_empty() {
        bail!(
            "Server url and user are required. Set them in {} or via DECK_URL / DECK_USER.",
            path.display()
        );
    }
    if config.password.is_empty() {
        config.password = Password::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Password for {}", config.user))
            .interact()
            .context("Failed to read password")?;
    }
    tracing::info!(url = %config.base_url(), user = %config.user, "connecting");
    let api = HttpDeckApi::from_config(&config).context("Failed to create HTTP client")?;
    Ok((config, api))
}
