//! Interactive client — `tui-deck open [board]`.

use anyhow::{Context, Result, bail};
use dialoguer::{Select, theme::ColorfulTheme};
use std::sync::Arc;

use tui_deck::deck::{DeckApi, HttpDeckApi, MutationEngine, status};
use tui_deck::ui::{Session, spinner};

use super::boards::visible;
use super::client::connect;
use crate::Cli;

async fn pick_board(api: &HttpDeckApi) -> Result<i64> {
    let bar = spinner("Loading boards...");
    let boards = api.list_boards().await;
    bar.finish_and_clear();
    let boards = visible(boards.context("Failed to list boards")?, false);
    if boards.is_empty() {
        bail!("No boards found for this account.");
    }

    let names: Vec<String> = boards
        .iter()
        .map(|b| format!("#{} {}", b.id, b.title))
        .collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Open which board?")
        .items(&names)
        .default(0)
        .interact()?;
    Ok(boards[selection].id)
}

pub async fn cmd_open(cli: &Cli, board: Option<i64>) -> Result<()> {
    let (config, api) = connect(cli)?;
    let board_id = match board.or(config.default_board) {
        Some(id) => id,
        None => pick_board(&api).await?,
    };

    let (tx, status_bar) = status::channel();
    let bar = spinner("Loading board...");
    let engine = MutationEngine::connect(Arc::new(api), tx, board_id, config.user.clone()).await;
    bar.finish_and_clear();
    let engine = engine.with_context(|| format!("Failed to load board {}", board_id))?;

    tracing::info!(board_id, "session started");
    Session::new(engine, status_bar, config.color).run().await?;
    tracing::info!(board_id, "session ended");
    Ok(())
}
