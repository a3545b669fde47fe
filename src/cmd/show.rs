//! One-shot board print — `tui-deck show <board>`.

use anyhow::{Context, Result};
use std::sync::Arc;

use tui_deck::deck::status;
use tui_deck::deck::{BoardView, MutationEngine};
use tui_deck::ui::board::render_board;
use tui_deck::ui::spinner;

use super::client::connect;
use crate::Cli;

pub async fn cmd_show(cli: &Cli, board_id: i64) -> Result<()> {
    let (config, api) = connect(cli)?;
    let (tx, _bar) = status::channel();

    let bar = spinner("Loading board...");
    let engine = MutationEngine::connect(Arc::new(api), tx, board_id, config.user.clone()).await;
    bar.finish_and_clear();
    let engine = engine.with_context(|| format!("Failed to load board {}", board_id))?;

    let view = BoardView::build(engine.store(), None);
    println!("{}", render_board(&view, config.color));
    Ok(())
}
