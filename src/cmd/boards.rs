//! Board listing — `tui-deck boards`.

use anyhow::{Context, Result};
use console::style;

use tui_deck::deck::DeckApi;
use tui_deck::deck::api::BoardSummary;
use tui_deck::ui::spinner;

use super::client::connect;
use crate::Cli;

pub fn visible(boards: Vec<BoardSummary>, include_archived: bool) -> Vec<BoardSummary> {
    boards
        .into_iter()
        .filter(|b| include_archived || !b.archived)
        .collect()
}

pub async fn cmd_boards(cli: &Cli, all: bool) -> Result<()> {
    let (config, api) = connect(cli)?;

    let bar = spinner("Loading boards...");
    let boards = api.list_boards().await;
    bar.finish_and_clear();
    let boards = visible(boards.context("Failed to list boards")?, all);

    if boards.is_empty() {
        println!("No boards found.");
        return Ok(());
    }
    for board in boards {
        let id = format!("{:>5}", board.id);
        let archived = if board.archived { " (archived)" } else { "" };
        if config.color {
            println!("{}  {}{}", style(id).dim(), board.title, style(archived).dim());
        } else {
            println!("{}  {}{}", id, board.title, archived);
        }
    }
    Ok(())
}
