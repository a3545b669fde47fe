//! Configuration view and validation commands — `tui-deck config`.

use anyhow::Result;

use tui_deck::config::DeckConfig;

use super::client::load_config;
use crate::{Cli, ConfigCommands};

fn print_config(config: &DeckConfig) {
    let shown = config.redacted();
    println!("  url = \"{}\"", shown.url);
    println!("  user = \"{}\"", shown.user);
    println!("  password = \"{}\"", shown.password);
    println!("  color = {}", shown.color);
    match shown.default_board {
        Some(id) => println!("  default_board = {}", id),
        None => println!("  default_board = (none)"),
    }
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let (config, config_path) = load_config(cli)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("tui-deck Configuration");
            println!("======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config.toml found at {}", config_path.display());
                println!("Run 'tui-deck config init' to create one.");
            }
            println!();
            println!("Effective values (with env/CLI overrides):");
            print_config(&config);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("config.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            // flags and env given at init time are written into the file
            let initial = DeckConfig {
                url: config.url,
                user: config.user,
                ..DeckConfig::default()
            };
            initial.save(&config_path)?;

            println!("Created config.toml at {}", config_path.display());
            println!();
            println!("You can now set:");
            println!("  - url, user, password (or DECK_URL / DECK_USER / DECK_PASSWORD)");
            println!("  - default_board, color");
            println!();
        }
    }

    Ok(())
}
