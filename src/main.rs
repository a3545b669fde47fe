use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "tui-deck")]
#[command(version, about = "Terminal client for Nextcloud Deck boards")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Server url, overrides config file and DECK_URL
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Login name, overrides config file and DECK_USER
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the boards visible to the configured user
    Boards {
        /// Include archived boards
        #[arg(long)]
        all: bool,
    },
    /// Print one board and exit
    Show {
        /// Board id
        board: i64,
    },
    /// Open a board in the interactive client
    Open {
        /// Board id (defaults to `default_board`, otherwise a picker is shown)
        board: Option<i64>,
    },
    /// View, create or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration (password hidden)
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Write a default config.toml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = match tui_deck::logging::init(cli.verbose) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("warning: file logging disabled: {:#}", e);
            None
        }
    };

    match &cli.command {
        Commands::Boards { all } => cmd::cmd_boards(&cli, *all).await?,
        Commands::Show { board } => cmd::cmd_show(&cli, *board).await?,
        Commands::Open { board } => cmd::cmd_open(&cli, *board).await?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
