//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `boards`  | `Boards`         |
//! | `show`    | `Show`           |
//! | `open`    | `Open`           |
//! | `config`  | `Config`         |
//!
//! `client` holds the config → gateway plumbing they share.

pub mod boards;
pub mod client;
pub mod config;
pub mod open;
pub mod show;

pub use boards::cmd_boards;
pub use config::cmd_config;
pub use open::cmd_open;
pub use show::cmd_show;
