pub mod config;
pub mod deck;
pub mod errors;
pub mod logging;
pub mod ui;
