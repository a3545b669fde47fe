//! Deck board client core.
//!
//! | Module     | Role                                                   |
//! |------------|--------------------------------------------------------|
//! | `models`   | Board, stack, card, label, user and comment records    |
//! | `dates`    | Due-date formats and form input filters                |
//! | `store`    | In-memory mirror of one board plus the open card       |
//! | `comments` | Comment thread of the open card and its reply tree     |
//! | `api`      | `DeckApi` gateway trait and request bodies             |
//! | `http`     | `reqwest` implementation of `DeckApi`                  |
//! | `status`   | One-way status channel for background results          |
//! | `engine`   | Optimistic mutations: local apply, background confirm  |
//! | `render`   | Board view model and the `RenderOp` contract           |

pub mod api;
pub mod comments;
pub mod dates;
pub mod engine;
pub mod http;
pub mod models;
pub mod render;
pub mod status;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use api::DeckApi;
pub use engine::{Answer, CardForm, Confirmation, Direction, MutationEngine};
pub use http::HttpDeckApi;
pub use render::{BoardView, RenderOp};
pub use status::{StatusBar, StatusSender};
pub use store::DeckStore;
