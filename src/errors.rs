//! Typed error hierarchy for the Deck client.
//!
//! Two top-level enums cover the two failure families:
//! - `DeckError` — remote gateway and configuration failures
//! - `MutationError` — local validation rejections raised before any
//!   network call is made

use thiserror::Error;

/// Errors from the remote Deck gateway and client setup.
#[derive(Debug, Error)]
pub enum DeckError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deck API returned {status} for {path}: {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    #[error("Failed to decode Deck response for {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Board {id} not found")]
    BoardNotFound { id: i64 },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Local rejections. None of these reach the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("card #{id} not found")]
    CardNotFound { id: i64 },

    #[error("stack {id} not found")]
    StackNotFound { id: i64 },

    #[error("no card is open for editing")]
    NoOpenCard,

    #[error("label already assigned")]
    LabelAlreadyAssigned { label_id: i64 },

    #[error("label is not assigned to this card")]
    LabelNotAssigned { label_id: i64 },

    #[error("label {label_id} is not part of this board")]
    UnknownLabel { label_id: i64 },

    #[error("user already assigned")]
    UserAlreadyAssigned { uid: String },

    #[error("user is not assigned to this card")]
    UserNotAssigned { uid: String },

    #[error("user {uid} is not a member of this board")]
    UnknownUser { uid: String },

    #[error("no comments loaded for card #{card_id}")]
    CommentsNotLoaded { card_id: i64 },

    #[error("comment {id} not found")]
    CommentNotFound { id: i64 },

    #[error("nothing is waiting for confirmation")]
    NothingToConfirm,
}
