//! The remote gateway seam.
//!
//! `DeckApi` is what the mutation engine talks to. The real implementation
//! is [`super::http::HttpDeckApi`]; tests use an in-memory recorder. Every
//! mutation has its own typed request body.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dates;
use super::models::{Board, Card, Comment, Stack};
use crate::errors::DeckError;

/// Summary row returned by the board listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub archived: bool,
}

/// Addresses one card: `/boards/{board}/stacks/{stack}/cards/{card}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardRef {
    pub board_id: i64,
    pub stack_id: i64,
    pub card_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateCardRequest {
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: i64,
    #[serde(
        rename = "duedate",
        with = "dates::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

/// Fields sent on card update. Unset optionals are left out of the body so
/// the service keeps its current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(
        rename = "duedate",
        with = "dates::lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
}

impl UpdateCardRequest {
    /// Full field update from a card snapshot.
    pub fn from_card(card: &Card, owner: &str) -> Self {
        Self {
            title: card.title.clone(),
            kind: card.kind.clone(),
            owner: owner.to_string(),
            description: Some(card.description.clone()),
            stack_id: None,
            order: Some(card.order),
            due_date: card.due_date,
        }
    }

    /// Stack change only.
    pub fn move_to(card: &Card, owner: &str, dest_stack_id: i64) -> Self {
        Self {
            title: card.title.clone(),
            kind: card.kind.clone(),
            owner: owner.to_string(),
            description: None,
            stack_id: Some(dest_stack_id),
            order: None,
            due_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelRequest {
    pub label_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

#[async_trait]
pub trait DeckApi: Send + Sync {
    async fn list_boards(&self) -> Result<Vec<BoardSummary>, DeckError>;

    async fn get_board(&self, board_id: i64) -> Result<Board, DeckError>;

    async fn list_stacks(&self, board_id: i64) -> Result<Vec<Stack>, DeckError>;

    async fn create_card(
        &self,
        board_id: i64,
        stack_id: i64,
        request: &CreateCardRequest,
    ) -> Result<Card, DeckError>;

    /// `at.stack_id` is the stack the card is in before the update.
    async fn update_card(&self, at: CardRef, request: &UpdateCardRequest)
    -> Result<Card, DeckError>;

    async fn delete_card(&self, at: CardRef) -> Result<(), DeckError>;

    async fn assign_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError>;

    async fn remove_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError>;

    async fn assign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError>;

    async fn unassign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError>;

    async fn list_comments(&self, card_id: i64) -> Result<Vec<Comment>, DeckError>;

    async fn create_comment(
        &self,
        card_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError>;

    async fn update_comment(
        &self,
        card_id: i64,
        comment_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError>;

    async fn delete_comment(&self, card_id: i64, comment_id: i64) -> Result<(), DeckError>;
}
