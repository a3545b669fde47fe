//! In-memory `DeckApi` that records every call.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;

use super::api::{
    BoardSummary, CardRef, CommentRequest, CreateCardRequest, DeckApi, LabelRequest,
    UpdateCardRequest, UserRequest,
};
use super::models::{Board, Card, Comment, Stack};
use crate::errors::DeckError;

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CreateCard(i64, CreateCardRequest),
    UpdateCard(CardRef, UpdateCardRequest),
    DeleteCard(CardRef),
    AssignLabel(CardRef, i64),
    RemoveLabel(CardRef, i64),
    AssignUser(CardRef, String),
    UnassignUser(CardRef, String),
    ListComments(i64),
    CreateComment(i64, CommentRequest),
    UpdateComment(i64, i64, CommentRequest),
    DeleteComment(i64, i64),
}

pub struct RecordingApi {
    board: Board,
    stacks: Vec<Stack>,
    comments: Vec<Comment>,
    calls: Mutex<Vec<ApiCall>>,
    fail: AtomicBool,
    next_id: AtomicI64,
}

impl RecordingApi {
    pub fn new(board: Board, stacks: Vec<Stack>) -> Self {
        Self {
            board,
            stacks,
            comments: Vec::new(),
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            next_id: AtomicI64::new(1000),
        }
    }

    pub fn with_comments(mut self, comments: Vec<Comment>) -> Self {
        self.comments = comments;
        self
    }

    /// Every later call fails with a 500.
    pub fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ApiCall) -> Result<(), DeckError> {
        self.calls.lock().unwrap().push(call);
        if self.fail.load(Ordering::SeqCst) {
            return Err(DeckError::Api {
                status: 500,
                path: "/test".into(),
                message: "boom".into(),
            });
        }
        Ok(())
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

#[async_trait]
impl DeckApi for RecordingApi {
    async fn list_boards(&self) -> Result<Vec<BoardSummary>, DeckError> {
        Ok(vec![BoardSummary {
            id: self.board.id,
            title: self.board.title.clone(),
            archived: false,
        }])
    }

    async fn get_board(&self, board_id: i64) -> Result<Board, DeckError> {
        if board_id != self.board.id || self.fail.load(Ordering::SeqCst) {
            return Err(DeckError::BoardNotFound { id: board_id });
        }
        Ok(self.board.clone())
    }

    async fn list_stacks(&self, _board_id: i64) -> Result<Vec<Stack>, DeckError> {
        Ok(self.stacks.clone())
    }

    async fn create_card(
        &self,
        _board_id: i64,
        stack_id: i64,
        request: &CreateCardRequest,
    ) -> Result<Card, DeckError> {
        self.record(ApiCall::CreateCard(stack_id, request.clone()))?;
        Ok(Card {
            id: self.next_id(),
            title: request.title.clone(),
            description: request.description.clone(),
            stack_id,
            order: request.order,
            due_date: request.due_date,
            labels: vec![],
            assigned_users: vec![],
            kind: request.kind.clone(),
        })
    }

    async fn update_card(
        &self,
        at: CardRef,
        request: &UpdateCardRequest,
    ) -> Result<Card, DeckError> {
        self.record(ApiCall::UpdateCard(at, request.clone()))?;
        Ok(Card {
            id: at.card_id,
            title: request.title.clone(),
            description: request.description.clone().unwrap_or_default(),
            stack_id: request.stack_id.unwrap_or(at.stack_id),
            order: request.order.unwrap_or_default(),
            due_date: request.due_date,
            labels: vec![],
            assigned_users: vec![],
            kind: request.kind.clone(),
        })
    }

    async fn delete_card(&self, at: CardRef) -> Result<(), DeckError> {
        self.record(ApiCall::DeleteCard(at))
    }

    async fn assign_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError> {
        self.record(ApiCall::AssignLabel(at, request.label_id))
    }

    async fn remove_label(&self, at: CardRef, request: &LabelRequest) -> Result<(), DeckError> {
        self.record(ApiCall::RemoveLabel(at, request.label_id))
    }

    async fn assign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError> {
        self.record(ApiCall::AssignUser(at, request.user_id.clone()))
    }

    async fn unassign_user(&self, at: CardRef, request: &UserRequest) -> Result<(), DeckError> {
        self.record(ApiCall::UnassignUser(at, request.user_id.clone()))
    }

    async fn list_comments(&self, card_id: i64) -> Result<Vec<Comment>, DeckError> {
        self.record(ApiCall::ListComments(card_id))?;
        Ok(self
            .comments
            .iter()
            .filter(|c| c.card_id == card_id)
            .cloned()
            .collect())
    }

    async fn create_comment(
        &self,
        card_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError> {
        self.record(ApiCall::CreateComment(card_id, request.clone()))?;
        Ok(Comment {
            id: self.next_id(),
            card_id,
            author_id: "alice".into(),
            author_name: "Alice Smith".into(),
            message: request.message.clone(),
            // the service echoes the parent as a nested object; leave it
            // out to exercise the engine's fallback
            parent_id: None,
            created_at: None,
        })
    }

    async fn update_comment(
        &self,
        card_id: i64,
        comment_id: i64,
        request: &CommentRequest,
    ) -> Result<Comment, DeckError> {
        self.record(ApiCall::UpdateComment(card_id, comment_id, request.clone()))?;
        Ok(Comment {
            id: comment_id,
            card_id,
            author_id: "alice".into(),
            author_name: "Alice Smith".into(),
            message: request.message.clone(),
            parent_id: request.parent_id,
            created_at: None,
        })
    }

    async fn delete_comment(&self, card_id: i64, comment_id: i64) -> Result<(), DeckError> {
        self.record(ApiCall::DeleteComment(card_id, comment_id))
    }
}
