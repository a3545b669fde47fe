//! Optimistic mutation engine.
//!
//! Every user action runs in two phases:
//!
//! 1. **Local apply**: the [`DeckStore`] is updated synchronously on the
//!    UI task.
//! 2. **Remote confirm**: the matching gateway call is spawned in the
//!    background and never awaited by the caller. A failure becomes a
//!    status line; the local change is kept.
//!
//! Background tasks get a clone of the gateway and a [`StatusSender`]
//! only, so they cannot reach the store. Network completions may arrive in
//! any order without affecting what is on screen.
//!
//! Card creation and comment creation are the exceptions: the service
//! assigns their ids, so those calls are awaited before the store changes.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;

use super::api::{
    CardRef, CommentRequest, CreateCardRequest, DeckApi, LabelRequest, UpdateCardRequest,
    UserRequest,
};
use super::comments::{CommentNode, CommentThread};
use super::dates;
use super::models::{AssignedUser, Card, default_card_kind};
use super::render::RenderOp;
use super::status::StatusSender;
use super::store::DeckStore;
use crate::errors::{DeckError, MutationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Left => "prev",
            Direction::Right => "next",
        }
    }
}

/// Answer to a two-option prompt. `Escape` behaves like `No`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub prompt: String,
    pub options: [&'static str; 2],
}

impl Confirmation {
    fn new(prompt: String) -> Self {
        Self {
            prompt,
            options: ["Yes", "No"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingAction {
    DeleteCard { card_id: i64 },
    MoveCard { card_id: i64, direction: Direction },
    DeleteComment { comment_id: i64 },
}

/// Edit-form values as the user sees them. `due_date` is in display format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CardForm {
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub order: String,
}

impl CardForm {
    /// Stored -> display conversion at edit-open time.
    pub fn from_card(card: &Card) -> Self {
        Self {
            title: card.title.clone(),
            description: card.description.clone(),
            due_date: card
                .due_date
                .as_ref()
                .map(dates::to_display)
                .unwrap_or_default(),
            order: card.order.to_string(),
        }
    }

    /// Draft for a new card: order defaults to 0.
    pub fn new_card() -> Self {
        Self {
            order: "0".to_string(),
            ..Self::default()
        }
    }
}

pub struct MutationEngine {
    store: DeckStore,
    api: Arc<dyn DeckApi>,
    status: StatusSender,
    owner: String,
    pending: Option<PendingAction>,
    in_flight: JoinSet<()>,
}

impl MutationEngine {
    pub fn new(
        store: DeckStore,
        api: Arc<dyn DeckApi>,
        status: StatusSender,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            store,
            api,
            status,
            owner: owner.into(),
            pending: None,
            in_flight: JoinSet::new(),
        }
    }

    /// Loads board and stacks once and builds the engine around them.
    pub async fn connect(
        api: Arc<dyn DeckApi>,
        status: StatusSender,
        board_id: i64,
        owner: impl Into<String>,
    ) -> Result<Self, DeckError> {
        let store = fetch_store(api.as_ref(), board_id).await?;
        tracing::info!(
            board_id,
            stacks = store.stacks().len(),
            cards = store.card_count(),
            "board loaded"
        );
        Ok(Self::new(store, api, status, owner))
    }

    pub fn store(&self) -> &DeckStore {
        &self.store
    }

    pub fn board_id(&self) -> i64 {
        self.store.board().id
    }

    /// Background calls not yet finished (or finished but not reaped).
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Waits for every dispatched call to finish. Nothing is cancelled.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "background call panicked");
            }
        }
    }

    /// Re-fetches the whole board on explicit request. On failure the
    /// current mirror is kept.
    pub async fn reload(&mut self) -> Vec<RenderOp> {
        match fetch_store(self.api.as_ref(), self.board_id()).await {
            Ok(store) => {
                self.store = store;
                self.pending = None;
                self.status.info("board reloaded");
                vec![RenderOp::Rebuild { focus: None }]
            }
            Err(e) => {
                self.status.error(format!("Error reloading board: {}", e));
                Vec::new()
            }
        }
    }

    // ── Editable card ─────────────────────────────────────────────────

    pub fn open_card(&mut self, card_id: i64) -> Result<&Card, MutationError> {
        if self.store.card(card_id).is_none() {
            return self.reject(MutationError::CardNotFound { id: card_id });
        }
        self.store.open_card(card_id)
    }

    pub fn close_card(&mut self) {
        self.store.close_card();
    }

    pub fn editable(&self) -> Option<&Card> {
        self.store.editable()
    }

    pub fn card_form(&self) -> Result<CardForm, MutationError> {
        self.store
            .editable()
            .map(CardForm::from_card)
            .ok_or(MutationError::NoOpenCard)
    }

    /// Display -> stored conversion at save time. An untouched due date
    /// keeps the stored instant; an unparsable one clears the field; a
    /// non-numeric order becomes 0.
    pub fn save_card_form(&mut self, form: CardForm) -> Result<Vec<RenderOp>, MutationError> {
        let Some(current) = self.store.editable().map(|card| card.due_date) else {
            return self.reject(MutationError::NoOpenCard);
        };
        let due_date = match current {
            Some(due) if form.due_date == dates::to_display(&due) => Some(due),
            _ => dates::parse_display(&form.due_date),
        };
        let order = dates::parse_order(&form.order);
        let card = self
            .store
            .update_editable(|card| {
                card.title = form.title;
                card.description = form.description;
                card.due_date = due_date;
                card.order = order;
            })?
            .clone();

        self.push_card_update(&card, "updating card");
        Ok(vec![RenderOp::Rebuild {
            focus: Some(card.id),
        }])
    }

    pub fn save_description(&mut self, text: &str) -> Result<Vec<RenderOp>, MutationError> {
        if self.store.editable().is_none() {
            return self.reject(MutationError::NoOpenCard);
        }
        let card = self
            .store
            .update_editable(|card| card.description = text.to_string())?
            .clone();
        self.push_card_update(&card, "updating card");
        Ok(vec![RenderOp::UpdateItem { card_id: card.id }])
    }

    fn push_card_update(&mut self, card: &Card, action: &'static str) {
        let at = self.card_ref(card);
        let request = UpdateCardRequest::from_card(card, &self.owner);
        let api = Arc::clone(&self.api);
        self.dispatch(action, async move {
            api.update_card(at, &request).await.map(|_| ())
        });
    }

    // ── Labels ────────────────────────────────────────────────────────

    pub fn assign_label(&mut self, label_id: i64) -> Result<Vec<RenderOp>, MutationError> {
        let Some(label) = self.store.board().label(label_id).cloned() else {
            return self.reject(MutationError::UnknownLabel { label_id });
        };
        let open = self.open_snapshot()?;
        if open.has_label(label_id) {
            return self.reject(MutationError::LabelAlreadyAssigned { label_id });
        }

        let card = self
            .store
            .update_editable(|card| card.labels.push(label))?
            .clone();
        let at = self.card_ref(&card);
        let api = Arc::clone(&self.api);
        self.dispatch("assigning tag to card", async move {
            api.assign_label(at, &LabelRequest { label_id }).await
        });
        Ok(vec![RenderOp::Rebuild {
            focus: Some(card.id),
        }])
    }

    pub fn unassign_label(&mut self, label_id: i64) -> Result<Vec<RenderOp>, MutationError> {
        let open = self.open_snapshot()?;
        if !open.has_label(label_id) {
            return self.reject(MutationError::LabelNotAssigned { label_id });
        }

        let card = self
            .store
            .update_editable(|card| card.labels.retain(|l| l.id != label_id))?
            .clone();
        let at = self.card_ref(&card);
        let api = Arc::clone(&self.api);
        self.dispatch("deleting tag from card", async move {
            api.remove_label(at, &LabelRequest { label_id }).await
        });
        Ok(vec![RenderOp::Rebuild {
            focus: Some(card.id),
        }])
    }

    // ── Assignees ─────────────────────────────────────────────────────

    pub fn assign_user(&mut self, uid: &str) -> Result<Vec<RenderOp>, MutationError> {
        let Some(user) = self.store.board().user(uid).cloned() else {
            return self.reject(MutationError::UnknownUser {
                uid: uid.to_string(),
            });
        };
        let open = self.open_snapshot()?;
        if open.has_user(uid) {
            return self.reject(MutationError::UserAlreadyAssigned {
                uid: uid.to_string(),
            });
        }

        let card_id = open.id;
        let card = self
            .store
            .update_editable(|card| {
                card.assigned_users.push(AssignedUser {
                    card_id,
                    kind: 0,
                    participant: user,
                })
            })?
            .clone();
        let at = self.card_ref(&card);
        let request = UserRequest {
            user_id: uid.to_string(),
        };
        let api = Arc::clone(&self.api);
        self.dispatch("assigning user to card", async move {
            api.assign_user(at, &request).await
        });
        Ok(vec![RenderOp::Rebuild {
            focus: Some(card.id),
        }])
    }

    pub fn unassign_user(&mut self, uid: &str) -> Result<Vec<RenderOp>, MutationError> {
        let open = self.open_snapshot()?;
        if !open.has_user(uid) {
            return self.reject(MutationError::UserNotAssigned {
                uid: uid.to_string(),
            });
        }

        let card = self
            .store
            .update_editable(|card| card.assigned_users.retain(|u| u.participant.uid != uid))?
            .clone();
        let at = self.card_ref(&card);
        let request = UserRequest {
            user_id: uid.to_string(),
        };
        let api = Arc::clone(&self.api);
        self.dispatch("deleting user from card", async move {
            api.unassign_user(at, &request).await
        });
        Ok(vec![RenderOp::Rebuild {
            focus: Some(card.id),
        }])
    }

    // ── Moving and deleting cards ─────────────────────────────────────

    /// Index of the adjacent stack, or `None` at the board edge.
    fn neighbour(
        &self,
        card_id: i64,
        direction: Direction,
    ) -> Result<Option<usize>, MutationError> {
        let (from_index, _) = self
            .store
            .locate(card_id)
            .ok_or(MutationError::CardNotFound { id: card_id })?;
        Ok(match direction {
            Direction::Left => from_index.checked_sub(1),
            Direction::Right => {
                Some(from_index + 1).filter(|i| *i < self.store.stacks().len())
            }
        })
    }

    /// Asks before moving. `None` means the move would be a no-op (first
    /// stack going left, last stack going right) and nothing is pending.
    pub fn request_move_card(
        &mut self,
        card_id: i64,
        direction: Direction,
    ) -> Result<Option<Confirmation>, MutationError> {
        match self.neighbour(card_id, direction) {
            Err(e) => self.reject(e),
            Ok(None) => Ok(None),
            Ok(Some(_)) => {
                self.pending = Some(PendingAction::MoveCard { card_id, direction });
                Ok(Some(Confirmation::new(format!(
                    "Are you sure to move card #{} to {} stack?",
                    card_id,
                    direction.label()
                ))))
            }
        }
    }

    /// Moves a card to the adjacent stack, placing it first there. The
    /// remote update is addressed through the card's current stack and
    /// carries the destination stack id.
    pub fn move_card(
        &mut self,
        card_id: i64,
        direction: Direction,
    ) -> Result<Vec<RenderOp>, MutationError> {
        let dest_index = match self.neighbour(card_id, direction) {
            Err(e) => return self.reject(e),
            Ok(None) => return Ok(Vec::new()),
            Ok(Some(index)) => index,
        };
        let dest_stack_id = self.store.stacks()[dest_index].id;
        let card = self
            .store
            .card(card_id)
            .cloned()
            .ok_or(MutationError::CardNotFound { id: card_id })?;
        let at = self.card_ref(&card);
        let request = UpdateCardRequest::move_to(&card, &self.owner, dest_stack_id);

        let (from_index, from_pos) = self.store.relocate_card(card_id, dest_stack_id)?;
        tracing::debug!(card_id, from = card.stack_id, to = dest_stack_id, "card moved");

        let api = Arc::clone(&self.api);
        self.dispatch("moving card", async move {
            api.update_card(at, &request).await.map(|_| ())
        });
        Ok(vec![
            RenderOp::RemoveItem {
                stack_index: from_index,
                index: from_pos,
                card_id,
            },
            RenderOp::InsertItem {
                stack_index: dest_index,
                index: 0,
                card_id,
            },
            RenderOp::Focus {
                stack_index: dest_index,
                index: 0,
            },
        ])
    }

    pub fn request_delete_card(&mut self, card_id: i64) -> Result<Confirmation, MutationError> {
        if self.store.card(card_id).is_none() {
            return self.reject(MutationError::CardNotFound { id: card_id });
        }
        self.pending = Some(PendingAction::DeleteCard { card_id });
        Ok(Confirmation::new(format!(
            "Are you sure to delete card #{}?",
            card_id
        )))
    }

    fn delete_card(&mut self, card_id: i64) -> Result<Vec<RenderOp>, MutationError> {
        let Some(card) = self.store.card(card_id).cloned() else {
            return self.reject(MutationError::CardNotFound { id: card_id });
        };
        let at = self.card_ref(&card);
        let (stack_index, index, _) = self
            .store
            .remove_card(card_id)
            .ok_or(MutationError::CardNotFound { id: card_id })?;

        let api = Arc::clone(&self.api);
        self.dispatch("deleting card", async move { api.delete_card(at).await });
        Ok(vec![RenderOp::RemoveItem {
            stack_index,
            index,
            card_id,
        }])
    }

    /// Settles the pending prompt. Only `Yes` changes anything.
    pub fn resolve(&mut self, answer: Answer) -> Result<Vec<RenderOp>, MutationError> {
        let pending = self.pending.take().ok_or(MutationError::NothingToConfirm)?;
        if answer != Answer::Yes {
            tracing::debug!(?pending, ?answer, "confirmation declined");
            return Ok(Vec::new());
        }
        match pending {
            PendingAction::DeleteCard { card_id } => self.delete_card(card_id),
            PendingAction::MoveCard { card_id, direction } => self.move_card(card_id, direction),
            PendingAction::DeleteComment { comment_id } => self.delete_comment(comment_id),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    // ── Adding cards ──────────────────────────────────────────────────

    /// Creates a card and waits for the service's copy. The canonical card
    /// (server id, empty labels and assignees) goes first in the stack's
    /// sequence and is opened; the list item is inserted at the draft's
    /// order.
    pub async fn add_card(
        &mut self,
        stack_id: i64,
        draft: CardForm,
    ) -> Result<Vec<RenderOp>, MutationError> {
        let Some(stack_index) = self.store.stack_index(stack_id) else {
            return self.reject(MutationError::StackNotFound { id: stack_id });
        };
        let order = dates::parse_order(&draft.order);
        let request = CreateCardRequest {
            title: draft.title,
            description: draft.description,
            kind: default_card_kind(),
            order,
            due_date: dates::parse_display(&draft.due_date),
        };

        let mut card = match self
            .api
            .create_card(self.board_id(), stack_id, &request)
            .await
        {
            Ok(card) => card,
            Err(e) => {
                self.status.error(format!("Error creating new card: {}", e));
                return Ok(Vec::new());
            }
        };
        card.stack_id = stack_id;
        card.labels.clear();
        card.assigned_users.clear();
        let card_id = card.id;
        tracing::info!(card_id, stack_id, "card created");

        self.store.put_card(card)?;
        self.store.open_card(card_id)?;
        let index = usize::try_from(order).unwrap_or(0);
        Ok(vec![
            RenderOp::InsertItem {
                stack_index,
                index,
                card_id,
            },
            RenderOp::Focus { stack_index, index },
        ])
    }

    // ── Comments ──────────────────────────────────────────────────────

    /// Fetches the comments of a card, replacing any previously loaded
    /// thread.
    pub async fn load_comments(&mut self, card_id: i64) -> Result<Vec<RenderOp>, MutationError> {
        if self.store.card(card_id).is_none() {
            return self.reject(MutationError::CardNotFound { id: card_id });
        }
        match self.api.list_comments(card_id).await {
            Ok(comments) => {
                self.store.set_comments(CommentThread::new(card_id, comments));
                Ok(vec![RenderOp::RebuildComments])
            }
            Err(e) => {
                self.status.error(format!("Error loading comments: {}", e));
                Ok(Vec::new())
            }
        }
    }

    pub fn comment_tree(&self) -> Vec<CommentNode> {
        self.store
            .comments()
            .map(CommentThread::tree)
            .unwrap_or_default()
    }

    fn thread_card(&self) -> Result<i64, MutationError> {
        self.store
            .comments()
            .map(CommentThread::card_id)
            .ok_or(MutationError::CommentsNotLoaded {
                card_id: self.store.editable().map(|c| c.id).unwrap_or_default(),
            })
    }

    pub async fn add_comment(&mut self, message: &str) -> Result<Vec<RenderOp>, MutationError> {
        self.post_comment(message, None).await
    }

    /// Replies to `parent_id`, which must be a comment of the loaded thread.
    pub async fn reply_comment(
        &mut self,
        parent_id: i64,
        message: &str,
    ) -> Result<Vec<RenderOp>, MutationError> {
        let parent_ok = match self.store.comments() {
            Some(thread) => thread.check_parent(parent_id),
            None => Err(MutationError::CommentsNotLoaded {
                card_id: self.store.editable().map(|c| c.id).unwrap_or_default(),
            }),
        };
        if let Err(e) = parent_ok {
            return self.reject(e);
        }
        self.post_comment(message, Some(parent_id)).await
    }

    async fn post_comment(
        &mut self,
        message: &str,
        parent_id: Option<i64>,
    ) -> Result<Vec<RenderOp>, MutationError> {
        let card_id = match self.thread_card() {
            Ok(id) => id,
            Err(e) => return self.reject(e),
        };
        let request = CommentRequest {
            message: message.to_string(),
            parent_id,
        };
        match self.api.create_comment(card_id, &request).await {
            Ok(mut comment) => {
                comment.card_id = card_id;
                if comment.parent_id.is_none() {
                    comment.parent_id = parent_id;
                }
                if let Some(thread) = self.store.comments_mut() {
                    thread.upsert(comment);
                }
                Ok(vec![RenderOp::RebuildComments])
            }
            Err(e) => {
                let action = if parent_id.is_some() {
                    "replying to comment"
                } else {
                    "adding new comment"
                };
                self.status.error(format!("Error {}: {}", action, e));
                Ok(Vec::new())
            }
        }
    }

    /// Current body of a comment, used as the edit form's default.
    pub fn comment_form(&self, comment_id: i64) -> Result<String, MutationError> {
        let thread = self.store.comments().ok_or(MutationError::CommentsNotLoaded {
            card_id: self.store.editable().map(|c| c.id).unwrap_or_default(),
        })?;
        thread
            .get(comment_id)
            .map(|c| c.message.clone())
            .ok_or(MutationError::CommentNotFound { id: comment_id })
    }

    /// Replaces a comment body locally (id and parent unchanged) and sends
    /// the edit in the background.
    pub fn edit_comment(
        &mut self,
        comment_id: i64,
        message: &str,
    ) -> Result<Vec<RenderOp>, MutationError> {
        let card_id = match self.thread_card() {
            Ok(id) => id,
            Err(e) => return self.reject(e),
        };
        let replaced = self
            .store
            .comments_mut()
            .map(|thread| thread.replace_message(comment_id, message).map(|_| ()));
        if let Some(Err(e)) = replaced {
            return self.reject(e);
        }

        let request = CommentRequest {
            message: message.to_string(),
            parent_id: None,
        };
        let api = Arc::clone(&self.api);
        self.dispatch("editing comment", async move {
            api.update_comment(card_id, comment_id, &request)
                .await
                .map(|_| ())
        });
        Ok(vec![RenderOp::RebuildComments])
    }

    pub fn request_delete_comment(
        &mut self,
        comment_id: i64,
    ) -> Result<Confirmation, MutationError> {
        let known = self
            .store
            .comments()
            .is_some_and(|thread| thread.contains(comment_id));
        if !known {
            return self.reject(MutationError::CommentNotFound { id: comment_id });
        }
        self.pending = Some(PendingAction::DeleteComment { comment_id });
        Ok(Confirmation::new(format!(
            "Are you sure to delete comment {}?",
            comment_id
        )))
    }

    fn delete_comment(&mut self, comment_id: i64) -> Result<Vec<RenderOp>, MutationError> {
        let card_id = self.thread_card()?;
        let removed = self
            .store
            .comments_mut()
            .and_then(|thread| thread.remove(comment_id));
        if removed.is_none() {
            return self.reject(MutationError::CommentNotFound { id: comment_id });
        }
        let api = Arc::clone(&self.api);
        self.dispatch("deleting comment", async move {
            api.delete_comment(card_id, comment_id).await
        });
        Ok(vec![RenderOp::RebuildComments])
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn card_ref(&self, card: &Card) -> CardRef {
        CardRef {
            board_id: self.board_id(),
            stack_id: card.stack_id,
            card_id: card.id,
        }
    }

    fn open_snapshot(&self) -> Result<Card, MutationError> {
        match self.store.editable() {
            Some(card) => Ok(card.clone()),
            None => self.reject(MutationError::NoOpenCard),
        }
    }

    /// Reports a local rejection on the status line and returns it.
    fn reject<T>(&self, err: MutationError) -> Result<T, MutationError> {
        self.status.info(err.to_string());
        Err(err)
    }

    /// Spawns a gateway call. Its only way back is the status channel.
    fn dispatch<F>(&mut self, action: &'static str, call: F)
    where
        F: Future<Output = Result<(), DeckError>> + Send + 'static,
    {
        while let Some(done) = self.in_flight.try_join_next() {
            if let Err(e) = done {
                tracing::error!(error = %e, "background call panicked");
            }
        }
        tracing::debug!(action, in_flight = self.in_flight.len(), "dispatching");
        let status = self.status.clone();
        self.in_flight.spawn(async move {
            if let Err(e) = call.await {
                status.error(format!("Error {}: {}", action, e));
            }
        });
    }
}

async fn fetch_store(api: &dyn DeckApi, board_id: i64) -> Result<DeckStore, DeckError> {
    let (board, stacks) =
        futures::try_join!(api.get_board(board_id), api.list_stacks(board_id))?;
    Ok(DeckStore::new(board, stacks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::models::Comment;
    use crate::deck::status::{self, StatusBar};
    use crate::deck::store::fixtures;
    use crate::deck::testing::{ApiCall, RecordingApi};
    use chrono::{TimeZone, Utc};

    fn engine_with(api: RecordingApi) -> (MutationEngine, Arc<RecordingApi>, StatusBar) {
        let api = Arc::new(api);
        let (tx, bar) = status::channel();
        let engine = MutationEngine::new(fixtures::store(), api.clone(), tx, "alice");
        (engine, api, bar)
    }

    fn engine() -> (MutationEngine, Arc<RecordingApi>, StatusBar) {
        engine_with(RecordingApi::new(fixtures::board(), vec![]))
    }

    fn labels_everywhere(engine: &MutationEngine, card_id: i64) -> [Vec<i64>; 3] {
        let ids = |card: &Card| card.labels.iter().map(|l| l.id).collect::<Vec<_>>();
        let store = engine.store();
        let open = ids(store.editable().unwrap());
        let indexed = ids(store.card(card_id).unwrap());
        let (stack_index, pos) = store.locate(card_id).unwrap();
        let stack_id = store.stacks()[stack_index].id;
        let in_stack = ids(store.stack_cards(stack_id)[pos]);
        [open, indexed, in_stack]
    }

    fn users_everywhere(engine: &MutationEngine, card_id: i64) -> [Vec<String>; 3] {
        let uids = |card: &Card| {
            card.assigned_users
                .iter()
                .map(|u| u.participant.uid.clone())
                .collect::<Vec<_>>()
        };
        let store = engine.store();
        let open = uids(store.editable().unwrap());
        let indexed = uids(store.card(card_id).unwrap());
        let (stack_index, pos) = store.locate(card_id).unwrap();
        let stack_id = store.stacks()[stack_index].id;
        let in_stack = uids(store.stack_cards(stack_id)[pos]);
        [open, indexed, in_stack]
    }

    /// Every sequence of `choices` steps with length 1 to `max_len`.
    fn every_sequence(choices: usize, max_len: usize) -> Vec<Vec<usize>> {
        let mut all = Vec::new();
        let mut frontier: Vec<Vec<usize>> = vec![vec![]];
        for _ in 0..max_len {
            frontier = frontier
                .iter()
                .flat_map(|seq| {
                    (0..choices).map(move |step| {
                        let mut next = seq.clone();
                        next.push(step);
                        next
                    })
                })
                .collect();
            all.extend(frontier.iter().cloned());
        }
        all
    }

    fn at(stack_id: i64, card_id: i64) -> CardRef {
        CardRef {
            board_id: 1,
            stack_id,
            card_id,
        }
    }

    #[tokio::test]
    async fn test_label_sequence_keeps_all_copies_identical() {
        let (mut engine, api, _bar) = engine();
        engine.open_card(42).unwrap();

        engine.assign_label(7).unwrap();
        let [a, b, c] = labels_everywhere(&engine, 42);
        assert_eq!(a, vec![7]);
        assert_eq!(a, b);
        assert_eq!(b, c);

        engine.assign_label(8).unwrap();
        engine.unassign_label(7).unwrap();
        let [a, b, c] = labels_everywhere(&engine, 42);
        assert_eq!(a, vec![8]);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert!(engine.store().is_consistent());

        engine.settle().await;
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::AssignLabel(at(10, 42), 7),
                ApiCall::AssignLabel(at(10, 42), 8),
                ApiCall::RemoveLabel(at(10, 42), 7),
            ]
        );
    }

    #[tokio::test]
    async fn test_every_label_sequence_keeps_all_copies_identical() {
        // (assign?, label id)
        let steps = [(true, 7), (true, 8), (false, 7), (false, 8)];
        for sequence in every_sequence(steps.len(), 4) {
            let (mut engine, api, _bar) = engine();
            engine.open_card(42).unwrap();
            let mut expected: Vec<i64> = Vec::new();
            let mut accepted = 0;

            for &step in &sequence {
                let (assign, label_id) = steps[step];
                let result = if assign {
                    engine.assign_label(label_id)
                } else {
                    engine.unassign_label(label_id)
                };
                let allowed = assign != expected.contains(&label_id);
                assert_eq!(result.is_ok(), allowed, "step {step} of {sequence:?}");
                if allowed {
                    accepted += 1;
                    if assign {
                        expected.push(label_id);
                    } else {
                        expected.retain(|id| *id != label_id);
                    }
                }

                let [a, b, c] = labels_everywhere(&engine, 42);
                assert_eq!(a, b, "{sequence:?}");
                assert_eq!(b, c, "{sequence:?}");
                let mut sorted = a.clone();
                sorted.sort();
                let mut want = expected.clone();
                want.sort();
                assert_eq!(sorted, want, "{sequence:?}");
                assert!(engine.store().is_consistent(), "{sequence:?}");
            }

            engine.settle().await;
            assert_eq!(api.calls().len(), accepted, "{sequence:?}");
        }
    }

    #[tokio::test]
    async fn test_every_user_sequence_keeps_all_copies_identical() {
        // (assign?, uid)
        let steps = [(true, "alice"), (true, "bob"), (false, "alice"), (false, "bob")];
        for sequence in every_sequence(steps.len(), 4) {
            let (mut engine, api, _bar) = engine();
            engine.open_card(43).unwrap();
            let mut expected: Vec<String> = Vec::new();
            let mut accepted = 0;

            for &step in &sequence {
                let (assign, uid) = steps[step];
                let result = if assign {
                    engine.assign_user(uid)
                } else {
                    engine.unassign_user(uid)
                };
                let allowed = assign != expected.iter().any(|u| u == uid);
                assert_eq!(result.is_ok(), allowed, "step {step} of {sequence:?}");
                if allowed {
                    accepted += 1;
                    if assign {
                        expected.push(uid.to_string());
                    } else {
                        expected.retain(|u| u != uid);
                    }
                }

                let [a, b, c] = users_everywhere(&engine, 43);
                assert_eq!(a, b, "{sequence:?}");
                assert_eq!(b, c, "{sequence:?}");
                let mut sorted = a.clone();
                sorted.sort();
                let mut want = expected.clone();
                want.sort();
                assert_eq!(sorted, want, "{sequence:?}");
                assert!(engine.store().is_consistent(), "{sequence:?}");
            }

            engine.settle().await;
            assert_eq!(api.calls().len(), accepted, "{sequence:?}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_label_is_rejected_without_call() {
        let (mut engine, api, mut bar) = engine();
        engine.open_card(42).unwrap();
        engine.assign_label(7).unwrap();
        let before = engine.store().card(42).unwrap().clone();

        let err = engine.assign_label(7).unwrap_err();
        assert_eq!(err, MutationError::LabelAlreadyAssigned { label_id: 7 });
        assert_eq!(engine.store().card(42).unwrap(), &before);

        engine.settle().await;
        assert_eq!(api.calls().len(), 1);
        let notices = bar.drain();
        assert_eq!(notices.last().unwrap().text, "label already assigned");
    }

    #[tokio::test]
    async fn test_unknown_or_absent_labels_are_rejected() {
        let (mut engine, api, _bar) = engine();
        assert_eq!(engine.assign_label(7).unwrap_err(), MutationError::NoOpenCard);
        engine.open_card(42).unwrap();
        assert_eq!(
            engine.assign_label(99).unwrap_err(),
            MutationError::UnknownLabel { label_id: 99 }
        );
        assert_eq!(
            engine.unassign_label(7).unwrap_err(),
            MutationError::LabelNotAssigned { label_id: 7 }
        );
        engine.settle().await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_user_assignment_round() {
        let (mut engine, api, _bar) = engine();
        engine.open_card(43).unwrap();
        engine.assign_user("alice").unwrap();

        let card = engine.store().card(43).unwrap();
        assert_eq!(card.assigned_users.len(), 1);
        assert_eq!(card.assigned_users[0].card_id, 43);
        assert_eq!(card.assigned_users[0].kind, 0);
        assert_eq!(card.assigned_users[0].participant.display_name, "Alice Smith");
        assert_eq!(engine.editable().unwrap(), card);

        assert_eq!(
            engine.assign_user("alice").unwrap_err(),
            MutationError::UserAlreadyAssigned {
                uid: "alice".into()
            }
        );
        assert_eq!(
            engine.assign_user("mallory").unwrap_err(),
            MutationError::UnknownUser {
                uid: "mallory".into()
            }
        );
        engine.unassign_user("alice").unwrap();
        assert!(engine.store().card(43).unwrap().assigned_users.is_empty());
        assert!(engine.store().is_consistent());

        engine.settle().await;
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::AssignUser(at(10, 43), "alice".into()),
                ApiCall::UnassignUser(at(10, 43), "alice".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_move_at_board_edges_is_noop() {
        let (mut engine, api, _bar) = engine();
        let before: Vec<_> = engine.store().stacks().to_vec();

        assert!(engine.move_card(42, Direction::Left).unwrap().is_empty());
        assert!(engine.request_move_card(42, Direction::Left).unwrap().is_none());
        assert!(!engine.has_pending());

        engine.store.relocate_card(50, 30).unwrap();
        let before_right: Vec<_> = engine.store().stacks().to_vec();
        assert!(engine.move_card(50, Direction::Right).unwrap().is_empty());
        assert_eq!(engine.store().stacks(), before_right.as_slice());
        assert_ne!(before, before_right);

        engine.settle().await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_move_right_places_card_first_in_next_stack() {
        let (mut engine, api, _bar) = engine();
        let ops = engine.move_card(43, Direction::Right).unwrap();

        let store = engine.store();
        assert_eq!(store.stacks()[0].card_ids(), &[42]);
        assert_eq!(store.stacks()[1].card_ids(), &[43, 50]);
        assert_eq!(store.card(43).unwrap().stack_id, 20);
        assert!(store.is_consistent());
        assert_eq!(
            ops,
            vec![
                RenderOp::RemoveItem {
                    stack_index: 0,
                    index: 1,
                    card_id: 43
                },
                RenderOp::InsertItem {
                    stack_index: 1,
                    index: 0,
                    card_id: 43
                },
                RenderOp::Focus {
                    stack_index: 1,
                    index: 0
                },
            ]
        );

        engine.settle().await;
        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            ApiCall::UpdateCard(at_ref, request) => {
                assert_eq!(at_ref.stack_id, 10);
                assert_eq!(request.stack_id, Some(20));
                assert_eq!(request.owner, "alice");
            }
            other => panic!("Expected UpdateCard, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_move_left_requires_confirmation() {
        let (mut engine, api, _bar) = engine();
        let prompt = engine
            .request_move_card(50, Direction::Left)
            .unwrap()
            .unwrap();
        assert_eq!(prompt.prompt, "Are you sure to move card #50 to prev stack?");
        assert_eq!(prompt.options, ["Yes", "No"]);
        assert_eq!(engine.store().card(50).unwrap().stack_id, 20);

        engine.resolve(Answer::Yes).unwrap();
        assert_eq!(engine.store().card(50).unwrap().stack_id, 10);
        assert_eq!(engine.store().stacks()[0].card_ids(), &[50, 42, 43]);
        engine.settle().await;
        assert_eq!(api.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_only_after_yes() {
        let (mut engine, api, _bar) = engine();

        let prompt = engine.request_delete_card(42).unwrap();
        assert_eq!(prompt.prompt, "Are you sure to delete card #42?");
        assert!(engine.resolve(Answer::No).unwrap().is_empty());
        assert!(engine.store().card(42).is_some());

        engine.request_delete_card(42).unwrap();
        assert!(engine.resolve(Answer::Escape).unwrap().is_empty());
        assert!(engine.store().card(42).is_some());
        engine.settle().await;
        assert!(api.calls().is_empty());

        engine.request_delete_card(42).unwrap();
        let ops = engine.resolve(Answer::Yes).unwrap();
        assert_eq!(
            ops,
            vec![RenderOp::RemoveItem {
                stack_index: 0,
                index: 0,
                card_id: 42
            }]
        );
        assert!(engine.store().card(42).is_none());
        assert_eq!(engine.store().stacks()[0].card_ids(), &[43]);
        assert!(engine.store().is_consistent());

        engine.settle().await;
        assert_eq!(api.calls(), vec![ApiCall::DeleteCard(at(10, 42))]);
        assert_eq!(
            engine.resolve(Answer::Yes).unwrap_err(),
            MutationError::NothingToConfirm
        );
    }

    #[tokio::test]
    async fn test_remote_failure_reports_without_rollback() {
        let (mut engine, api, mut bar) = engine();
        api.fail_all();
        engine.move_card(42, Direction::Right).unwrap();
        engine.open_card(43).unwrap();
        engine.assign_label(7).unwrap();
        engine.settle().await;

        assert_eq!(engine.store().card(42).unwrap().stack_id, 20);
        assert!(engine.store().card(43).unwrap().has_label(7));
        let notices = bar.drain();
        assert_eq!(notices.len(), 2);
        assert!(notices.iter().all(|n| n.is_error()));
        assert!(notices.iter().any(|n| n.text.starts_with("Error moving card:")));
        assert!(
            notices
                .iter()
                .any(|n| n.text.starts_with("Error assigning tag to card:"))
        );
    }

    #[tokio::test]
    async fn test_example_scenario_label_then_move() {
        let (mut engine, api, _bar) = engine();
        assert!(engine.store().card(42).unwrap().due_date.is_none());

        engine.open_card(42).unwrap();
        engine.assign_label(7).unwrap();
        engine.move_card(42, Direction::Right).unwrap();

        let card = engine.store().card(42).unwrap();
        assert_eq!(card.stack_id, 20);
        assert_eq!(engine.store().stacks()[1].card_ids()[0], 42);
        let labels: Vec<i64> = card.labels.iter().map(|l| l.id).collect();
        assert_eq!(labels, vec![7]);
        assert_eq!(engine.editable().unwrap().stack_id, 20);

        engine.settle().await;
        let updates: Vec<_> = api
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::UpdateCard(_, r) => Some(r),
                _ => None,
            })
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].stack_id, Some(20));
    }

    #[tokio::test]
    async fn test_card_form_converts_at_boundaries() {
        let (mut engine, api, _bar) = engine();
        engine.open_card(42).unwrap();
        let mut form = engine.card_form().unwrap();
        assert_eq!(form.due_date, "");
        assert_eq!(form.order, "0");

        form.title = "Fix login".into();
        form.due_date = "01/03/2024 14:30".into();
        form.order = "4".into();
        let ops = engine.save_card_form(form).unwrap();
        assert_eq!(ops, vec![RenderOp::Rebuild { focus: Some(42) }]);

        let card = engine.store().card(42).unwrap();
        assert_eq!(card.title, "Fix login");
        assert_eq!(card.order, 4);
        assert_eq!(
            card.due_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap())
        );
        assert_eq!(engine.card_form().unwrap().due_date, "01/03/2024 14:30");

        engine.settle().await;
        match &api.calls()[0] {
            ApiCall::UpdateCard(_, request) => {
                let body = serde_json::to_value(request).unwrap();
                assert_eq!(body["duedate"], "2024-03-01T14:30:00+00:00");
                assert_eq!(body["title"], "Fix login");
            }
            other => panic!("Expected UpdateCard, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_untouched_due_date_keeps_stored_instant() {
        let (mut engine, api, _bar) = engine();
        engine.open_card(42).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 45).unwrap()
            + chrono::Duration::milliseconds(250);
        engine
            .store
            .update_editable(|card| card.due_date = Some(due))
            .unwrap();

        let mut form = engine.card_form().unwrap();
        assert_eq!(form.due_date, "01/03/2024 14:30:45");
        form.title = "Fix login".into();
        engine.save_card_form(form).unwrap();

        assert_eq!(engine.store().card(42).unwrap().due_date, Some(due));
        assert_eq!(engine.editable().unwrap().due_date, Some(due));
        engine.settle().await;
        match &api.calls()[0] {
            ApiCall::UpdateCard(_, request) => {
                let body = serde_json::to_value(request).unwrap();
                assert_eq!(body["duedate"], "2024-03-01T14:30:45+00:00");
            }
            other => panic!("Expected UpdateCard, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_edited_due_date_replaces_stored_instant() {
        let (mut engine, _api, _bar) = engine();
        engine.open_card(42).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 45).unwrap();
        engine
            .store
            .update_editable(|card| card.due_date = Some(due))
            .unwrap();

        let mut form = engine.card_form().unwrap();
        form.due_date = "02/03/2024 09:00".into();
        engine.save_card_form(form).unwrap();
        assert_eq!(
            engine.store().card(42).unwrap().due_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap())
        );
        engine.settle().await;
    }

    #[tokio::test]
    async fn test_unparsable_due_date_leaves_field_unset() {
        let (mut engine, _api, _bar) = engine();
        engine.open_card(42).unwrap();
        let mut form = engine.card_form().unwrap();
        form.due_date = "99/99/2024 10:00".into();
        engine.save_card_form(form).unwrap();
        assert!(engine.store().card(42).unwrap().due_date.is_none());
        engine.settle().await;
    }

    #[tokio::test]
    async fn test_save_description_updates_item() {
        let (mut engine, _api, _bar) = engine();
        engine.open_card(43).unwrap();
        let ops = engine.save_description("new text").unwrap();
        assert_eq!(ops, vec![RenderOp::UpdateItem { card_id: 43 }]);
        assert_eq!(engine.store().card(43).unwrap().description, "new text");
        engine.settle().await;
    }

    #[tokio::test]
    async fn test_add_card_uses_canonical_card() {
        let (mut engine, api, _bar) = engine();
        let draft = CardForm {
            title: "Write docs".into(),
            description: "all of them".into(),
            due_date: String::new(),
            order: "1".into(),
        };
        let ops = engine.add_card(10, draft).await.unwrap();

        assert_eq!(api.calls().len(), 1);
        let store = engine.store();
        let new_id = store.stacks()[0].card_ids()[0];
        assert_eq!(new_id, 1000);
        let card = store.card(new_id).unwrap();
        assert_eq!(card.title, "Write docs");
        assert!(card.labels.is_empty());
        assert!(card.assigned_users.is_empty());
        assert_eq!(engine.editable().unwrap().id, new_id);
        assert!(store.is_consistent());
        assert_eq!(
            ops[0],
            RenderOp::InsertItem {
                stack_index: 0,
                index: 1,
                card_id: new_id
            }
        );
    }

    #[tokio::test]
    async fn test_add_card_failure_changes_nothing() {
        let (mut engine, api, mut bar) = engine();
        api.fail_all();
        let ops = engine.add_card(10, CardForm::new_card()).await.unwrap();
        assert!(ops.is_empty());
        assert_eq!(engine.store().card_count(), 3);
        assert!(
            bar.drain()[0]
                .text
                .starts_with("Error creating new card:")
        );
    }

    fn comment(id: i64, parent: Option<i64>) -> Comment {
        Comment {
            id,
            card_id: 42,
            author_id: "bob".into(),
            author_name: "Bob".into(),
            message: format!("comment {id}"),
            parent_id: parent,
            created_at: None,
        }
    }

    fn engine_with_comments() -> (MutationEngine, Arc<RecordingApi>, StatusBar) {
        engine_with(
            RecordingApi::new(fixtures::board(), vec![])
                .with_comments(vec![comment(1, None), comment(2, Some(1))]),
        )
    }

    #[tokio::test]
    async fn test_reply_carries_parent_reference() {
        let (mut engine, api, _bar) = engine_with_comments();
        engine.open_card(42).unwrap();
        engine.load_comments(42).await.unwrap();
        assert_eq!(engine.comment_tree().len(), 1);

        let ops = engine.reply_comment(2, "me too").await.unwrap();
        assert_eq!(ops, vec![RenderOp::RebuildComments]);
        let thread = engine.store().comments().unwrap();
        let reply = thread.comments().last().unwrap();
        assert_eq!(reply.parent_id, Some(2));
        assert_eq!(reply.message, "me too");

        let tree = engine.comment_tree();
        assert_eq!(tree[0].children[0].children[0].comment_id, reply.id);
        assert!(matches!(
            api.calls().last().unwrap(),
            ApiCall::CreateComment(42, CommentRequest { parent_id: Some(2), .. })
        ));
    }

    #[tokio::test]
    async fn test_reply_to_unknown_parent_is_rejected() {
        let (mut engine, api, _bar) = engine_with_comments();
        engine.load_comments(42).await.unwrap();
        assert_eq!(
            engine.reply_comment(77, "x").await.unwrap_err(),
            MutationError::CommentNotFound { id: 77 }
        );
        assert_eq!(api.calls(), vec![ApiCall::ListComments(42)]);
    }

    #[tokio::test]
    async fn test_edit_comment_keeps_id_and_parent() {
        let (mut engine, api, _bar) = engine_with_comments();
        engine.load_comments(42).await.unwrap();
        assert_eq!(engine.comment_form(2).unwrap(), "comment 2");

        engine.edit_comment(2, "reworded").unwrap();
        let edited = engine.store().comments().unwrap().get(2).unwrap();
        assert_eq!(edited.id, 2);
        assert_eq!(edited.parent_id, Some(1));
        assert_eq!(edited.message, "reworded");

        engine.settle().await;
        assert!(matches!(
            api.calls().last().unwrap(),
            ApiCall::UpdateComment(42, 2, _)
        ));
    }

    #[tokio::test]
    async fn test_delete_comment_needs_confirmation() {
        let (mut engine, api, _bar) = engine_with_comments();
        engine.load_comments(42).await.unwrap();

        engine.request_delete_comment(1).unwrap();
        engine.resolve(Answer::No).unwrap();
        assert!(engine.store().comments().unwrap().contains(1));

        engine.request_delete_comment(1).unwrap();
        engine.resolve(Answer::Yes).unwrap();
        assert!(!engine.store().comments().unwrap().contains(1));
        // the orphaned reply is shown as a root
        assert_eq!(engine.comment_tree()[0].comment_id, 2);

        engine.settle().await;
        assert_eq!(api.calls().last().unwrap(), &ApiCall::DeleteComment(42, 1));
    }

    #[tokio::test]
    async fn test_comment_ops_without_thread() {
        let (mut engine, _api, _bar) = engine();
        assert!(matches!(
            engine.add_comment("hi").await.unwrap_err(),
            MutationError::CommentsNotLoaded { .. }
        ));
        assert!(matches!(
            engine.edit_comment(1, "x").unwrap_err(),
            MutationError::CommentsNotLoaded { .. }
        ));
        assert!(engine.comment_tree().is_empty());
    }

    #[tokio::test]
    async fn test_connect_and_reload() {
        let stacks = vec![fixtures::stack(
            10,
            "To Do",
            0,
            vec![fixtures::card(1, 10, 0)],
        )];
        let api = Arc::new(RecordingApi::new(fixtures::board(), stacks));
        let (tx, mut bar) = status::channel();
        let mut engine = MutationEngine::connect(api.clone(), tx, 1, "alice")
            .await
            .unwrap();
        assert_eq!(engine.store().card_count(), 1);

        engine.move_card(1, Direction::Right).unwrap();
        let ops = engine.reload().await;
        assert_eq!(ops, vec![RenderOp::Rebuild { focus: None }]);
        assert_eq!(bar.drain().last().unwrap().text, "board reloaded");

        api.fail_all();
        assert!(engine.reload().await.is_empty());
        assert_eq!(engine.store().card_count(), 1);
        assert!(bar.drain().last().unwrap().is_error());
        engine.settle().await;
    }
}
