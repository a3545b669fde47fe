//! In-memory mirror of one board.
//!
//! Cards live exactly once, in the card index; stacks only hold ordered
//! card-id sequences. Every mutation below touches both sides in the same
//! call, so a reader never sees a card that is indexed but not placed (or
//! the reverse).
//!
//! The store has no locking. It is owned by the UI task and mutated only
//! through the mutation engine.

use std::collections::HashMap;

use super::comments::CommentThread;
use super::models::{Board, Card, Stack};
use crate::errors::MutationError;

/// Stack metadata plus the ordered ids of its cards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackColumn {
    pub id: i64,
    pub title: String,
    pub order: i64,
    card_ids: Vec<i64>,
}

impl StackColumn {
    pub fn card_ids(&self) -> &[i64] {
        &self.card_ids
    }

    pub fn len(&self) -> usize {
        self.card_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.card_ids.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DeckStore {
    board: Board,
    stacks: Vec<StackColumn>,
    cards: HashMap<i64, Card>,
    editable: Option<Card>,
    comments: Option<CommentThread>,
}

impl DeckStore {
    /// Builds the mirror from a freshly loaded board. Stacks are kept sorted
    /// by `order`; cards within a stack start sorted by their own `order`.
    pub fn new(board: Board, stacks: Vec<Stack>) -> Self {
        let mut stacks = stacks;
        stacks.sort_by_key(|s| s.order);

        let mut cards = HashMap::new();
        let mut columns = Vec::with_capacity(stacks.len());
        for stack in stacks {
            let mut stack_cards = stack.cards;
            stack_cards.sort_by_key(|c| c.order);
            let mut card_ids = Vec::with_capacity(stack_cards.len());
            for mut card in stack_cards {
                card.stack_id = stack.id;
                if cards.contains_key(&card.id) {
                    tracing::warn!(
                        card_id = card.id,
                        "duplicate card id in board payload, keeping first"
                    );
                    continue;
                }
                card_ids.push(card.id);
                cards.insert(card.id, card);
            }
            columns.push(StackColumn {
                id: stack.id,
                title: stack.title,
                order: stack.order,
                card_ids,
            });
        }

        Self {
            board,
            stacks: columns,
            cards,
            editable: None,
            comments: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Stacks in display order.
    pub fn stacks(&self) -> &[StackColumn] {
        &self.stacks
    }

    pub fn stack(&self, id: i64) -> Option<&StackColumn> {
        self.stacks.iter().find(|s| s.id == id)
    }

    pub fn stack_index(&self, id: i64) -> Option<usize> {
        self.stacks.iter().position(|s| s.id == id)
    }

    pub fn card(&self, id: i64) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    /// Card ids of a stack in sequence order; empty for an unknown stack.
    pub fn card_ids(&self, stack_id: i64) -> &[i64] {
        self.stack(stack_id).map(StackColumn::card_ids).unwrap_or(&[])
    }

    /// Cards of a stack in sequence order.
    pub fn stack_cards(&self, stack_id: i64) -> Vec<&Card> {
        self.stack(stack_id)
            .map(|s| s.card_ids.iter().filter_map(|id| self.cards.get(id)).collect())
            .unwrap_or_default()
    }

    /// `(stack index, position in stack)` of a card.
    pub fn locate(&self, card_id: i64) -> Option<(usize, usize)> {
        let card = self.cards.get(&card_id)?;
        let stack_index = self.stack_index(card.stack_id)?;
        let pos = self.stacks[stack_index]
            .card_ids
            .iter()
            .position(|id| *id == card_id)?;
        Some((stack_index, pos))
    }

    /// Replaces a card's snapshot. If the card is new, or its stack changed,
    /// it is placed at the front of its stack's sequence.
    pub fn put_card(&mut self, card: Card) -> Result<(), MutationError> {
        let target = self
            .stack_index(card.stack_id)
            .ok_or(MutationError::StackNotFound { id: card.stack_id })?;

        if let Some(previous) = self.cards.get(&card.id) {
            if previous.stack_id != card.stack_id {
                let from = previous.stack_id;
                if let Some(from_index) = self.stack_index(from) {
                    self.stacks[from_index].card_ids.retain(|id| *id != card.id);
                }
            }
        }
        if !self.stacks[target].card_ids.contains(&card.id) {
            self.stacks[target].card_ids.insert(0, card.id);
        }
        if let Some(open) = self.editable.as_mut().filter(|c| c.id == card.id) {
            *open = card.clone();
        }
        self.cards.insert(card.id, card);
        Ok(())
    }

    /// Removes a card from both its stack and the index, returning where it
    /// was.
    pub fn remove_card(&mut self, card_id: i64) -> Option<(usize, usize, Card)> {
        let (stack_index, pos) = self.locate(card_id)?;
        self.stacks[stack_index].card_ids.remove(pos);
        let card = self.cards.remove(&card_id)?;
        if self.editable.as_ref().is_some_and(|c| c.id == card_id) {
            self.editable = None;
            self.comments = None;
        }
        Some((stack_index, pos, card))
    }

    /// Moves a card to the front of another stack. The card's `order` is
    /// left untouched; position 0 is a local approximation until the next
    /// full reload.
    pub fn relocate_card(
        &mut self,
        card_id: i64,
        dest_stack_id: i64,
    ) -> Result<(usize, usize), MutationError> {
        let dest = self
            .stack_index(dest_stack_id)
            .ok_or(MutationError::StackNotFound { id: dest_stack_id })?;
        let (from_index, from_pos) = self
            .locate(card_id)
            .ok_or(MutationError::CardNotFound { id: card_id })?;

        self.stacks[from_index].card_ids.remove(from_pos);
        self.stacks[dest].card_ids.insert(0, card_id);
        if let Some(card) = self.cards.get_mut(&card_id) {
            card.stack_id = dest_stack_id;
        }
        if let Some(open) = self.editable.as_mut().filter(|c| c.id == card_id) {
            open.stack_id = dest_stack_id;
        }
        Ok((from_index, from_pos))
    }

    // ── Editable slot ─────────────────────────────────────────────────

    pub fn open_card(&mut self, card_id: i64) -> Result<&Card, MutationError> {
        let card = self
            .cards
            .get(&card_id)
            .cloned()
            .ok_or(MutationError::CardNotFound { id: card_id })?;
        if self.comments.as_ref().is_some_and(|t| t.card_id() != card_id) {
            self.comments = None;
        }
        Ok(self.editable.insert(card))
    }

    pub fn close_card(&mut self) {
        self.editable = None;
        self.comments = None;
    }

    pub fn editable(&self) -> Option<&Card> {
        self.editable.as_ref()
    }

    /// Mutates the open card and merges the result into the stack and the
    /// index before returning.
    pub fn update_editable<F>(&mut self, edit: F) -> Result<&Card, MutationError>
    where
        F: FnOnce(&mut Card),
    {
        let mut card = self.editable.clone().ok_or(MutationError::NoOpenCard)?;
        let card_id = card.id;
        edit(&mut card);
        // id and stack are owned by the store, not by edit forms
        card.id = card_id;
        if let Some(current) = self.cards.get(&card_id) {
            card.stack_id = current.stack_id;
        }
        self.put_card(card)?;
        self.editable
            .as_ref()
            .ok_or(MutationError::NoOpenCard)
    }

    // ── Comments of the open card ─────────────────────────────────────

    pub fn comments(&self) -> Option<&CommentThread> {
        self.comments.as_ref()
    }

    pub fn comments_mut(&mut self) -> Option<&mut CommentThread> {
        self.comments.as_mut()
    }

    pub fn set_comments(&mut self, thread: CommentThread) {
        self.comments = Some(thread);
    }

    /// True when every indexed card sits in exactly one stack sequence (its
    /// own) and every sequenced id is indexed. The open card, if any, must
    /// match its indexed snapshot.
    pub fn is_consistent(&self) -> bool {
        let mut seen = 0;
        for stack in &self.stacks {
            for id in &stack.card_ids {
                match self.cards.get(id) {
                    Some(card) if card.stack_id == stack.id => seen += 1,
                    _ => return false,
                }
            }
        }
        let editable_ok = self
            .editable
            .as_ref()
            .is_none_or(|open| self.cards.get(&open.id) == Some(open));
        seen == self.cards.len() && editable_ok
    }
}
