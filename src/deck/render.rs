//! Widget model rebuilt from the store.
//!
//! A [`BoardView`] holds no state of its own beyond focus: it can be thrown
//! away and rebuilt from a [`DeckStore`] at any moment, including right
//! after an optimistic mutation whose remote call is still in flight.
//! Incremental [`RenderOp`]s patch an existing view the way the engine asks.

use super::dates;
use super::models::Card;
use super::store::DeckStore;

/// Instruction from the mutation engine to whoever draws the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// Rebuild every column. Focus lands on `focus` if given and still
    /// present, otherwise on the first card of the first stack.
    Rebuild { focus: Option<i64> },
    InsertItem {
        stack_index: usize,
        index: usize,
        card_id: i64,
    },
    /// Remove the item at `index`; if that slot shows another card, the
    /// item showing `card_id` is removed instead.
    RemoveItem {
        stack_index: usize,
        index: usize,
        card_id: i64,
    },
    /// Refresh the text of the item showing `card_id`.
    UpdateItem { card_id: i64 },
    Focus { stack_index: usize, index: usize },
    /// The open card's comment tree must be rebuilt.
    RebuildComments,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelChip {
    pub title: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardItem {
    pub card_id: i64,
    pub title: String,
    pub assignees: Vec<String>,
    pub due: Option<String>,
    pub labels: Vec<LabelChip>,
}

impl CardItem {
    pub fn from_card(card: &Card) -> Self {
        Self {
            card_id: card.id,
            title: card.title.clone(),
            assignees: card
                .assigned_users
                .iter()
                .map(|u| u.participant.abbreviation())
                .collect(),
            due: card.due_date.as_ref().map(dates::to_display),
            labels: card
                .labels
                .iter()
                .map(|l| LabelChip {
                    title: l.title.clone(),
                    color: l.color.clone(),
                })
                .collect(),
        }
    }

    /// Main list line: `#42 - AS, B - Fix login (01/03/2024 14:30)`.
    pub fn line(&self) -> String {
        let mut out = format!("#{}", self.card_id);
        if !self.assignees.is_empty() {
            out.push_str(&format!(" - {}", self.assignees.join(", ")));
        }
        out.push_str(&format!(" - {}", self.title));
        if let Some(due) = &self.due {
            out.push_str(&format!(" ({})", due));
        }
        out
    }

    /// Secondary line listing label titles.
    pub fn label_line(&self) -> String {
        self.labels
            .iter()
            .map(|l| l.title.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    pub stack_id: i64,
    pub title: String,
    pub items: Vec<CardItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Focus {
    pub column: usize,
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub title: String,
    pub columns: Vec<ColumnView>,
    pub focus: Focus,
}

impl BoardView {
    /// Full rebuild: stacks by `order`, cards within each stack by `order`
    /// (ties keep sequence order).
    pub fn build(store: &DeckStore, focus_card: Option<i64>) -> Self {
        let mut stacks: Vec<_> = store.stacks().iter().collect();
        stacks.sort_by_key(|s| s.order);

        let columns: Vec<ColumnView> = stacks
            .into_iter()
            .map(|stack| {
                let mut cards = store.stack_cards(stack.id);
                cards.sort_by_key(|c| c.order);
                ColumnView {
                    stack_id: stack.id,
                    title: stack.title.clone(),
                    items: cards.into_iter().map(CardItem::from_card).collect(),
                }
            })
            .collect();

        let mut view = Self {
            title: store.board().title.clone(),
            columns,
            focus: Focus::default(),
        };
        if let Some(focus) = focus_card.and_then(|id| view.find(id)) {
            view.focus = focus;
        }
        view
    }

    pub fn find(&self, card_id: i64) -> Option<Focus> {
        self.columns.iter().enumerate().find_map(|(column, col)| {
            col.items
                .iter()
                .position(|item| item.card_id == card_id)
                .map(|row| Focus { column, row })
        })
    }

    pub fn focused_card(&self) -> Option<i64> {
        self.columns
            .get(self.focus.column)
            .and_then(|col| col.items.get(self.focus.row))
            .map(|item| item.card_id)
    }

    pub fn focused_stack(&self) -> Option<i64> {
        self.columns.get(self.focus.column).map(|c| c.stack_id)
    }

    pub fn apply(&mut self, store: &DeckStore, op: &RenderOp) {
        match op {
            RenderOp::Rebuild { focus } => *self = Self::build(store, *focus),
            RenderOp::InsertItem {
                stack_index,
                index,
                card_id,
            } => {
                let Some(card) = store.card(*card_id) else {
                    return;
                };
                if let Some(column) = self.columns.get_mut(*stack_index) {
                    let at = (*index).min(column.items.len());
                    column.items.insert(at, CardItem::from_card(card));
                }
            }
            RenderOp::RemoveItem {
                stack_index,
                index,
                card_id,
            } => {
                let slot_matches = self
                    .columns
                    .get(*stack_index)
                    .and_then(|col| col.items.get(*index))
                    .is_some_and(|item| item.card_id == *card_id);
                let at = if slot_matches {
                    Some(Focus {
                        column: *stack_index,
                        row: *index,
                    })
                } else {
                    self.find(*card_id)
                };
                if let Some(at) = at {
                    self.columns[at.column].items.remove(at.row);
                }
                self.clamp_focus();
            }
            RenderOp::UpdateItem { card_id } => {
                let (Some(card), Some(at)) = (store.card(*card_id), self.find(*card_id)) else {
                    return;
                };
                self.columns[at.column].items[at.row] = CardItem::from_card(card);
            }
            RenderOp::Focus { stack_index, index } => {
                self.focus = Focus {
                    column: *stack_index,
                    row: *index,
                };
                self.clamp_focus();
            }
            RenderOp::RebuildComments => {}
        }
    }

    pub fn apply_all(&mut self, store: &DeckStore, ops: &[RenderOp]) {
        for op in ops {
            self.apply(store, op);
        }
    }

    /// Moves focus by whole columns (`dx`) or rows (`dy`), staying in range.
    pub fn move_focus(&mut self, dx: isize, dy: isize) {
        if self.columns.is_empty() {
            return;
        }
        let last_column = self.columns.len() - 1;
        let column = self.focus.column.saturating_add_signed(dx).min(last_column);
        if column != self.focus.column {
            self.focus = Focus { column, row: 0 };
        } else {
            self.focus.row = self.focus.row.saturating_add_signed(dy);
        }
        self.clamp_focus();
    }

    fn clamp_focus(&mut self) {
        if self.columns.is_empty() {
            self.focus = Focus::default();
            return;
        }
        self.focus.column = self.focus.column.min(self.columns.len() - 1);
        let len = self.columns[self.focus.column].items.len();
        self.focus.row = self.focus.row.min(len.saturating_sub(1));
    }
}
