//! Interactive board session driven by `dialoguer` menus.
//!
//! The session owns the [`MutationEngine`], the [`BoardView`] and the
//! [`StatusBar`]. Every engine call hands back [`RenderOp`]s which are
//! applied to the view before the next redraw; background failures show up
//! in the footer after the next drain.

use anyhow::Result;
use console::Term;
use dialoguer::{Confirm, Editor, Input, Select, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::deck::dates;
use crate::deck::engine::{Answer, CardForm, Confirmation, Direction, MutationEngine};
use crate::deck::render::{BoardView, RenderOp};
use crate::deck::status::StatusBar;
use crate::ui::board::{comment_lines, render_board, render_card, status_line};

/// Top-level board menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardAction {
    ChooseCard,
    NextStack,
    PrevStack,
    OpenCard,
    MoveRight,
    MoveLeft,
    DeleteCard,
    AddCard,
    Reload,
    Quit,
}

impl BoardAction {
    pub const ALL: [BoardAction; 10] = [
        BoardAction::ChooseCard,
        BoardAction::NextStack,
        BoardAction::PrevStack,
        BoardAction::OpenCard,
        BoardAction::MoveRight,
        BoardAction::MoveLeft,
        BoardAction::DeleteCard,
        BoardAction::AddCard,
        BoardAction::Reload,
        BoardAction::Quit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BoardAction::ChooseCard => "Choose card",
            BoardAction::NextStack => "Next stack",
            BoardAction::PrevStack => "Previous stack",
            BoardAction::OpenCard => "Open card",
            BoardAction::MoveRight => "Move card to next stack",
            BoardAction::MoveLeft => "Move card to previous stack",
            BoardAction::DeleteCard => "Delete card",
            BoardAction::AddCard => "Add card to this stack",
            BoardAction::Reload => "Reload board",
            BoardAction::Quit => "Quit",
        }
    }
}

/// Menu shown while a card is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    EditFields,
    EditDescription,
    AddLabel,
    RemoveLabel,
    AssignUser,
    UnassignUser,
    Comments,
    Back,
}

impl CardAction {
    pub const ALL: [CardAction; 8] = [
        CardAction::EditFields,
        CardAction::EditDescription,
        CardAction::AddLabel,
        CardAction::RemoveLabel,
        CardAction::AssignUser,
        CardAction::UnassignUser,
        CardAction::Comments,
        CardAction::Back,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CardAction::EditFields => "Edit title, due date and order",
            CardAction::EditDescription => "Edit description",
            CardAction::AddLabel => "Add label",
            CardAction::RemoveLabel => "Remove label",
            CardAction::AssignUser => "Assign user",
            CardAction::UnassignUser => "Unassign user",
            CardAction::Comments => "Comments",
            CardAction::Back => "Back to board",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentAction {
    Add,
    Reply,
    Edit,
    Delete,
    Back,
}

impl CommentAction {
    pub const ALL: [CommentAction; 5] = [
        CommentAction::Add,
        CommentAction::Reply,
        CommentAction::Edit,
        CommentAction::Delete,
        CommentAction::Back,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CommentAction::Add => "New comment",
            CommentAction::Reply => "Reply to comment",
            CommentAction::Edit => "Edit comment",
            CommentAction::Delete => "Delete comment",
            CommentAction::Back => "Back to card",
        }
    }
}

fn labels<T: Copy>(items: &[T], label: fn(T) -> &'static str) -> Vec<&'static str> {
    items.iter().map(|a| label(*a)).collect()
}

/// Spinner shown while waiting on the server.
pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("spinner template is a valid static string"),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

pub struct Session {
    engine: MutationEngine,
    view: BoardView,
    status: StatusBar,
    term: Term,
    theme: ColorfulTheme,
    color: bool,
}

impl Session {
    pub fn new(engine: MutationEngine, status: StatusBar, color: bool) -> Self {
        let view = BoardView::build(engine.store(), None);
        Self {
            engine,
            view,
            status,
            term: Term::stdout(),
            theme: ColorfulTheme::default(),
            color,
        }
    }

    fn apply(&mut self, ops: &[RenderOp]) {
        self.view.apply_all(self.engine.store(), ops);
    }

    fn redraw(&mut self) -> Result<()> {
        self.status.drain();
        self.term.clear_screen()?;
        self.term.write_line(&render_board(&self.view, self.color))?;
        self.term.write_line("")?;
        if let Some(notice) = self.status.latest() {
            self.term.write_line(&status_line(notice, self.color))?;
        }
        Ok(())
    }

    fn width(&self) -> usize {
        usize::from(self.term.size().1).saturating_sub(2)
    }

    /// Runs until the user quits, then waits for background calls.
    pub async fn run(mut self) -> Result<()> {
        loop {
            self.redraw()?;
            let items = labels(&BoardAction::ALL, BoardAction::label);
            let Some(choice) = Select::with_theme(&self.theme)
                .with_prompt("Board")
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                break;
            };

            match BoardAction::ALL[choice] {
                BoardAction::ChooseCard => self.choose_card()?,
                BoardAction::NextStack => self.view.move_focus(1, 0),
                BoardAction::PrevStack => self.view.move_focus(-1, 0),
                BoardAction::OpenCard => {
                    if let Some(card_id) = self.view.focused_card() {
                        self.card_menu(card_id).await?;
                    }
                }
                BoardAction::MoveRight => self.move_focused(Direction::Right)?,
                BoardAction::MoveLeft => self.move_focused(Direction::Left)?,
                BoardAction::DeleteCard => self.delete_focused()?,
                BoardAction::AddCard => self.add_card().await?,
                BoardAction::Reload => {
                    let bar = spinner("Reloading board...");
                    let ops = self.engine.reload().await;
                    bar.finish_and_clear();
                    self.apply(&ops);
                }
                BoardAction::Quit => break,
            }
        }

        if self.engine.in_flight() > 0 {
            let bar = spinner("Waiting for pending changes...");
            self.engine.settle().await;
            bar.finish_and_clear();
        }
        for notice in self.status.drain() {
            if notice.is_error() {
                eprintln!("{}", status_line(&notice, self.color));
            }
        }
        Ok(())
    }

    fn choose_card(&mut self) -> Result<()> {
        let entries: Vec<(i64, String)> = self
            .view
            .columns
            .iter()
            .flat_map(|col| {
                col.items
                    .iter()
                    .map(move |item| (item.card_id, format!("[{}] {}", col.title, item.line())))
            })
            .collect();
        if entries.is_empty() {
            return Ok(());
        }
        let names: Vec<&str> = entries.iter().map(|(_, s)| s.as_str()).collect();
        let current = self
            .view
            .focused_card()
            .and_then(|id| entries.iter().position(|(e, _)| *e == id))
            .unwrap_or(0);
        if let Some(i) = Select::with_theme(&self.theme)
            .with_prompt("Card")
            .items(&names)
            .default(current)
            .interact_opt()?
        {
            if let Some(focus) = self.view.find(entries[i].0) {
                self.view.focus = focus;
            }
        }
        Ok(())
    }

    fn confirm(&self, confirmation: &Confirmation) -> Result<Answer> {
        let answer = Select::with_theme(&self.theme)
            .with_prompt(&confirmation.prompt)
            .items(&confirmation.options)
            .default(1)
            .interact_opt()?;
        Ok(match answer {
            Some(0) => Answer::Yes,
            Some(_) => Answer::No,
            None => Answer::Escape,
        })
    }

    fn move_focused(&mut self, direction: Direction) -> Result<()> {
        let Some(card_id) = self.view.focused_card() else {
            return Ok(());
        };
        if let Ok(Some(prompt)) = self.engine.request_move_card(card_id, direction) {
            let answer = self.confirm(&prompt)?;
            if let Ok(ops) = self.engine.resolve(answer) {
                self.apply(&ops);
            }
        }
        Ok(())
    }

    fn delete_focused(&mut self) -> Result<()> {
        let Some(card_id) = self.view.focused_card() else {
            return Ok(());
        };
        if let Ok(prompt) = self.engine.request_delete_card(card_id) {
            let answer = self.confirm(&prompt)?;
            if let Ok(ops) = self.engine.resolve(answer) {
                self.apply(&ops);
            }
        }
        Ok(())
    }

    fn prompt_form(&self, mut form: CardForm) -> Result<CardForm> {
        form.title = Input::<String>::with_theme(&self.theme)
            .with_prompt("Title")
            .with_initial_text(form.title)
            .interact_text()?;
        let due: String = Input::with_theme(&self.theme)
            .with_prompt("Due date (dd/mm/yyyy hh:mm, empty for none)")
            .with_initial_text(form.due_date)
            .allow_empty(true)
            .interact_text()?;
        form.due_date = dates::filter_input(&due, dates::due_date_char_allowed);
        let order: String = Input::with_theme(&self.theme)
            .with_prompt("Order")
            .with_initial_text(form.order)
            .allow_empty(true)
            .interact_text()?;
        form.order = dates::filter_input(&order, dates::order_char_allowed);
        Ok(form)
    }

    async fn add_card(&mut self) -> Result<()> {
        let Some(stack_id) = self.view.focused_stack() else {
            return Ok(());
        };
        let mut draft = self.prompt_form(CardForm::new_card())?;
        if draft.title.trim().is_empty() {
            return Ok(());
        }
        if Confirm::with_theme(&self.theme)
            .with_prompt("Add a description?")
            .default(false)
            .interact()?
        {
            draft.description = Editor::new().edit("")?.unwrap_or_default();
        }

        let bar = spinner("Creating card...");
        let result = self.engine.add_card(stack_id, draft).await;
        bar.finish_and_clear();
        if let Ok(ops) = result {
            self.apply(&ops);
            if let Some(card_id) = self.engine.editable().map(|c| c.id) {
                self.card_menu(card_id).await?;
            }
        }
        Ok(())
    }

    async fn card_menu(&mut self, card_id: i64) -> Result<()> {
        if self.engine.open_card(card_id).is_err() {
            return Ok(());
        }
        loop {
            self.status.drain();
            let Some(card) = self.engine.editable().cloned() else {
                break;
            };
            self.term.clear_screen()?;
            self.term.write_line(&render_card(
                &card,
                self.engine.store().board(),
                self.width(),
                self.color,
            ))?;
            self.term.write_line("")?;
            if let Some(notice) = self.status.latest() {
                self.term.write_line(&status_line(notice, self.color))?;
            }

            let items = labels(&CardAction::ALL, CardAction::label);
            let Some(choice) = Select::with_theme(&self.theme)
                .with_prompt(format!("Card #{}", card.id))
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                break;
            };

            let ops = match CardAction::ALL[choice] {
                CardAction::EditFields => {
                    let form = self.prompt_form(self.engine.card_form()?)?;
                    self.engine.save_card_form(form).ok()
                }
                CardAction::EditDescription => match Editor::new().edit(&card.description)? {
                    Some(text) => self.engine.save_description(&text).ok(),
                    None => None,
                },
                CardAction::AddLabel => {
                    let choices: Vec<(i64, String)> = self
                        .engine
                        .store()
                        .board()
                        .labels
                        .iter()
                        .filter(|l| !card.has_label(l.id))
                        .map(|l| (l.id, l.title.clone()))
                        .collect();
                    match self.pick("Label", &choices)? {
                        Some(id) => self.engine.assign_label(id).ok(),
                        None => None,
                    }
                }
                CardAction::RemoveLabel => {
                    let choices: Vec<(i64, String)> = card
                        .labels
                        .iter()
                        .map(|l| (l.id, l.title.clone()))
                        .collect();
                    match self.pick("Label", &choices)? {
                        Some(id) => self.engine.unassign_label(id).ok(),
                        None => None,
                    }
                }
                CardAction::AssignUser => {
                    let choices: Vec<(String, String)> = self
                        .engine
                        .store()
                        .board()
                        .users
                        .iter()
                        .filter(|u| !card.has_user(&u.uid))
                        .map(|u| (u.uid.clone(), u.display_name.clone()))
                        .collect();
                    match self.pick("User", &choices)? {
                        Some(uid) => self.engine.assign_user(&uid).ok(),
                        None => None,
                    }
                }
                CardAction::UnassignUser => {
                    let choices: Vec<(String, String)> = card
                        .assigned_users
                        .iter()
                        .map(|u| (u.participant.uid.clone(), u.participant.display_name.clone()))
                        .collect();
                    match self.pick("User", &choices)? {
                        Some(uid) => self.engine.unassign_user(&uid).ok(),
                        None => None,
                    }
                }
                CardAction::Comments => {
                    self.comments_menu(card.id).await?;
                    None
                }
                CardAction::Back => break,
            };
            if let Some(ops) = ops {
                self.apply(&ops);
            }
        }
        self.engine.close_card();
        Ok(())
    }

    async fn comments_menu(&mut self, card_id: i64) -> Result<()> {
        let bar = spinner("Loading comments...");
        let loaded = self.engine.load_comments(card_id).await;
        bar.finish_and_clear();
        if loaded.is_err() || self.engine.store().comments().is_none() {
            return Ok(());
        }

        loop {
            self.status.drain();
            let lines = comment_lines(&self.engine.comment_tree());
            self.term.clear_screen()?;
            if lines.is_empty() {
                self.term.write_line("(no comments)")?;
            }
            for (_, line) in &lines {
                self.term.write_line(line)?;
            }
            self.term.write_line("")?;
            if let Some(notice) = self.status.latest() {
                self.term.write_line(&status_line(notice, self.color))?;
            }

            let items = labels(&CommentAction::ALL, CommentAction::label);
            let Some(choice) = Select::with_theme(&self.theme)
                .with_prompt("Comments")
                .items(&items)
                .default(0)
                .interact_opt()?
            else {
                break;
            };

            match CommentAction::ALL[choice] {
                CommentAction::Add => {
                    if let Some(text) = self.comment_text("")? {
                        let _ = self.engine.add_comment(&text).await;
                    }
                }
                CommentAction::Reply => {
                    if let Some(parent) = self.pick("Reply to", &lines)? {
                        if let Some(text) = self.comment_text("")? {
                            let _ = self.engine.reply_comment(parent, &text).await;
                        }
                    }
                }
                CommentAction::Edit => {
                    if let Some(id) = self.pick("Edit", &lines)? {
                        let current = self.engine.comment_form(id)?;
                        if let Some(text) = self.comment_text(&current)? {
                            let _ = self.engine.edit_comment(id, &text);
                        }
                    }
                }
                CommentAction::Delete => {
                    if let Some(id) = self.pick("Delete", &lines)? {
                        if let Ok(prompt) = self.engine.request_delete_comment(id) {
                            let answer = self.confirm(&prompt)?;
                            let _ = self.engine.resolve(answer);
                        }
                    }
                }
                CommentAction::Back => break,
            }
        }
        Ok(())
    }

    fn comment_text(&self, initial: &str) -> Result<Option<String>> {
        let text: String = Input::with_theme(&self.theme)
            .with_prompt("Comment")
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()?;
        Ok(Some(text).filter(|t| !t.trim().is_empty()))
    }

    fn pick<K: Clone>(&self, prompt: &str, choices: &[(K, String)]) -> Result<Option<K>> {
        if choices.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = choices.iter().map(|(_, s)| s.as_str()).collect();
        let picked = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&names)
            .default(0)
            .interact_opt()?;
        Ok(picked.map(|i| choices[i].0.clone()))
    }
}
