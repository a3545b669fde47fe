//! Text rendering of a [`BoardView`], a card and its comment tree.
//!
//! Everything here returns strings so the session only has to print them.

use console::{Style, style};

use crate::deck::comments::CommentNode;
use crate::deck::dates;
use crate::deck::models::{Board, Card};
use crate::deck::render::{BoardView, CardItem, LabelChip};
use crate::deck::status::StatusNotice;
use crate::ui::icons::{BOARD, CHECK, CLOCK, COMMENT, CROSS, FOCUS, STACK};

/// Maps a Deck label color (`"ff0000"` or `"#ff0000"`) to the nearest
/// xterm-256 cube entry.
pub fn hex_to_ansi256(hex: &str) -> Option<u8> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let (r, g, b) = (channel(0)?, channel(2)?, channel(4)?);
    let level = |v: u8| (u16::from(v) * 5 + 127) / 255;
    Some((16 + 36 * level(r) + 6 * level(g) + level(b)) as u8)
}

fn chip(label: &LabelChip, color: bool) -> String {
    let text = format!("[{}]", label.title);
    match hex_to_ansi256(&label.color) {
        Some(code) if color => style(text).color256(code).to_string(),
        _ => text,
    }
}

fn item_lines(item: &CardItem, focused: bool, color: bool) -> Vec<String> {
    let marker = if focused {
        FOCUS.to_string()
    } else {
        "   ".to_string()
    };
    let line = if focused && color {
        style(item.line()).bold().to_string()
    } else {
        item.line()
    };
    let mut out = vec![format!("{}{}", marker, line)];
    if !item.labels.is_empty() {
        let chips: Vec<String> = item.labels.iter().map(|l| chip(l, color)).collect();
        out.push(format!("      {}", chips.join(" ")));
    }
    out
}

/// All columns stacked vertically, focus marked.
pub fn render_board(view: &BoardView, color: bool) -> String {
    let heading = Style::new().bold().cyan();
    let mut out = Vec::new();
    let title = format!("{}{}", BOARD, view.title);
    out.push(if color {
        heading.apply_to(title).to_string()
    } else {
        title
    });

    for (column_index, column) in view.columns.iter().enumerate() {
        out.push(String::new());
        let header = format!("{}{} ({})", STACK, column.title, column.items.len());
        out.push(if color {
            style(header).bold().to_string()
        } else {
            header
        });
        if column.items.is_empty() {
            out.push("   (empty)".to_string());
        }
        for (row, item) in column.items.iter().enumerate() {
            let focused = view.focus.column == column_index && view.focus.row == row;
            out.extend(item_lines(item, focused, color));
        }
    }
    out.join("\n")
}

pub fn status_line(notice: &StatusNotice, color: bool) -> String {
    if notice.is_error() {
        let text = format!("{}{}", CROSS, notice.text);
        if color {
            style(text).red().to_string()
        } else {
            text
        }
    } else {
        let text = format!("{}{}", CHECK, notice.text);
        if color {
            style(text).dim().to_string()
        } else {
            text
        }
    }
}

/// Card detail: title, due date, labels, assignees and the description
/// wrapped to `width`.
pub fn render_card(card: &Card, board: &Board, width: usize, color: bool) -> String {
    let mut out = Vec::new();
    let title = format!("#{} {}", card.id, card.title);
    out.push(if color {
        style(title).bold().to_string()
    } else {
        title
    });
    if let Some(due) = card.due_date.as_ref().map(dates::to_display) {
        out.push(format!("{}Due {}", CLOCK, due));
    }
    if !card.labels.is_empty() {
        let chips: Vec<String> = card
            .labels
            .iter()
            .map(|l| {
                chip(
                    &LabelChip {
                        title: l.title.clone(),
                        color: l.color.clone(),
                    },
                    color,
                )
            })
            .collect();
        out.push(format!("Labels: {}", chips.join(" ")));
    }
    if !card.assigned_users.is_empty() {
        let names: Vec<&str> = card
            .assigned_users
            .iter()
            .map(|u| {
                board
                    .user(&u.participant.uid)
                    .map(|o| o.display_name.as_str())
                    .unwrap_or(u.participant.display_name.as_str())
            })
            .collect();
        out.push(format!("Assigned: {}", names.join(", ")));
    }
    out.push(String::new());
    if card.description.trim().is_empty() {
        out.push("(no description)".to_string());
    } else {
        out.push(textwrap::fill(&card.description, width.max(20)));
    }
    out.join("\n")
}

/// One line per comment, indented by reply depth.
pub fn comment_lines(tree: &[CommentNode]) -> Vec<(i64, String)> {
    tree.iter()
        .flat_map(|root| root.walk())
        .map(|(depth, node)| {
            let first_line = node.message.lines().next().unwrap_or_default();
            (
                node.comment_id,
                format!(
                    "{}{}{}: {}",
                    "  ".repeat(depth),
                    COMMENT,
                    node.author,
                    first_line
                ),
            )
        })
        .collect()
}
