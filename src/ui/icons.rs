//! Shared UI icons and emojis.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");

// Board indicators
pub static BOARD: Emoji<'_, '_> = Emoji("📋 ", "");
pub static STACK: Emoji<'_, '_> = Emoji("📂 ", "#");
pub static FOCUS: Emoji<'_, '_> = Emoji("👉 ", "> ");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static COMMENT: Emoji<'_, '_> = Emoji("💬 ", "*");
