//! Due-date formats.
//!
//! The service exchanges timestamps as `2024-03-01T14:30:00+00:00`; edit
//! fields show them as `01/03/2024 14:30`, with `:SS` appended when the
//! stored instant is not on a whole minute. Conversion happens only at the
//! edit-open boundary (stored -> display) and the save boundary
//! (display -> stored). Display values are read as UTC.
//!
//! Parsing is lenient: anything unparsable yields `None` and the field is
//! left unset.

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};

pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S+00:00";
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";
pub const DISPLAY_FORMAT_SECONDS: &str = "%d/%m/%Y %H:%M:%S";

pub fn to_display(instant: &DateTime<Utc>) -> String {
    let format = if instant.second() == 0 {
        DISPLAY_FORMAT
    } else {
        DISPLAY_FORMAT_SECONDS
    };
    instant.format(format).to_string()
}

pub fn to_canonical(instant: &DateTime<Utc>) -> String {
    instant.format(CANONICAL_FORMAT).to_string()
}

pub fn parse_display(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(text, DISPLAY_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, DISPLAY_FORMAT_SECONDS))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Accepts any RFC 3339 offset, not only `+00:00`.
pub fn parse_canonical(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn stored_to_display(stored: &str) -> Option<String> {
    parse_canonical(stored).map(|dt| to_display(&dt))
}

pub fn display_to_stored(display: &str) -> Option<String> {
    parse_display(display).map(|dt| to_canonical(&dt))
}

/// Keystroke filter for the due-date field: digits, `/`, `:` and space.
pub fn due_date_char_allowed(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '/' | ':' | ' ')
}

/// Keystroke filter for the order field: digits only.
pub fn order_char_allowed(c: char) -> bool {
    c.is_ascii_digit()
}

/// Applies a keystroke filter to pasted or line-entered text, dropping
/// every rejected character.
pub fn filter_input(text: &str, allowed: fn(char) -> bool) -> String {
    text.chars().filter(|c| allowed(*c)).collect()
}

/// Parses the order field. Empty or overflowing input becomes 0.
pub fn parse_order(text: &str) -> i64 {
    filter_input(text, order_char_allowed).parse().unwrap_or(0)
}

/// Serde adapter for optional timestamps: written in the canonical format,
/// read leniently (`null`, empty or malformed strings all become `None`).
pub mod lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&super::to_canonical(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => super::parse_canonical(&s),
            _ => None,
        })
    }
}
