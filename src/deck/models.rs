use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::dates;

/// Treats an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
}

/// A board member as the service describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_key: String,
    pub uid: String,
    #[serde(rename = "displayname", default, deserialize_with = "null_as_default")]
    pub display_name: String,
}

impl Owner {
    /// Initials of the display name, at most two letters, upper-cased.
    /// Falls back to the uid when the display name is blank.
    pub fn abbreviation(&self) -> String {
        let source = if self.display_name.trim().is_empty() {
            &self.uid
        } else {
            &self.display_name
        };
        source
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub users: Vec<Owner>,
}

impl Board {
    pub fn label(&self, id: i64) -> Option<&Label> {
        self.labels.iter().find(|l| l.id == id)
    }

    pub fn user(&self, uid: &str) -> Option<&Owner> {
        self.users.iter().find(|u| u.uid == uid)
    }
}

/// Assignment of a board member to a card. `kind` is the service's
/// assignment type tag (0 = user, 1 = group, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedUser {
    #[serde(default)]
    pub card_id: i64,
    #[serde(rename = "type", default)]
    pub kind: i32,
    pub participant: Owner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: i64,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    pub stack_id: i64,
    #[serde(default)]
    pub order: i64,
    #[serde(rename = "duedate", default, with = "dates::lenient")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assigned_users: Vec<AssignedUser>,
    #[serde(rename = "type", default = "default_card_kind")]
    pub kind: String,
}

pub(crate) fn default_card_kind() -> String {
    "plain".to_string()
}

impl Card {
    pub fn has_label(&self, label_id: i64) -> bool {
        self.labels.iter().any(|l| l.id == label_id)
    }

    pub fn has_user(&self, uid: &str) -> bool {
        self.assigned_users.iter().any(|u| u.participant.uid == uid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub order: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cards: Vec<Card>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ReplyRef {
    id: i64,
}

/// Flattens the service's nested `replyTo` object to a parent id.
mod reply_to {
    use super::ReplyRef;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.map(|id| ReplyRef { id }).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<ReplyRef>::deserialize(deserializer)?.map(|r| r.id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: i64,
    #[serde(rename = "objectId", default)]
    pub card_id: i64,
    #[serde(rename = "actorId", default, deserialize_with = "null_as_default")]
    pub author_id: String,
    #[serde(
        rename = "actorDisplayName",
        default,
        deserialize_with = "null_as_default"
    )]
    pub author_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(rename = "replyTo", default, with = "reply_to")]
    pub parent_id: Option<i64>,
    #[serde(rename = "creationDateTime", default, with = "dates::lenient")]
    pub created_at: Option<DateTime<Utc>>,
}
