//! Data models for the GroupMe v3 API.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A chat message from a group or a direct-message thread.
///
/// Fields the search does not look at are kept in `extra` so that `--json`
/// output reproduces the server object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Message ID. Decreases as pagination walks back in time.
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    /// Message text; absent for attachment-only messages.
    #[serde(default)]
    pub text: Option<String>,
    /// Display name of the sender.
    #[serde(rename = "name", default)]
    pub author_name: String,
    /// Send time in Unix seconds.
    #[serde(default)]
    pub created_at: i64,
    /// IDs of users who liked the message.
    #[serde(default)]
    pub favorited_by: Vec<String>,
    /// Attachments in send order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// Whether `user_id` liked this message.
    #[must_use]
    pub fn is_favorited_by(&self, user_id: &str) -> bool {
        self.favorited_by.iter().any(|id| id == user_id)
    }
}

/// A message attachment (image, location, emoji, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attachment {
    /// Attachment type, e.g. `image`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Resource URL, for types that have one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Attachment {
    /// URL of this attachment if it is an image.
    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        if self.kind == "image" {
            self.url.as_deref()
        } else {
            None
        }
    }
}

/// Kind of conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    /// Group chat.
    Group,
    /// One-on-one thread.
    DirectMessage,
}

/// A searchable conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Group ID, or the other participant's user ID for direct messages.
    pub id: String,
    /// Group name, or the other participant's name for direct messages.
    pub name: String,
    /// Group chat or direct message.
    pub kind: ConversationKind,
}

/// Group entry as returned by `GET /groups`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GroupRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<GroupRecord> for Conversation {
    fn from(group: GroupRecord) -> Self {
        Self {
            id: group.id,
            name: group.name.unwrap_or_default(),
            kind: ConversationKind::Group,
        }
    }
}

/// Chat entry as returned by `GET /chats`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatRecord {
    pub other_user: UserRecord,
}

impl From<ChatRecord> for Conversation {
    fn from(chat: ChatRecord) -> Self {
        Self {
            id: chat.other_user.id,
            name: chat.other_user.name,
            kind: ConversationKind::DirectMessage,
        }
    }
}

/// User object as embedded in chats and returned by `GET /users/me`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct UserRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Accept IDs encoded either as JSON strings or numbers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
