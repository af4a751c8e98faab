//! Data model for Lark IM conversations and messages.
//!
//! Records keep every field the platform sends: the ones the exporter reads
//! are typed, the rest (explicit nulls included) is carried in a flattened
//! `extra` map so archives hold the platform record verbatim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One entry of the chat listing / search API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub chat_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Full chat detail record, embedded into the archive as `meta`.
///
/// Only `name` is typed; every other field, explicit nulls included, stays in
/// `extra` exactly as the platform sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConversationMetadata {
    fn text(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.text("owner_id")
    }

    pub fn chat_mode(&self) -> Option<&str> {
        self.text("chat_mode")
    }

    pub fn chat_type(&self) -> Option<&str> {
        self.text("chat_type")
    }
}

/// Message body; `content` is itself a JSON document whose shape depends on `msg_type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    #[serde(default)]
    pub content: String,
}

/// A single IM message as returned by the message listing API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub msg_type: String,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub body: MessageBody,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text,
    Image,
    File,
    Post,
    Other,
}

impl MessageKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "text" => MessageKind::Text,
            "image" => MessageKind::Image,
            "file" => MessageKind::File,
            "post" => MessageKind::Post,
            _ => MessageKind::Other,
        }
    }
}

impl Message {
    /// Build a message with the given type tag and raw body content.
    pub fn new(
        message_id: impl Into<String>,
        msg_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            msg_type: msg_type.into(),
            deleted: false,
            body: MessageBody {
                content: content.into(),
            },
            extra: Map::new(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        MessageKind::parse(&self.msg_type)
    }
}

/// One page of a paginated listing (`data` of the API envelope).
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub items: Vec<T>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_token: Option<&str>, has_more: bool) -> Self {
        Self {
            items,
            page_token: page_token.map(str::to_string),
            has_more,
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// The archive document written for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationArchive {
    pub meta: ConversationMetadata,
    pub msgs: Vec<Message>,
}
