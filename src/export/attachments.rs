//! Classification of message bodies into downloadable attachments.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{Message, MessageKind};

/// Resource type understood by the message resource endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    File,
    Image,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::File => "file",
            AttachmentKind::Image => "image",
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file or image referenced by a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    pub message_id: String,
    pub key: String,
    pub file_name: String,
    pub kind: AttachmentKind,
}

impl AttachmentRef {
    fn image(message_id: &str, image_key: String) -> Self {
        Self {
            message_id: message_id.to_string(),
            file_name: image_key.clone(),
            key: image_key,
            kind: AttachmentKind::Image,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FileContent {
    file_key: String,
    file_name: String,
}

#[derive(Debug, Deserialize)]
struct ImageContent {
    image_key: String,
}

#[derive(Debug, Deserialize)]
struct PostElement {
    tag: String,
    #[serde(default)]
    image_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostBody {
    content: Vec<Vec<PostElement>>,
}

/// Rich-text body: either the flat form the message list returns or the
/// locale-keyed form (`{"zh_cn": {...}}`) used when posting.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PostContent {
    Flat(PostBody),
    Localized(BTreeMap<String, PostBody>),
}

impl PostContent {
    fn bodies(self) -> Option<Vec<PostBody>> {
        match self {
            PostContent::Flat(body) => Some(vec![body]),
            PostContent::Localized(map) if map.is_empty() => None,
            PostContent::Localized(map) => Some(map.into_values().collect()),
        }
    }
}

fn malformed(message: &Message, reason: impl Into<String>) -> Error {
    Error::MalformedContent {
        message_id: message.message_id.clone(),
        reason: reason.into(),
    }
}

fn decode<'a, T: Deserialize<'a>>(message: &'a Message) -> Result<T> {
    serde_json::from_str(&message.body.content).map_err(|e| malformed(message, e.to_string()))
}

/// Image keys of a rich-text post in element order. A key repeated across
/// locales or paragraphs is reported once.
fn post_image_keys(message: &Message, content: PostContent) -> Result<Vec<String>> {
    let bodies = content
        .bodies()
        .ok_or_else(|| malformed(message, "post has no content"))?;

    let mut keys: Vec<String> = Vec::new();
    for element in bodies.into_iter().flat_map(|body| body.content).flatten() {
        if element.tag != "img" {
            continue;
        }
        let key = element
            .image_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| malformed(message, "img element without image_key"))?;
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

/// Attachments referenced by one message, in body order.
///
/// Deleted messages yield nothing and are not decoded. A body that does not
/// match its type tag is an error.
pub fn extract(message: &Message) -> Result<Vec<AttachmentRef>> {
    if message.deleted {
        return Ok(Vec::new());
    }

    let id = message.message_id.as_str();
    match message.kind() {
        MessageKind::File => {
            let content: FileContent = decode(message)?;
            Ok(vec![AttachmentRef {
                message_id: id.to_string(),
                key: content.file_key,
                file_name: content.file_name,
                kind: AttachmentKind::File,
            }])
        }
        MessageKind::Image => {
            let content: ImageContent = decode(message)?;
            Ok(vec![AttachmentRef::image(id, content.image_key)])
        }
        MessageKind::Post => {
            let content: PostContent = decode(message)?;
            Ok(post_image_keys(message, content)?
                .into_iter()
                .map(|key| AttachmentRef::image(id, key))
                .collect())
        }
        MessageKind::Text | MessageKind::Other => Ok(Vec::new()),
    }
}

/// Attachments of a whole conversation, flattened in message order.
pub fn extract_all(messages: &[Message]) -> Result<Vec<AttachmentRef>> {
    let mut refs = Vec::new();
    for message in messages {
        refs.extend(extract(message)?);
    }
    Ok(refs)
}
