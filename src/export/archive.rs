//! Per-conversation archive writer.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs::{self, File};
use tracing::{debug, info};

use crate::config::MESSAGE_PAGE_SIZE;
use crate::error::Result;
use crate::export::attachments::{self, AttachmentRef};
use crate::export::fetch::AttachmentFetcher;
use crate::export::paginate::fetch_all;
use crate::models::{ConversationArchive, Message};
use crate::session::Session;

/// Number of trailing chat id characters used in archive names.
const ID_SUFFIX_LEN: usize = 6;

/// What one export produced on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveReport {
    pub archive_path: PathBuf,
    pub attachment_dir: Option<PathBuf>,
    pub messages: usize,
    pub attachments: usize,
    pub attachment_bytes: u64,
}

/// Replace path separators so a name cannot leave its directory.
pub fn sanitize_name(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

/// `<last 6 chars of id>-<sanitized name>`, shared by the JSON file and the
/// attachment directory.
pub fn archive_name(chat_id: &str, name: &str) -> String {
    let chars: Vec<char> = chat_id.chars().collect();
    let suffix: String = chars[chars.len().saturating_sub(ID_SUFFIX_LEN)..]
        .iter()
        .collect();
    format!("{}-{}", suffix, sanitize_name(name))
}

/// Serialize an archive as tab-indented JSON.
pub fn to_json(archive: &ConversationArchive) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    archive.serialize(&mut serializer)?;
    Ok(buffer)
}

/// Names that would not create a file inside the attachment directory.
fn is_unusable(name: &str) -> bool {
    matches!(name.trim(), "" | "." | "..")
}

/// On-disk name for an attachment: its suggested name, else its key.
fn attachment_file_name(attachment: &AttachmentRef) -> String {
    let name = sanitize_name(&attachment.file_name);
    if !is_unusable(&name) {
        return name;
    }
    let key = sanitize_name(&attachment.key);
    if is_unusable(&key) {
        format!("{}-{}", attachment.kind, attachment.message_id)
    } else {
        key
    }
}

/// Exports one conversation: metadata, full history and optionally attachments.
pub struct ArchiveWriter<'a, S: Session + ?Sized> {
    session: &'a S,
    fetcher: AttachmentFetcher,
    message_page_size: u32,
}

impl<'a, S: Session + ?Sized> ArchiveWriter<'a, S> {
    pub fn new(session: &'a S, fetcher: AttachmentFetcher) -> Self {
        Self {
            session,
            fetcher,
            message_page_size: MESSAGE_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, message_page_size: u32) -> Self {
        self.message_page_size = message_page_size;
        self
    }

    /// Full message history of a chat, in the order the platform returns it.
    pub async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let session = self.session;
        let messages = fetch_all(self.message_page_size, move |token, size| async move {
            session.list_messages(chat_id, &token, size).await
        })
        .await?;
        Ok(messages)
    }

    /// Write `<dir>/<name>.json` and, with `with_attachments`, `<dir>/<name>/`.
    ///
    /// Attachments are downloaded one at a time in message order and the first
    /// failure aborts the export. The JSON document is written last, so a
    /// conversation whose attachments did not all arrive has no archive file.
    pub async fn export(
        &self,
        chat_id: &str,
        dir: &Path,
        with_attachments: bool,
    ) -> Result<ArchiveReport> {
        let meta = self.session.get_chat(chat_id).await?;
        let msgs = self.fetch_messages(chat_id).await?;
        let name = archive_name(chat_id, &meta.name);
        info!(chat_id, name = %meta.name, messages = msgs.len(), "Fetched chat history");

        fs::create_dir_all(dir).await?;

        let mut attachment_dir = None;
        let mut downloaded = 0;
        let mut attachment_bytes = 0;
        if with_attachments {
            let target = dir.join(&name);
            fs::create_dir_all(&target).await?;

            let refs = attachments::extract_all(&msgs)?;
            debug!(chat_id, count = refs.len(), "Extracted attachments");

            for attachment in &refs {
                let path = target.join(attachment_file_name(attachment));
                let mut file = File::create(&path).await?;
                attachment_bytes += self
                    .fetcher
                    .fetch(self.session, attachment, &mut file)
                    .await?;
                downloaded += 1;
            }

            info!(
                chat_id,
                attachments = downloaded,
                bytes = attachment_bytes,
                "Saved attachments"
            );
            attachment_dir = Some(target);
        }

        let messages = msgs.len();
        let json = to_json(&ConversationArchive { meta, msgs })?;
        let archive_path = dir.join(format!("{}.json", name));
        fs::write(&archive_path, json).await?;
        info!(chat_id, path = %archive_path.display(), "Saved archive");

        Ok(ArchiveReport {
            archive_path,
            attachment_dir,
            messages,
            attachments: downloaded,
            attachment_bytes,
        })
    }
}
