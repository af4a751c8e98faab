//! Chats command
//!
//! Exports the selected chats one after another into `<path>`, each as a JSON
//! archive plus, with `--with-file`, a directory of its attachments. A chat
//! that fails to export is logged and skipped; the run reports the failures
//! once every chat has been tried.

use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::commands::list_chats::discover;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::export::{ArchiveWriter, AttachmentFetcher};
use crate::metrics;
use crate::session::{LarkSession, Session};

/// Arguments of the `chats` subcommand.
#[derive(Debug, Clone)]
pub struct ChatsArgs {
    pub query: Option<String>,
    pub all: bool,
    pub path: PathBuf,
    pub with_file: bool,
}

impl ChatsArgs {
    /// Search query to discover chats with; `None` means every chat.
    pub fn search_query(&self) -> Result<Option<&str>> {
        if self.all {
            return Ok(None);
        }
        match self.query.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => Ok(Some(q)),
            _ => Err(Error::InvalidArgument(
                "a chat name query is required unless --all is given".to_string(),
            )),
        }
    }
}

/// Outcome of a multi-chat export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub exported: usize,
    pub failed: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.exported + self.failed
    }

    /// Turn a run with failed chats into an error.
    pub fn into_result(self) -> Result<Self> {
        if self.failed > 0 {
            return Err(Error::PartialExport {
                failed: self.failed,
                total: self.total(),
            });
        }
        Ok(self)
    }
}

/// Discover the chats selected by `args` and export each of them in turn.
///
/// Only discovery errors and invalid arguments fail the whole call; per-chat
/// failures are counted in the summary.
pub async fn export_chats<S: Session + ?Sized>(
    session: &S,
    fetcher: &AttachmentFetcher,
    config: &Config,
    args: &ChatsArgs,
) -> Result<ExportSummary> {
    let query = args.search_query()?;
    let chats = discover(session, query, config.chat_page_size).await?;
    if chats.is_empty() {
        warn!("No chats to export");
    }

    let mut summary = ExportSummary::default();
    for chat in &chats {
        info!(chat_id = %chat.chat_id, "dumping chat {}", chat.name);

        let writer = ArchiveWriter::new(session, fetcher.clone())
            .with_page_size(config.message_page_size);
        match writer
            .export(&chat.chat_id, &args.path, args.with_file)
            .await
        {
            Ok(report) => {
                metrics::record_conversation(true);
                metrics::record_attachments(report.attachments, report.attachment_bytes);
                summary.exported += 1;
            }
            Err(err) => {
                let err = err.in_chat(&chat.chat_id, &chat.name);
                error!(chat_id = %chat.chat_id, name = %chat.name, "{}", err);
                metrics::record_conversation(false);
                summary.failed += 1;
            }
        }
    }

    info!(
        exported = summary.exported,
        failed = summary.failed,
        path = %args.path.display(),
        "Export finished"
    );
    Ok(summary)
}

/// Run chats command
pub async fn run(args: ChatsArgs) -> Result<ExportSummary> {
    // Argument and credential problems surface before any request.
    args.search_query()?;
    let config = Config::new();
    let session = LarkSession::from_config(&config)?;
    let fetcher = AttachmentFetcher::new()?;

    export_chats(&session, &fetcher, &config, &args)
        .await?
        .into_result()
}
