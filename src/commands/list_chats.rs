//! List chats command
//!
//! Prints id and name of every chat the app can see, or of the chats whose
//! name matches a search query. Discovery here is shared with `chats`.

use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::export::fetch_all;
use crate::models::ConversationSummary;
use crate::session::{LarkSession, Session};

/// All conversations visible to the app, or those matching `query`.
///
/// A failing page aborts discovery; chats already fetched are dropped.
pub async fn discover<S: Session + ?Sized>(
    session: &S,
    query: Option<&str>,
    page_size: u32,
) -> Result<Vec<ConversationSummary>> {
    let chats = fetch_all(page_size, move |token, size| async move {
        session.list_chats(query, &token, size).await
    })
    .await?;

    match query {
        Some(q) => info!(query = q, count = chats.len(), "Found matching chats"),
        None => info!(count = chats.len(), "Found chats"),
    }
    Ok(chats)
}

/// One output line: `<chat_id>\t<name>`.
pub fn format_chat(chat: &ConversationSummary) -> String {
    format!("{}\t{}", chat.chat_id, chat.name)
}

/// Run list chats command
pub async fn run(query: Option<String>) -> Result<()> {
    let config = Config::new();
    let session = LarkSession::from_config(&config)?;

    let chats = discover(&session, query.as_deref(), config.chat_page_size).await?;
    if chats.is_empty() {
        warn!("No chats found");
        return Ok(());
    }

    for chat in &chats {
        println!("{}", format_chat(chat));
    }
    Ok(())
}
