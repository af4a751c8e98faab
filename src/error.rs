//! Error types for the Lark dumper

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Lark API error {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("download file failed, status code: {0}")]
    DownloadStatus(u16),

    #[error("Protocol violation: {0}")]
    Protocol(String),

    #[error("Malformed content in message {message_id}: {reason}")]
    MalformedContent { message_id: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to export chat {chat_id} ({name}): {source}")]
    Export {
        chat_id: String,
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{failed} of {total} chats failed to export")]
    PartialExport { failed: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Attach conversation context to an error raised while exporting it.
    pub fn in_chat(self, chat_id: &str, name: &str) -> Self {
        Error::Export {
            chat_id: chat_id.to_string(),
            name: name.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(err.to_string())
    }
}
