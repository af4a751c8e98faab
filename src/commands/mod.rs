//! Command implementations
//!
//! Each module corresponds to a subcommand in the CLI.

pub mod chats;
pub mod list_chats;

// Re-export commonly used types
pub use chats::{export_chats, run as chats_run, ChatsArgs, ExportSummary};
pub use list_chats::{discover, run as list_chats_run};
