//! Conversation export pipeline.
//!
//! Provides:
//! - Cursor pagination over chat and message listings
//! - Attachment extraction from typed message bodies
//! - Streaming attachment download
//! - The per-conversation archive writer

pub mod archive;
pub mod attachments;
pub mod fetch;
pub mod paginate;

pub use archive::{archive_name, sanitize_name, ArchiveReport, ArchiveWriter};
pub use attachments::{extract, extract_all, AttachmentKind, AttachmentRef};
pub use fetch::AttachmentFetcher;
pub use paginate::{fetch_all, PartialPages};
