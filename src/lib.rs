//! Lark Chat Dumper Library
//!
//! This library provides tools to:
//! - Discover Lark/Feishu group chats by name or list all of them
//! - Export each chat's metadata and full message history to a JSON archive
//! - Download the files and images its messages reference
//! - Expose Prometheus metrics about exports

pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod models;
pub mod session;

// Re-export common types
pub use config::Config;
pub use error::{Error, Result};
pub use session::{LarkSession, Session};

pub mod commands;
