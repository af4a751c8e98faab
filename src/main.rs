//! Lark Dumper CLI - main entry point
//!
//! Exports Lark/Feishu group chats to JSON archives.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use lark_dumper::commands::{self, ChatsArgs};
use lark_dumper::metrics;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "lark_dumper")]
#[command(about = "Lark/Feishu chat history dumper", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump chats matching a name (or all chats) to JSON archives
    Chats {
        /// Chat name to search for
        #[arg(required_unless_present = "all")]
        query: Option<String>,

        /// Dump every chat the app can see
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Directory to write archives into
        #[arg(short, long, default_value = ".")]
        path: PathBuf,

        /// Also download files and images referenced by messages
        #[arg(long, default_value_t = false)]
        with_file: bool,
    },

    /// List chats (id and name) without dumping them
    ListChats {
        /// Chat name to search for
        query: Option<String>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Chats { .. } => "chats",
            Commands::ListChats { .. } => "list_chats",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lark_dumper=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let command_name = cli.command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(cli.command).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}

async fn execute_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Chats {
            query,
            all,
            path,
            with_file,
        } => {
            let summary = commands::chats_run(ChatsArgs {
                query,
                all,
                path,
                with_file,
            })
            .await?;
            info!(exported = summary.exported, "All chats dumped");
        }
        Commands::ListChats { query } => {
            commands::list_chats_run(query).await?;
        }
    }
    Ok(())
}
