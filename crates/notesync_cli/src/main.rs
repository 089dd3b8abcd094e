//! NoteSync CLI
//!
//! Command-line client for a NoteSync note store.
//!
//! # Commands
//!
//! - `add` - Create a note
//! - `list` - List notes with their sync status
//! - `edit` - Retitle a note
//! - `delete` - Delete a note
//! - `sync` - Push pending changes and pull remote ones
//! - `inspect` - Show sync and store statistics
//!
//! Without `--server` every change is recorded locally and queued for a
//! later `sync`.

mod client;
mod commands;
mod error;
mod gateway;

use clap::{Parser, Subcommand};
use gateway::CliGateway;
use notesync_engine::{EngineConfig, HttpGatewayConfig, SyncEngine};
use notesync_storage::FileStore;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// NoteSync command-line client.
#[derive(Parser)]
#[command(name = "notesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local store directory
    #[arg(global = true, short, long, default_value = "notesync-data")]
    store: PathBuf,

    /// Base URL of the note server
    #[arg(global = true, long)]
    server: Option<String>,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value = "30")]
    timeout: u64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a note
    Add {
        /// Note title
        title: String,
    },

    /// List notes
    List {
        /// Include notes awaiting remote delete
        #[arg(short, long)]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Retitle a note
    Edit {
        /// Local id or a unique prefix of it
        id: String,

        /// New title
        title: String,
    },

    /// Delete a note
    Delete {
        /// Local id or a unique prefix of it
        id: String,
    },

    /// Push pending changes, then pull remote ones
    Sync {
        /// Skip pulling remote changes
        #[arg(long)]
        no_refresh: bool,
    },

    /// Show sync and store statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let gateway = match &cli.server {
        Some(url) => {
            let config =
                HttpGatewayConfig::new(url).with_timeout(Duration::from_secs(cli.timeout));
            CliGateway::http(config)?
        }
        None => CliGateway::offline(),
    };
    let store = FileStore::open(&cli.store)?;
    let engine = Arc::new(SyncEngine::new(EngineConfig::default(), store, gateway)?);

    match cli.command {
        Commands::Add { title } => commands::add::run(&*engine, title).await?,
        Commands::List { all, format } => commands::list::run(&*engine, all, &format)?,
        Commands::Edit { id, title } => commands::edit::run(&*engine, &id, title).await?,
        Commands::Delete { id } => commands::delete::run(&*engine, &id).await?,
        Commands::Sync { no_refresh } => {
            let has_server = engine.gateway().has_server();
            commands::sync::run(&engine, has_server, !no_refresh).await?
        }
        Commands::Inspect { format } => {
            let remote = engine.gateway().describe();
            commands::inspect::run(&*engine, &remote, &format)?
        }
    }

    Ok(())
}
