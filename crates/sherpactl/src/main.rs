//! Sherpa Control - CLI client for the Sherpa daemon.
//!
//! Talks to sherpad over its HTTP API: daemon health, fallback metrics,
//! service client assignments and an interactive planning chat.

mod client;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sherpactl")]
#[command(about = "Sherpa travel assistant - control CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Base URL of the sherpad HTTP API
    #[arg(long, global = true, default_value = "http://127.0.0.1:7878")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show daemon health and service client state
    Status,

    /// Show fallback counters per category
    Metrics {
        /// Print the raw JSON snapshot
        #[arg(long)]
        json: bool,
    },

    /// List external service clients and their credential groups
    Services {
        /// Print the raw JSON map
        #[arg(long)]
        json: bool,
    },

    /// Send a single message and print the reply
    Ask {
        /// Message text
        message: String,

        /// User id for profile caching on the daemon
        #[arg(long)]
        user: Option<String>,
    },

    /// Interactive planning conversation
    Chat {
        /// User id for profile caching on the daemon
        #[arg(long)]
        user: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = client::DaemonClient::new(cli.url);

    match cli.command {
        Commands::Status => commands::status(&client).await,
        Commands::Metrics { json } => commands::metrics(&client, json).await,
        Commands::Services { json } => commands::services(&client, json).await,
        Commands::Ask { message, user } => commands::ask(&client, &message, user).await,
        Commands::Chat { user } => commands::chat(&client, user).await,
    }
}
