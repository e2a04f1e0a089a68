//! Bloom CLI
//!
//! Command-line client for the bloom social feed.
//!
//! # Commands
//!
//! - `signup` - Register a new account
//! - `timeline` - Show the home timeline
//! - `blooms` / `bloom` - Show a user's blooms, or one bloom
//! - `post` / `rebloom` - Publish or reshare a bloom
//! - `hashtag` - Show blooms carrying a hashtag
//! - `profile` - Show a profile
//! - `follow` / `unfollow` - Change who you follow
//! - `suggestions` - Show who to follow

mod commands;

use bloom_sync::{ClientConfig, MemoryStore, ReqwestClient, SyncClient};
use clap::{Parser, Subcommand};
use commands::{Auth, Client, StderrDisplay};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Bloom social feed client.
#[derive(Parser)]
#[command(name = "bloom")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API origin
    #[arg(global = true, long, env = "BLOOM_API_ORIGIN")]
    origin: Option<String>,

    /// Account username
    #[arg(global = true, short, long, env = "BLOOM_USERNAME")]
    username: Option<String>,

    /// Account password
    #[arg(global = true, short, long, env = "BLOOM_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new account
    Signup,

    /// Show the home timeline
    Timeline,

    /// Show the blooms of a user
    Blooms {
        /// Username
        user: String,
    },

    /// Show a single bloom
    Bloom {
        /// Bloom id
        id: i64,
    },

    /// Publish a bloom
    Post {
        /// Bloom content
        content: String,
    },

    /// Reshare an existing bloom
    Rebloom {
        /// Id of the bloom to reshare
        id: i64,
    },

    /// Show blooms tagged with a hashtag
    Hashtag {
        /// Hashtag, with or without the leading '#'
        tag: String,
    },

    /// Show a profile (your own if no user is given)
    Profile {
        /// Username
        user: Option<String>,
    },

    /// Follow a user
    Follow {
        /// Username
        user: String,
    },

    /// Stop following a user
    Unfollow {
        /// Username
        user: String,
    },

    /// Show who to follow
    Suggestions,

    /// Show version information
    Version,
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

    let config = match cli.origin {
        Some(origin) => {
            let defaults = ClientConfig::from_env();
            ClientConfig::new(origin).with_suggested_follows(defaults.suggested_follows)
        }
        None => ClientConfig::from_env(),
    };
    debug!(origin = %config.api_origin, "using API");
    let client: Client = SyncClient::new(
        config,
        ReqwestClient::new(),
        Arc::new(MemoryStore::new()),
        Arc::new(StderrDisplay),
    );
    let auth = Auth::new(cli.username, cli.password);
    let format = cli.format.as_str();

    match cli.command {
        Commands::Signup => commands::session::signup(&client, &auth, format).await?,
        Commands::Timeline => commands::feed::timeline(&client, &auth, format).await?,
        Commands::Blooms { user } => commands::feed::blooms(&client, &user, format).await?,
        Commands::Bloom { id } => commands::feed::bloom(&client, id, format).await?,
        Commands::Post { content } => {
            commands::feed::post(&client, &auth, &content, format).await?
        }
        Commands::Rebloom { id } => commands::feed::rebloom(&client, &auth, id, format).await?,
        Commands::Hashtag { tag } => commands::feed::hashtag(&client, &tag, format).await?,
        Commands::Profile { user } => {
            commands::social::profile(&client, &auth, user.as_deref(), format).await?
        }
        Commands::Follow { user } => {
            commands::social::follow(&client, &auth, &user, true, format).await?
        }
        Commands::Unfollow { user } => {
            commands::social::follow(&client, &auth, &user, false, format).await?
        }
        Commands::Suggestions => commands::social::suggestions(&client, &auth, format).await?,
        Commands::Version => {
            println!("Bloom CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
