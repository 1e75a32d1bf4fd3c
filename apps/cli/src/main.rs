//! MediaShare command-line client entry point.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mediashare_client::{QueryCache, RemoteMediaService, WsClient};
use mediashare_protocol::PostId;

use crate::config::ClientConfig;

/// MediaShare: upload media and browse the shared feed
#[derive(Parser, Debug)]
#[command(name = "mediashare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "MEDIASHARE_CONFIG")]
    config: Option<PathBuf>,

    /// Media service WebSocket URL
    #[arg(short, long, env = "MEDIASHARE_SERVER")]
    server: Option<String>,

    /// Upload chunk size in bytes
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Attempts per chunk before the upload fails
    #[arg(long)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a photo or video as a new post
    Upload {
        /// File to upload
        file: PathBuf,
    },

    /// List posts from the feed
    Feed {
        /// Posts per page
        #[arg(long)]
        page_size: Option<u64>,

        /// 0-based page to show
        #[arg(long, default_value_t = 0)]
        page: u64,

        /// Keep listing until the end of the feed
        #[arg(long)]
        all: bool,
    },

    /// Show a single post
    Show {
        post_id: PostId,

        /// Write the post's media to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List posts by an author
    Posts {
        /// Author principal
        author: String,
    },

    /// Delete a post
    Delete { post_id: PostId },

    /// Show the caller's role and profile
    Whoami,

    /// Read or update profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Show a profile (the caller's when no user is given)
    Show { user: Option<String> },

    /// Set the caller's display name
    Set { name: String },
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<ClientConfig> {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut config = ClientConfig::load_from(&path)
            .with_context(|| format!("failed to load config from {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");

        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.max_attempts = max_attempts;
        }
        if let Command::Feed {
            page_size: Some(page_size),
            ..
        } = &self.command
        {
            config.page_size = *page_size;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        server = %config.server_url,
        "starting MediaShare client"
    );

    let client = WsClient::connect(&config.server_url)
        .await
        .with_context(|| format!("failed to connect to {}", config.server_url))?;
    let client = Arc::new(client);
    client
        .set_disconnect_callback(Box::new(|| tracing::warn!("connection to media service lost")))
        .await;

    let service = Arc::new(RemoteMediaService::new(
        client.clone(),
        Arc::new(QueryCache::new()),
    ));

    let code = match cli.command {
        Command::Upload { file } => commands::upload(service, &config, &file).await?,
        Command::Feed { page, all, .. } => {
            commands::feed(service, config.page_size, page, all).await?
        }
        Command::Show { post_id, output } => {
            commands::show(&service, post_id, output.as_deref()).await?
        }
        Command::Posts { author } => commands::posts_by_author(&service, &author).await?,
        Command::Delete { post_id } => commands::delete(&service, post_id).await?,
        Command::Whoami => commands::whoami(&service).await?,
        Command::Profile { action } => match action {
            ProfileAction::Show { user } => {
                commands::show_profile(&service, user.as_deref()).await?
            }
            ProfileAction::Set { name } => commands::set_profile(&service, name).await?,
        },
    };

    client.close().await;
    Ok(code)
}
