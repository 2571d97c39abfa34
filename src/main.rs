//! CLI for comment-relay
//!
//! Subcommands:
//! - `serve`: run the HTTP server
//! - `seed`: register topics and user display names in the local store
//! - `token`: mint a bearer token for a user id
//! - `watch`: follow a topic's event stream and print each event

use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use tokio::sync::watch;
use tracing::{error, info};

use comment_relay::broker::SubscriberRegistry;
use comment_relay::config::{Settings, load_config};
use comment_relay::persistence::SledStore;
use comment_relay::publish::CommentService;
use comment_relay::transport::wire::FrameDecoder;
use comment_relay::transport::{AppState, auth, start_http_server};
use comment_relay::utils::logging;

#[derive(Parser)]
#[command(name = "comment-relay", about = "Real-time comment broadcast server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP server
    Serve,
    /// Register topics and users in the configured store
    Seed {
        /// Topic id to register (repeatable)
        #[arg(long = "topic")]
        topics: Vec<String>,
        /// User as `<id>=<display name>` (repeatable)
        #[arg(long = "user", value_parser = parse_user)]
        users: Vec<(String, String)>,
    },
    /// Print a signed token for a user id
    Token {
        user_id: String,
        #[arg(long, default_value_t = 24)]
        hours: i64,
    },
    /// Follow a topic's event stream
    Watch {
        /// Stream URL, e.g. http://127.0.0.1:8080/topics/post-1/events
        url: String,
        #[arg(long)]
        token: String,
    },
}

fn parse_user(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(id, _)| !id.is_empty())
        .map(|(id, name)| (id.to_string(), name.to_string()))
        .ok_or_else(|| format!("expected <id>=<name>, got {raw:?}"))
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log.level);

    let outcome = match cli.command {
        Command::Serve => run_server(config).await,
        Command::Seed { topics, users } => run_seed(&config, &topics, &users),
        Command::Token { user_id, hours } => run_token(&config, &user_id, hours),
        Command::Watch { url, token } => run_watch(&url, &token).await,
    };

    if let Err(e) = outcome {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SledStore::open(&config.storage.path)?);
    let registry = SubscriberRegistry::with_capacity(config.stream.channel_capacity);
    let comments = CommentService::new(store.clone(), store, registry, &config.stream);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = AppState::new(comments, &config.server.jwt_secret, shutdown_rx.clone());
    let addr = format!("{}:{}", config.server.host, config.server.port);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received. Closing streams.");
        }
        shutdown_tx.send_replace(true);
    });

    let mut graceful = shutdown_rx;
    start_http_server(&addr, state, async move {
        let _ = graceful.wait_for(|stop| *stop).await;
    })
    .await?;

    info!("Server stopped.");
    Ok(())
}

fn run_seed(
    config: &Settings,
    topics: &[String],
    users: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let store = SledStore::open(&config.storage.path)?;
    for topic in topics {
        store.create_topic(topic)?;
        info!(topic = %topic, "topic registered");
    }
    for (id, name) in users {
        store.put_user(id, name)?;
        info!(user = %id, name = %name, "user registered");
    }
    store.flush()?;
    Ok(())
}

fn run_token(config: &Settings, user_id: &str, hours: i64) -> Result<(), Box<dyn std::error::Error>> {
    let token = auth::issue_token(
        &config.server.jwt_secret,
        user_id,
        chrono::Duration::hours(hours),
    )?;
    println!("{token}");
    Ok(())
}

async fn run_watch(url: &str, token: &str) -> Result<(), Box<dyn std::error::Error>> {
    let response = reqwest::Client::new()
        .get(url)
        .bearer_auth(token)
        .send()
        .await?
        .error_for_status()?;
    info!(url, "connected");

    let mut decoder = FrameDecoder::new();
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        for frame in decoder.push(&chunk?) {
            println!("{}: {}", frame.event.as_deref().unwrap_or("message"), frame.data);
        }
    }

    info!("stream ended");
    Ok(())
}
