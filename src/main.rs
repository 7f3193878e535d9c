//! CLI for livecast
//!
//! Subcommands:
//! - `server`: run the WebSocket hub
//! - `watch`: subscribe to a topic and print every push (useful for smoke tests)

use std::sync::Arc;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio_tungstenite::connect_async;
use tracing::{error, info};
use tungstenite::protocol::Message as WsMessage;

use livecast::broker::{Broker, RefreshPolicy};
use livecast::config::{Settings, load_config};
use livecast::source::nhl::NhlSource;
use livecast::transport::websocket::start_websocket_server;
use livecast::utils::logging;

#[derive(Parser)]
#[command(name = "livecast")]
enum Command {
    /// Start the WebSocket hub
    Server,
    /// Subscribe to a topic and print pushed snapshots
    Watch {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:3000")]
        url: String,
        /// Topic to subscribe to, e.g. a team abbreviation
        #[arg(long)]
        topic: String,
        /// Auxiliary id forwarded to the source
        #[arg(long)]
        aux_id: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            let settings = match load_config() {
                Ok(settings) => settings,
                Err(e) => {
                    logging::init("info");
                    error!("Failed to load configuration: {e}");
                    std::process::exit(1);
                }
            };
            logging::init(&settings.log.level);

            if let Err(e) = run_server(settings).await {
                error!("Server failed: {e}");
                std::process::exit(1);
            }
        }
        Command::Watch { url, topic, aux_id } => {
            logging::init("info");
            if let Err(e) = run_watch(&url, &topic, aux_id).await {
                error!("Watch failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

async fn run_server(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let source = NhlSource::new(&settings.source)?;
    let policy = RefreshPolicy::from(&settings.refresh);
    info!(
        live_secs = policy.live.as_secs(),
        imminent_secs = policy.imminent.as_secs(),
        idle_secs = policy.idle.as_secs(),
        "refresh policy"
    );
    let broker = Broker::new(Arc::new(source), policy);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    tokio::select! {
        res = start_websocket_server(&addr, broker) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_watch(
    url: &str,
    topic: &str,
    aux_id: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut ws_stream, _response) = connect_async(url).await?;
    info!(url, topic, "connected");

    let subscribe = json!({ "type": "subscribe", "topic": topic, "aux_id": aux_id });
    ws_stream
        .send(WsMessage::text(subscribe.to_string()))
        .await?;

    while let Some(frame) = ws_stream.next().await {
        match frame? {
            WsMessage::Text(text) => {
                let push: serde_json::Value = serde_json::from_str(text.as_str())?;
                info!(
                    topic = push["topic"].as_str().unwrap_or_default(),
                    game_state = push["data"]["gameState"].as_str().unwrap_or("NONE"),
                    "snapshot received"
                );
                println!("{push}");
            }
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    info!("connection closed");
    Ok(())
}
