//! WebSocket transport
//!
//! Translates client frames into broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Create a `Client` for each connection and register it with the `Broker`
//! - Parse subscribe/unsubscribe intents and forward them to the broker
//! - Drain the client's outbound queue into the socket
//! - Tell the broker exactly once that the connection is gone
//!
//! Snapshots only ever flow server -> client; nothing a client sends is
//! relayed to other clients.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::client::Client;
use crate::transport::message::ClientMessage;
use crate::utils::error::ServerError;

/// Binds `addr` and serves connections until the listener fails.
pub async fn start_websocket_server(addr: &str, broker: Broker) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;

    info!("WebSocket server listening on ws://{}", listener.local_addr()?);
    serve(listener, broker).await
}

/// Accept loop over an already bound listener.
pub async fn serve(listener: TcpListener, broker: Broker) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let broker = broker.clone();
        spawn(handle_connection(stream, peer, broker));
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, broker: Broker) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    broker.register_client(client);
    info!(client = %client_id, %peer, "client connected");

    let cleanup_called = Arc::new(AtomicBool::new(false));

    let do_cleanup = {
        let broker = broker.clone();
        let client_id = client_id.clone();
        let cleanup_called = cleanup_called.clone();

        move || {
            if !cleanup_called.swap(true, Ordering::SeqCst) {
                broker.cleanup_client(&client_id);
                info!(client = %client_id, "client disconnected");
            }
        }
    };

    {
        let client_id = client_id.clone();
        let do_cleanup = do_cleanup.clone();

        // ends once the broker drops every clone of the sender, or the socket
        // stops accepting writes
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!(client = %client_id, error = %e, "failed to write frame");
                    break;
                }
            }

            do_cleanup();
            debug!(client = %client_id, "send loop closed");
        });
    }

    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => handle_text(&broker, &client_id, text.as_str()),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client = %client_id, error = %e, "read failed");
                break;
            }
        }
    }

    do_cleanup();
}

/// Applies one inbound text frame for `client_id`. Malformed frames and
/// subscribe intents without a topic are logged and dropped.
pub(crate) fn handle_text(broker: &Broker, client_id: &str, text: &str) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(client = client_id, error = %e, "invalid client message");
            return;
        }
    };

    let topic = msg.topic_key();
    match msg {
        ClientMessage::Subscribe { aux_id, .. } => {
            let Some(topic) = topic else {
                warn!(client = client_id, "subscribe without a topic ignored");
                return;
            };
            broker.subscribe(client_id, topic, aux_id);
        }
        ClientMessage::Unsubscribe => {
            if broker.unsubscribe(client_id).is_none() {
                debug!(client = client_id, "unsubscribe without a subscription");
            }
        }
    }
}
