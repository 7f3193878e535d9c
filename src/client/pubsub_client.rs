use tokio::sync::mpsc::UnboundedSender;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::utils::error::SendError;

pub type ClientId = String;

/// A connected subscriber.
///
/// Cloning is cheap and every clone feeds the same outbound queue, so the
/// broker can hand copies to the fanout without holding on to the original.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for the client, e.g. `client-<uuid>`.
    pub id: ClientId,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
        }
    }

    /// Whether the transport side of this connection is still draining frames.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    pub fn send(&self, msg: WsMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .map_err(|_| SendError::Closed(self.id.clone()))
    }
}
