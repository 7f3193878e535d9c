//! Outbound push messages
//!
//! Every frame the broker sends is a `type`-tagged JSON object, e.g.
//! `{"type":"snapshot","topic":"TOR","data":{...}}`.

use serde::Serialize;
use tungstenite::protocol::Message as WsMessage;

use crate::broker::topic::TopicKey;
use crate::source::Snapshot;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage<'a> {
    Snapshot {
        topic: &'a TopicKey,
        data: &'a Snapshot,
    },
}

impl ServerMessage<'_> {
    pub fn to_frame(&self) -> Result<WsMessage, serde_json::Error> {
        serde_json::to_string(self).map(WsMessage::text)
    }
}
