use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::broker::TopicKey;

/// Frames a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe {
        #[serde(default, alias = "team")]
        topic: Option<String>,

        #[serde(default, alias = "teamId", deserialize_with = "id_string")]
        aux_id: Option<String>,
    },

    Unsubscribe,
}

impl ClientMessage {
    /// Normalized topic of a subscribe intent. `None` for a missing or blank
    /// topic and for non-subscribe messages.
    pub fn topic_key(&self) -> Option<TopicKey> {
        match self {
            ClientMessage::Subscribe { topic, .. } => topic.as_deref().and_then(TopicKey::parse),
            ClientMessage::Unsubscribe => None,
        }
    }
}

// Older clients send the team id as a number.
fn id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
