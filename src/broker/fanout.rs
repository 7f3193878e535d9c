//! Broadcast fanout
//!
//! Fire-and-forget delivery of one frame to every open subscriber of a topic.
//! Closed connections are skipped here; removing them is the broker's job once
//! the transport reports the close.

use tracing::{debug, error, trace};

use crate::broker::message::ServerMessage;
use crate::broker::topic::Topic;
use crate::client::Client;

/// Sends `message` to every open subscriber of `topic` and returns how many
/// sends succeeded. A failed send never stops delivery to the others.
pub fn broadcast(topic: &Topic, message: &ServerMessage<'_>) -> usize {
    let frame = match message.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            error!(topic = %topic.key, error = %e, "failed to serialize message");
            return 0;
        }
    };

    let mut sent = 0;
    for client in topic.subscribers.values() {
        if !client.is_open() {
            trace!(topic = %topic.key, client = %client.id, "skipping closed connection");
            continue;
        }
        match client.send(frame.clone()) {
            Ok(()) => sent += 1,
            Err(e) => debug!(topic = %topic.key, error = %e, "send failed"),
        }
    }

    if sent > 0 {
        debug!(topic = %topic.key, sent, "broadcast snapshot");
    }
    sent
}

/// Broadcasts the topic's cached snapshot, if there is one.
pub fn broadcast_snapshot(topic: &Topic) -> usize {
    match &topic.snapshot {
        Some(data) => broadcast(
            topic,
            &ServerMessage::Snapshot {
                topic: &topic.key,
                data,
            },
        ),
        None => 0,
    }
}

/// Pushes the cached snapshot to a single client. Used for the catch-up push
/// a new subscriber gets when a cache already exists.
pub fn send_cached(client: &Client, topic: &Topic) -> bool {
    let Some(data) = &topic.snapshot else {
        return false;
    };
    if !client.is_open() {
        return false;
    }

    let message = ServerMessage::Snapshot {
        topic: &topic.key,
        data,
    };
    match message.to_frame() {
        Ok(frame) => client.send(frame).is_ok(),
        Err(e) => {
            error!(topic = %topic.key, error = %e, "failed to serialize message");
            false
        }
    }
}
