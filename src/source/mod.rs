//! The `source` module defines what the broker needs from an upstream data
//! provider, and ships one provider backed by the public NHL web API.
//!
//! The broker only ever sees `SnapshotSource`: it asks for a merged document
//! for a topic and for the `Phase` that document implies. How documents are
//! fetched, merged and classified is entirely up to the implementation.

pub mod nhl;
pub mod schedule;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::broker::topic::TopicKey;
use crate::utils::error::SourceError;

/// A merged document describing the current state of one topic.
pub type Snapshot = Value;

/// Lifecycle urgency of a topic, as classified from its latest snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The event is in progress.
    Live,
    /// The event starts within the configured lookahead window.
    Imminent,
    /// Nothing is happening soon.
    Idle,
}

#[async_trait]
pub trait SnapshotSource: Send + Sync + 'static {
    /// Produce a fresh merged snapshot for `topic`.
    ///
    /// `aux_id` is passed through untouched from the subscribe intent that
    /// created the topic.
    async fn fetch_snapshot(
        &self,
        topic: &TopicKey,
        aux_id: Option<&str>,
    ) -> Result<Snapshot, SourceError>;

    fn classify(&self, snapshot: &Snapshot) -> Phase;
}

#[cfg(test)]
mod tests;
