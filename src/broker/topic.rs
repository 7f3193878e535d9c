//! Topic records
//!
//! A `Topic` is everything the broker knows about one key: who is
//! subscribed, the last snapshot, and the refresh job keeping it current.
//!
//! Concurrency note: records are only touched under the broker lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::broker::scheduler::RefreshJob;
use crate::client::{Client, ClientId};
use crate::source::Snapshot;

/// Normalized topic identifier: trimmed and uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TopicKey(String);

impl TopicKey {
    /// Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TopicKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
pub struct Topic {
    pub key: TopicKey,
    /// Auxiliary id from the subscribe intent that created the topic; handed
    /// to the snapshot source on every fetch.
    pub aux_id: Option<String>,
    pub subscribers: HashMap<ClientId, Client>,
    /// Latest snapshot, replaced wholesale on each successful refresh.
    pub snapshot: Option<Snapshot>,
    pub(crate) job: Option<RefreshJob>,
}

impl Topic {
    pub fn new(key: TopicKey, aux_id: Option<String>) -> Self {
        Self {
            key,
            aux_id,
            subscribers: HashMap::new(),
            snapshot: None,
            job: None,
        }
    }

    /// Returns `false` if the client was already subscribed.
    pub fn subscribe(&mut self, client: Client) -> bool {
        self.subscribers.insert(client.id.clone(), client).is_none()
    }

    pub fn unsubscribe(&mut self, id: &str) -> bool {
        self.subscribers.remove(id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn is_refreshing(&self) -> bool {
        self.job.is_some()
    }

    /// Interval of the currently armed refresh job, if any.
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.job.as_ref().map(|job| job.interval)
    }
}
