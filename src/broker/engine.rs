//! Broker engine
//!
//! The subscription manager. It owns the topic registry together with the
//! client and subscription tables, and it is the only place that decides when
//! a topic comes into existence, when its refresh job starts and when both go
//! away again.
//!
//! Concurrency and usage notes:
//! - `Broker` is a cheap cloneable handle; the transport keeps one per
//!   connection task and refresh jobs keep a weak one.
//! - All state sits behind one mutex that is never held across an `.await`.
//!   Every operation here is a short, synchronous critical section; the only
//!   slow call (the snapshot fetch) happens outside it.
//! - A client holds at most one subscription. Subscribing elsewhere drops the
//!   previous one first.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::broker::fanout;
use crate::broker::registry::TopicRegistry;
use crate::broker::scheduler::{RefreshPolicy, RefreshScheduler};
use crate::broker::topic::TopicKey;
use crate::client::{Client, ClientId};
use crate::source::{Snapshot, SnapshotSource};

#[derive(Debug, Default)]
pub(crate) struct BrokerState {
    pub(crate) registry: TopicRegistry,
    pub(crate) clients: HashMap<ClientId, Client>,
    pub(crate) subscriptions: HashMap<ClientId, TopicKey>,
}

pub(crate) struct Shared {
    pub(crate) state: Mutex<BrokerState>,
    pub(crate) scheduler: RefreshScheduler,
}

#[derive(Clone)]
pub struct Broker {
    pub(crate) shared: Arc<Shared>,
}

impl Broker {
    pub fn new(source: Arc<dyn SnapshotSource>, policy: RefreshPolicy) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(BrokerState::default()),
                scheduler: RefreshScheduler::new(source, policy),
            }),
        }
    }

    pub fn register_client(&self, client: Client) {
        debug!(client = %client.id, "client registered");
        self.shared
            .state
            .lock()
            .clients
            .insert(client.id.clone(), client);
    }

    /// Subscribes `client_id` to `topic`, replacing any other subscription it
    /// holds.
    ///
    /// A cached snapshot is pushed to this client straight away. The first
    /// subscriber of a topic starts its refresh job. Returns `false` if the
    /// client is not registered.
    pub fn subscribe(&self, client_id: &str, topic: TopicKey, aux_id: Option<String>) -> bool {
        let mut guard = self.shared.state.lock();
        let state = &mut *guard;

        let Some(client) = state.clients.get(client_id).cloned() else {
            warn!(client = client_id, %topic, "subscribe from unregistered client ignored");
            return false;
        };

        if state
            .subscriptions
            .get(client_id)
            .is_some_and(|current| *current != topic)
        {
            self.unsubscribe_locked(state, client_id);
        }

        let entry = state.registry.ensure_topic(&topic, aux_id.as_deref());
        let added = entry.subscribe(client.clone());
        state
            .subscriptions
            .insert(client_id.to_string(), topic.clone());

        if fanout::send_cached(&client, entry) {
            debug!(client = client_id, %topic, "sent cached snapshot");
        }

        if added && entry.subscriber_count() == 1 {
            self.shared.scheduler.start(&self.shared, entry);
        }

        info!(
            client = client_id,
            %topic,
            subscribers = entry.subscriber_count(),
            "client subscribed"
        );
        true
    }

    /// Drops the client's subscription, if any, and returns the topic it left.
    pub fn unsubscribe(&self, client_id: &str) -> Option<TopicKey> {
        let mut state = self.shared.state.lock();
        self.unsubscribe_locked(&mut state, client_id)
    }

    /// Forgets a disconnected client entirely.
    pub fn cleanup_client(&self, client_id: &str) {
        let mut state = self.shared.state.lock();
        self.unsubscribe_locked(&mut state, client_id);
        state.clients.remove(client_id);
        debug!(client = client_id, "cleaned up client");
    }

    fn unsubscribe_locked(&self, state: &mut BrokerState, client_id: &str) -> Option<TopicKey> {
        let key = state.subscriptions.remove(client_id)?;

        if let Some(topic) = state.registry.get_mut(key.as_str()) {
            topic.unsubscribe(client_id);
            let remaining = topic.subscriber_count();
            info!(client = client_id, topic = %key, subscribers = remaining, "client unsubscribed");

            if remaining == 0 {
                self.shared.scheduler.stop(topic);
                state.registry.remove_if_empty(&key);
            }
        }

        Some(key)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        *self.shared.scheduler.policy()
    }

    pub fn client_count(&self) -> usize {
        self.shared.state.lock().clients.len()
    }

    pub fn topic_count(&self) -> usize {
        self.shared.state.lock().registry.len()
    }

    pub fn topics(&self) -> Vec<TopicKey> {
        self.shared.state.lock().registry.keys().cloned().collect()
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.shared.state.lock().registry.contains(topic)
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.shared
            .state
            .lock()
            .registry
            .get(topic)
            .map_or(0, |t| t.subscriber_count())
    }

    pub fn subscription_of(&self, client_id: &str) -> Option<TopicKey> {
        self.shared.state.lock().subscriptions.get(client_id).cloned()
    }

    pub fn cached_snapshot(&self, topic: &str) -> Option<Snapshot> {
        self.shared
            .state
            .lock()
            .registry
            .get(topic)
            .and_then(|t| t.snapshot.clone())
    }

    pub fn refresh_interval(&self, topic: &str) -> Option<Duration> {
        self.shared
            .state
            .lock()
            .registry
            .get(topic)
            .and_then(|t| t.refresh_interval())
    }
}
