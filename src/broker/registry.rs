//! Topic registry
//!
//! The single keyed store of topic records. The registry itself enforces
//! nothing about subscribers; the broker removes a record as soon as its last
//! subscriber leaves, so a present key always has at least one subscriber.

use std::collections::HashMap;

use crate::broker::topic::{Topic, TopicKey};

#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: HashMap<TopicKey, Topic>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `key`, creating an empty one if needed. `aux_id`
    /// is only recorded on creation.
    pub fn ensure_topic(&mut self, key: &TopicKey, aux_id: Option<&str>) -> &mut Topic {
        self.topics
            .entry(key.clone())
            .or_insert_with(|| Topic::new(key.clone(), aux_id.map(str::to_string)))
    }

    /// Drops the record and its cached snapshot if nobody is subscribed.
    ///
    /// Callers stop the refresh job first.
    pub fn remove_if_empty(&mut self, key: &TopicKey) -> bool {
        match self.topics.get(key) {
            Some(topic) if topic.is_empty() => {
                debug_assert!(
                    !topic.is_refreshing(),
                    "topic {key} removed with a live refresh job"
                );
                self.topics.remove(key);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Topic> {
        self.topics.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Topic> {
        self.topics.get_mut(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.topics.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &TopicKey> {
        self.topics.keys()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}
