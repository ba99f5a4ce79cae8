//! Keyed cache with lazy expiry. Entries are only checked when read, plus an
//! occasional [`TtlCache::purge_expired`] sweep from the telemetry poller.
use std::{
    collections::HashMap,
    hash::Hash,
    time::{Duration, Instant},
};

pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, (Instant, V)>,
}

impl<K: Eq + Hash, V> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|(inserted, _)| inserted.elapsed() >= self.ttl);

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|(_, value)| value)
    }

    pub fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;

        self.entries
            .retain(|_, (inserted, _)| inserted.elapsed() < ttl);

        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
