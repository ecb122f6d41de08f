//! Bounded TTL cache for resolved query results
//!
//! Entries expire lazily on read. Insertion order is tracked separately from
//! the entries so the oldest-inserted entry can be evicted when a new key
//! arrives at capacity. Setting an existing key refreshes it to the newest
//! position instead of adding a duplicate.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use bns_core::Network;
use tokio::time::Instant;

/// Cache key derived from (network, logical path, parameters)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryFingerprint(String);

impl QueryFingerprint {
    /// Parameters are sorted by name so their order never changes the key
    pub fn new(network: Network, path: &str, params: &[(&str, String)]) -> Self {
        let mut params: Vec<_> = params.iter().collect();
        params.sort_by(|a, b| a.0.cmp(b.0));
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        Self(format!("{}|{}|{}", network, path, query.join("&")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    seq: u64,
}

/// Size-bounded cache with a fixed per-instance TTL
pub struct ResultCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// insertion sequence -> key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
    max_size: usize,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            max_size,
            ttl,
        }
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(entry) => Instant::now() > entry.expires_at,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn set(&mut self, key: impl Into<String>, value: V) {
        if self.max_size == 0 {
            return;
        }
        let key = key.into();

        if let Some(old) = self.entries.get(&key) {
            self.order.remove(&old.seq);
        } else if self.entries.len() >= self.max_size {
            self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.insert(seq, key.clone());
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
                seq,
            },
        );
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn remove(&mut self, key: &str) {
        if let Some(entry) = self.entries.remove(key) {
            self.order.remove(&entry.seq);
        }
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.order.pop_first() {
            self.entries.remove(&key);
        }
    }
}
