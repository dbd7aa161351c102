//! Small TTL cache for per-tenant listings.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

struct State<K, V> {
    entries: HashMap<K, Entry<V>>,
    /// Bumped on every invalidation of the key.
    generations: HashMap<K, u64>,
}

/// Values expire `ttl` after they were stored. A zero TTL disables caching.
///
/// A value computed while the key was invalidated is stale. Callers read
/// [`TtlCache::generation`] before computing and hand it back to
/// [`TtlCache::insert_unless_invalidated`], which drops the value if an
/// invalidation happened in between.
pub struct TtlCache<K, V> {
    ttl: Duration,
    state: RwLock<State<K, V>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: RwLock::new(State {
                entries: HashMap::new(),
                generations: HashMap::new(),
            }),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let state = self.state.read().await;
        state
            .entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    pub async fn generation(&self, key: &K) -> u64 {
        self.state.read().await.generations.get(key).copied().unwrap_or(0)
    }

    /// Store `value` unless `key` was invalidated after `generation` was read.
    /// Returns whether the value was stored.
    pub async fn insert_unless_invalidated(&self, key: K, value: V, generation: u64) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let mut state = self.state.write().await;
        if state.generations.get(&key).copied().unwrap_or(0) != generation {
            return false;
        }

        let ttl = self.ttl;
        state.entries.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        state.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
        true
    }

    pub async fn invalidate(&self, key: &K) {
        let mut state = self.state.write().await;
        state.entries.remove(key);
        *state.generations.entry(key.clone()).or_insert(0) += 1;
    }
}
