//! Capacity-bounded map with per-entry expiry.

use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
struct Slot<V> {
    value: V,
    expires_at: Instant,
    /// Creation sequence; lower is older.
    seq: u64,
}

/// A map holding at most `capacity` entries, each with its own time-to-live.
///
/// - Inserting a new key into a full cache evicts the oldest-created entry.
/// - Expired entries are dropped lazily on read, or in bulk by
///   [`purge_expired`](Self::purge_expired).
/// - Overwriting a key counts as a fresh creation.
///
/// Time comes from `tokio::time`, so paused-clock tests control expiry.
#[derive(Debug)]
pub struct BoundedTtlCache<K, V> {
    capacity: usize,
    default_ttl: Duration,
    slots: HashMap<K, Slot<V>>,
    by_age: BTreeMap<u64, K>,
    next_seq: u64,
}

impl<K, V> BoundedTtlCache<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create a cache; a zero `capacity` is raised to 1.
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            default_ttl,
            slots: HashMap::new(),
            by_age: BTreeMap::new(),
            next_seq: 0,
        }
    }

    /// Insert with the default TTL.
    pub fn insert(&mut self, key: K, value: V) {
        let ttl = self.default_ttl;
        self.insert_with_ttl(key, value, ttl);
    }

    /// Insert with an explicit TTL, evicting the oldest entry when full.
    pub fn insert_with_ttl(&mut self, key: K, value: V, ttl: Duration) {
        if let Some(old) = self.slots.remove(&key) {
            self.by_age.remove(&old.seq);
        } else if self.slots.len() >= self.capacity {
            self.evict_oldest();
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_age.insert(seq, key.clone());
        self.slots.insert(
            key,
            Slot {
                value,
                expires_at: Instant::now() + ttl,
                seq,
            },
        );
    }

    /// Get a live value, dropping it if it has expired.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let expired = self.slots.get(key)?.expires_at <= Instant::now();
        if expired {
            self.remove(key);
            return None;
        }
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Whether a live value exists for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.slots
            .get(key)
            .is_some_and(|slot| slot.expires_at > Instant::now())
    }

    /// Remove `key`, returning its value even if expired.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slot = self.slots.remove(key)?;
        self.by_age.remove(&slot.seq);
        Some(slot.value)
    }

    /// Drop every expired entry; returns how many were dropped.
    pub fn purge_expired(&mut self) -> usize {
        let now = Instant::now();
        let expired: Vec<K> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_age.clear();
    }

    fn evict_oldest(&mut self) {
        if let Some((_, key)) = self.by_age.pop_first() {
            self.slots.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_evicts_oldest_created_when_full() {
        let mut cache = BoundedTtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Reading does not refresh age.
        assert_eq!(cache.get("a"), Some(&1));
        cache.insert("c", 3);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key("a"));
        assert!(cache.contains_key("b"));
        assert!(cache.contains_key("c"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overwrite_does_not_evict() {
        let mut cache = BoundedTtlCache::new(2, Duration::from_secs(60));
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        assert_eq!(cache.len(), 2);
        // "a" is now the newest, so "b" goes first.
        cache.insert("c", 3);
        assert!(!cache.contains_key("b"));
        assert_eq!(cache.get("a"), Some(&10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry_on_read() {
        let mut cache = BoundedTtlCache::new(10, Duration::from_secs(5));
        cache.insert("short", 1);
        cache.insert_with_ttl("long", 2, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let mut cache = BoundedTtlCache::new(10, Duration::from_secs(1));
        cache.insert(1u32, "x");
        cache.insert(2u32, "y");
        cache.insert_with_ttl(3u32, "z", Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.purge_expired(), 0);
    }

    #[test]
    fn test_zero_capacity_raised() {
        let cache: BoundedTtlCache<u8, u8> = BoundedTtlCache::new(0, Duration::from_secs(1));
        assert_eq!(cache.capacity(), 1);
    }
}
