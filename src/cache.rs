use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;

/// Colon-delimited key namespaces shared with the other gateway instances.
pub mod keys {
    pub fn token(credential_hash: &str) -> String {
        format!("gateway:token:{credential_hash}")
    }

    pub fn user(username: &str) -> String {
        format!("gateway:user:{username}")
    }

    pub fn permissions(partition: &str) -> String {
        format!("gateway:permissions:{partition}")
    }
}

struct Entry<V> {
    value: V,
    deadline: Option<Instant>,
}

impl<V> Entry<V> {
    fn expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}

/// Concurrent TTL map. Expired entries are dropped lazily on access; callers
/// must tolerate concurrent writers (the backing store is shared between
/// in-flight requests).
pub struct TtlCache<V> {
    entries: DashMap<String, Entry<V>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        self.entries.insert(
            key.into(),
            Entry {
                value,
                deadline: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
    }

    /// Writes only when the key is absent (or expired). Returns whether the
    /// write happened. Concurrent fillers race; the first one wins.
    pub fn insert_if_absent(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) -> bool {
        let key = key.into();
        let mut inserted = false;
        let entry = self.entries.entry(key);
        match entry {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().expired() {
                    occupied.insert(Entry {
                        value,
                        deadline: ttl.map(|ttl| Instant::now() + ttl),
                    });
                    inserted = true;
                }
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry {
                    value,
                    deadline: ttl.map(|ttl| Instant::now() + ttl),
                });
                inserted = true;
            }
        }
        inserted
    }

    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(entry) = self.entries.get(key) {
            if !entry.expired() {
                return Some(entry.value.clone());
            }
        }
        // Drop the read guard before removing the stale entry.
        self.entries.remove_if(key, |_, entry| entry.expired());
        None
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Resets the TTL of a live entry. No-op when the key is absent or
    /// already expired.
    pub fn extend(&self, key: &str, ttl: Duration) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) if !entry.expired() => {
                entry.deadline = Some(Instant::now() + ttl);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_expire() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.insert("a", 1, Some(Duration::from_millis(10)));
        assert_eq!(cache.get("a"), Some(1));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn insert_if_absent_keeps_first_writer() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert!(cache.insert_if_absent("k", 1, None));
        assert!(!cache.insert_if_absent("k", 2, None));
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn insert_if_absent_replaces_expired() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.insert("k", 1, Some(Duration::from_millis(5)));
        std::thread::sleep(Duration::from_millis(10));
        assert!(cache.insert_if_absent("k", 2, None));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn extend_resets_deadline() {
        let cache: TtlCache<u32> = TtlCache::new();
        cache.insert("k", 1, Some(Duration::from_millis(30)));
        assert!(cache.extend("k", Duration::from_millis(500)));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("k"), Some(1));
        assert!(!cache.extend("missing", Duration::from_millis(10)));
    }

    #[test]
    fn namespaced_keys() {
        assert_eq!(keys::token("abc"), "gateway:token:abc");
        assert_eq!(keys::user("ada"), "gateway:user:ada");
        assert_eq!(keys::permissions("whitelist"), "gateway:permissions:whitelist");
    }
}
