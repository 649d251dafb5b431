//! Identity map
//!
//! Keeps one [`ResourceData`] per resource key so every handle to the same
//! remote entity observes the same record. Entries expire after a sliding
//! idle window unless stored indefinitely.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::resource::{ResourceData, ResourceKey};

/// Default sliding expiration for identity map entries
pub const DEFAULT_SLIDING_EXPIRATION: Duration = Duration::from_secs(600);

struct IdentityEntry {
    data: Arc<ResourceData>,
    last_access: Instant,
    indefinite: bool,
}

impl IdentityEntry {
    fn new(data: Arc<ResourceData>, now: Instant, indefinite: bool) -> Self {
        Self {
            data,
            last_access: now,
            indefinite,
        }
    }

    fn is_expired(&self, now: Instant, sliding: Duration) -> bool {
        !self.indefinite && now.duration_since(self.last_access) >= sliding
    }
}

/// Key to shared-record table
pub struct IdentityMap {
    entries: DashMap<ResourceKey, IdentityEntry>,
    sliding_expiration: Duration,
    lifetime_items_added: AtomicU64,
}

impl IdentityMap {
    pub fn new(sliding_expiration: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            sliding_expiration,
            lifetime_items_added: AtomicU64::new(0),
        }
    }

    /// Return the record for `key`, constructing it with `factory` if absent.
    ///
    /// The factory runs at most once per key while the entry is live, under
    /// the key's shard lock. It must not call back into the identity map.
    pub fn get_or_add<F>(&self, key: &ResourceKey, factory: F, store_indefinitely: bool) -> Arc<ResourceData>
    where
        F: FnOnce() -> ResourceData,
    {
        let now = Instant::now();
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.is_expired(now, self.sliding_expiration) {
                    let data = Arc::new(factory());
                    *entry = IdentityEntry::new(data.clone(), now, store_indefinitely);
                    self.lifetime_items_added.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Replaced expired identity map entry");
                    data
                } else {
                    entry.last_access = now;
                    entry.indefinite |= store_indefinitely;
                    trace!(key = %key, "Retrieved item from identity map");
                    entry.data.clone()
                }
            }
            Entry::Vacant(vacant) => {
                let data = Arc::new(factory());
                vacant.insert(IdentityEntry::new(data.clone(), now, store_indefinitely));
                let total = self.lifetime_items_added.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(key = %key, lifetime_items_added = total, "Added item to identity map");
                data
            }
        }
    }

    /// Live record for `key`, refreshing its access time
    pub fn get(&self, key: &ResourceKey) -> Option<Arc<ResourceData>> {
        let now = Instant::now();
        let mut entry = self.entries.get_mut(key)?;
        if entry.is_expired(now, self.sliding_expiration) {
            return None;
        }
        entry.last_access = now;
        trace!(key = %key, "Retrieved item from identity map");
        Some(entry.data.clone())
    }

    /// Live record for `key`, without refreshing its access time
    pub fn peek(&self, key: &ResourceKey) -> Option<Arc<ResourceData>> {
        let entry = self.entries.get(key)?;
        if entry.is_expired(Instant::now(), self.sliding_expiration) {
            return None;
        }
        Some(entry.data.clone())
    }

    pub fn remove(&self, key: &ResourceKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.is_expired(now, self.sliding_expiration));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Purged expired identity map entries");
        }
        removed
    }

    /// Number of records ever added, including replacements
    pub fn lifetime_items_added(&self) -> u64 {
        self.lifetime_items_added.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sliding_expiration(&self) -> Duration {
        self.sliding_expiration
    }

    /// Release every entry
    pub fn dispose(&self) {
        self.entries.clear();
        debug!("Identity map disposed");
    }
}

impl Default for IdentityMap {
    fn default() -> Self {
        Self::new(DEFAULT_SLIDING_EXPIRATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    fn key(href: &str) -> ResourceKey {
        ResourceKey::for_href("Account", href)
    }

    #[test]
    fn test_same_key_returns_same_record() {
        let map = IdentityMap::default();
        let a = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        let b = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(map.lifetime_items_added(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_different_keys_get_different_records() {
        let map = IdentityMap::default();
        let a = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        let b = map.get_or_add(&key("/accounts/2"), ResourceData::detached, false);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(map.lifetime_items_added(), 2);
    }

    #[test]
    fn test_concurrent_first_access_constructs_once() {
        let map = Arc::new(IdentityMap::default());
        let constructed = Arc::new(AtomicUsize::new(0));
        let k = key("/accounts/shared");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let map = map.clone();
                let constructed = constructed.clone();
                let k = k.clone();
                thread::spawn(move || {
                    map.get_or_add(
                        &k,
                        || {
                            constructed.fetch_add(1, Ordering::SeqCst);
                            ResourceData::detached()
                        },
                        false,
                    )
                })
            })
            .collect();

        let records: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
        assert!(records.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_expired_entry_is_replaced() {
        let map = IdentityMap::new(Duration::from_millis(0));
        let a = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        let b = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(map.lifetime_items_added(), 2);
    }

    #[test]
    fn test_get_returns_live_record_only() {
        let map = IdentityMap::default();
        assert!(map.get(&key("/accounts/1")).is_none());

        let a = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        let b = map.get(&key("/accounts/1")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(map.lifetime_items_added(), 1);

        let expiring = IdentityMap::new(Duration::from_millis(0));
        expiring.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        assert!(expiring.get(&key("/accounts/1")).is_none());
    }

    #[test]
    fn test_store_indefinitely_ignores_expiration() {
        let map = IdentityMap::new(Duration::from_millis(0));
        let a = map.get_or_add(&key("/customData/1"), ResourceData::detached, true);
        let b = map.get_or_add(&key("/customData/1"), ResourceData::detached, false);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(map.purge_expired(), 0);
    }

    #[test]
    fn test_purge_expired() {
        let map = IdentityMap::new(Duration::from_millis(0));
        map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        map.get_or_add(&key("/accounts/2"), ResourceData::detached, true);
        assert_eq!(map.purge_expired(), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_dispose_clears_entries() {
        let map = IdentityMap::default();
        let a = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        map.dispose();
        assert!(map.is_empty());

        let b = map.get_or_add(&key("/accounts/1"), ResourceData::detached, false);
        assert!(!Arc::ptr_eq(&a, &b));
    }
}
