//! In-memory cache provider

use async_trait::async_trait;
use dashmap::DashMap;
use nimbus_core::Properties;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{AsyncCache, CacheConfig, CacheProvider, SyncCache, DEFAULT_TTI, DEFAULT_TTL};

/// Cached payload with its timestamps
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: Properties,

    /// When the entry was written
    pub created_at: Instant,

    /// When the entry was last read or written
    pub last_accessed: Instant,
}

impl CacheEntry {
    pub fn new(value: Properties) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            last_accessed: now,
        }
    }

    /// Check if the entry is still valid
    pub fn is_valid(&self, ttl: Duration, tti: Duration) -> bool {
        let now = Instant::now();
        now.duration_since(self.created_at) < ttl && now.duration_since(self.last_accessed) < tti
    }

    /// Remaining time before the TTL elapses
    pub fn remaining_ttl(&self, ttl: Duration) -> Option<Duration> {
        ttl.checked_sub(self.created_at.elapsed())
    }
}

/// One named cache region
pub struct MemoryCache {
    name: String,
    ttl: Duration,
    tti: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new(name: impl Into<String>, ttl: Duration, tti: Duration) -> Self {
        Self {
            name: name.into(),
            ttl,
            tti,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn tti(&self) -> Duration {
        self.tti
    }

    fn lookup(&self, key: &str) -> Option<Properties> {
        let mut entry = self.entries.get_mut(key)?;
        if !entry.is_valid(self.ttl, self.tti) {
            drop(entry);
            self.entries.remove(key);
            debug!(region = %self.name, key, "Dropped expired cache entry");
            return None;
        }
        entry.last_accessed = Instant::now();
        Some(entry.value.clone())
    }

    fn insert(&self, key: &str, value: Properties) {
        self.entries.insert(key.to_string(), CacheEntry::new(value));
    }

    fn evict(&self, key: &str) -> Option<Properties> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Remove expired entries, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.is_valid(self.ttl, self.tti));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl SyncCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    fn get(&self, key: &str) -> Option<Properties> {
        self.lookup(key)
    }

    fn put(&self, key: &str, value: Properties) {
        self.insert(key, value)
    }

    fn remove(&self, key: &str) -> Option<Properties> {
        self.evict(key)
    }
}

#[async_trait]
impl AsyncCache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Option<Properties> {
        self.lookup(key)
    }

    async fn put(&self, key: &str, value: Properties) {
        self.insert(key, value)
    }

    async fn remove(&self, key: &str) -> Option<Properties> {
        self.evict(key)
    }
}

/// Provider of lazily created [`MemoryCache`] regions, usable in both modes
pub struct InMemoryCacheProvider {
    default_ttl: Duration,
    default_tti: Duration,
    configs: HashMap<String, CacheConfig>,
    regions: DashMap<String, Arc<MemoryCache>>,
}

impl InMemoryCacheProvider {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TTL, DEFAULT_TTI, HashMap::new())
    }

    pub(crate) fn with_settings(
        default_ttl: Duration,
        default_tti: Duration,
        configs: HashMap<String, CacheConfig>,
    ) -> Self {
        Self {
            default_ttl,
            default_tti,
            configs,
            regions: DashMap::new(),
        }
    }

    /// Region by name, created on first use
    pub fn region(&self, name: &str) -> Arc<MemoryCache> {
        self.regions
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = self.configs.get(name);
                let ttl = config.and_then(|c| c.ttl).unwrap_or(self.default_ttl);
                let tti = config.and_then(|c| c.tti).unwrap_or(self.default_tti);
                debug!(region = name, ?ttl, ?tti, "Created cache region");
                Arc::new(MemoryCache::new(name, ttl, tti))
            })
            .clone()
    }

    /// Reap expired entries across all regions
    pub fn purge_expired(&self) -> usize {
        self.regions
            .iter()
            .map(|region| region.value().purge_expired())
            .sum()
    }

    pub fn region_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.regions.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for InMemoryCacheProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheProvider for InMemoryCacheProvider {
    fn is_sync_supported(&self) -> bool {
        true
    }

    fn is_async_supported(&self) -> bool {
        true
    }

    fn sync_cache(&self, name: &str) -> Option<Arc<dyn SyncCache>> {
        Some(self.region(name))
    }

    fn async_cache(&self, name: &str) -> Option<Arc<dyn AsyncCache>> {
        Some(self.region(name))
    }
}
