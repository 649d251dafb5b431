use std::collections::HashMap;
use std::time::Duration;

use super::InMemoryCacheProvider;

/// Default time-to-live for cached payloads
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Default time-to-idle for cached payloads
pub const DEFAULT_TTI: Duration = Duration::from_secs(3600);

/// Per-region expiration overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub name: String,
    pub ttl: Option<Duration>,
    pub tti: Option<Duration>,
}

impl CacheConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl: None,
            tti: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_tti(mut self, tti: Duration) -> Self {
        self.tti = Some(tti);
        self
    }
}

/// Builder for [`InMemoryCacheProvider`]
#[derive(Debug, Clone)]
pub struct CacheProviderBuilder {
    default_ttl: Duration,
    default_tti: Duration,
    regions: HashMap<String, CacheConfig>,
}

impl CacheProviderBuilder {
    pub fn new() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            default_tti: DEFAULT_TTI,
            regions: HashMap::new(),
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_default_tti(mut self, tti: Duration) -> Self {
        self.default_tti = tti;
        self
    }

    pub fn with_cache(mut self, config: CacheConfig) -> Self {
        self.regions.insert(config.name.clone(), config);
        self
    }

    pub fn build(self) -> InMemoryCacheProvider {
        InMemoryCacheProvider::with_settings(self.default_ttl, self.default_tti, self.regions)
    }
}

impl Default for CacheProviderBuilder {
    fn default() -> Self {
        Self::new()
    }
}
