//! Client configuration

use nimbus_runtime::cache::{CacheConfig, CacheProviderBuilder, DisabledCacheProvider};
use nimbus_runtime::CacheProvider;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SdkError};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL relative hrefs are resolved against
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sliding expiration of identity map entries in seconds
    #[serde(default = "default_identity_map_expiration_secs")]
    pub identity_map_expiration_secs: u64,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            identity_map_expiration_secs: default_identity_map_expiration_secs(),
            cache: CacheSettings::default(),
            log_level: default_log_level(),
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Set the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the identity map expiration
    pub fn with_identity_map_expiration_secs(mut self, secs: u64) -> Self {
        self.identity_map_expiration_secs = secs;
        self
    }

    /// Set cache configuration
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    /// Disable caching
    pub fn disable_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn identity_map_expiration(&self) -> Duration {
        Duration::from_secs(self.identity_map_expiration_secs)
    }

    /// Check the configuration for values the client cannot run with
    pub fn validate(&self) -> Result<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(SdkError::ConfigError("base_url must not be empty".to_string()));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SdkError::ConfigError(format!(
                "base_url must be an absolute http(s) URL: {}",
                base_url
            )));
        }
        nimbus_core::CanonicalUri::parse(base_url)
            .map_err(|e| SdkError::ConfigError(format!("Invalid base_url '{}': {}", base_url, e)))?;

        if self.timeout_secs == 0 {
            return Err(SdkError::ConfigError("timeout_secs must be greater than zero".to_string()));
        }
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(SdkError::ConfigError(format!(
                "Unknown log level '{}'",
                self.log_level
            )));
        }
        for region in &self.cache.regions {
            if region.name.trim().is_empty() {
                return Err(SdkError::ConfigError("cache region name must not be empty".to_string()));
            }
        }
        Ok(())
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Enable caching
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default time-to-live in seconds
    #[serde(default = "default_cache_secs")]
    pub default_ttl_secs: u64,

    /// Default time-to-idle in seconds
    #[serde(default = "default_cache_secs")]
    pub default_tti_secs: u64,

    /// Per-region overrides
    #[serde(default)]
    pub regions: Vec<CacheRegionConfig>,
}

impl CacheSettings {
    /// Add a region override
    pub fn with_region(mut self, region: CacheRegionConfig) -> Self {
        self.regions.push(region);
        self
    }

    /// Cache provider described by these settings
    pub fn to_provider(&self) -> Arc<dyn CacheProvider> {
        if !self.enabled {
            return Arc::new(DisabledCacheProvider);
        }
        let mut builder = CacheProviderBuilder::new()
            .with_default_ttl(Duration::from_secs(self.default_ttl_secs))
            .with_default_tti(Duration::from_secs(self.default_tti_secs));
        for region in &self.regions {
            builder = builder.with_cache(region.to_cache_config());
        }
        Arc::new(builder.build())
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: default_cache_secs(),
            default_tti_secs: default_cache_secs(),
            regions: Vec::new(),
        }
    }
}

/// Expiration overrides for one cache region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRegionConfig {
    /// Region name, the resource type name
    pub name: String,

    /// Time-to-live in seconds
    #[serde(default)]
    pub ttl_secs: Option<u64>,

    /// Time-to-idle in seconds
    #[serde(default)]
    pub tti_secs: Option<u64>,
}

impl CacheRegionConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ttl_secs: None,
            tti_secs: None,
        }
    }

    pub fn with_ttl_secs(mut self, secs: u64) -> Self {
        self.ttl_secs = Some(secs);
        self
    }

    pub fn with_tti_secs(mut self, secs: u64) -> Self {
        self.tti_secs = Some(secs);
        self
    }

    fn to_cache_config(&self) -> CacheConfig {
        let mut config = CacheConfig::new(self.name.clone());
        if let Some(ttl) = self.ttl_secs {
            config = config.with_ttl(Duration::from_secs(ttl));
        }
        if let Some(tti) = self.tti_secs {
            config = config.with_tti(Duration::from_secs(tti));
        }
        config
    }
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_identity_map_expiration_secs() -> u64 {
    600 // 10 minutes
}

fn default_cache_secs() -> u64 {
    3600 // 1 hour
}

fn default_log_level() -> String {
    "info".to_string()
}
