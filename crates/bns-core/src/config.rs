//! SDK configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_CACHE_SIZE, DEFAULT_CACHE_TTL_SECS, DEFAULT_PAGE_SIZE,
    DEFAULT_POOL_SIZE, DEFAULT_TIMEOUT_MS, MAINNET_NODE_URL, TESTNET_NODE_URL,
};
use crate::{Error, Network, Result};

/// Configuration for an SDK context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Indexing API base URL (testnet queries add `/testnet`)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Mainnet node for contract read-only calls
    #[serde(default = "default_mainnet_url")]
    pub mainnet_url: String,
    /// Testnet node for contract read-only calls
    #[serde(default = "default_testnet_url")]
    pub testnet_url: String,
    /// Mainnet node tried when the primary fails
    #[serde(default)]
    pub mainnet_fallback_url: Option<String>,
    /// Testnet node tried when the primary fails
    #[serde(default)]
    pub testnet_fallback_url: Option<String>,
    /// Skip the indexing API and always read from contracts
    #[serde(default)]
    pub disable_api: bool,
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_size")]
    pub cache_max_size: usize,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Pre-built endpoint handles per network
    #[serde(default = "default_pool_size")]
    pub network_pool_size: usize,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    /// Page size for owned-name listing
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_mainnet_url() -> String {
    MAINNET_NODE_URL.to_string()
}

fn default_testnet_url() -> String {
    TESTNET_NODE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_pool_size() -> usize {
    DEFAULT_POOL_SIZE
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl SdkConfig {
    /// Point both networks' primary nodes and the indexing API at the given URLs
    pub fn with_urls(mut self, api_url: impl Into<String>, node_url: impl Into<String>) -> Self {
        let node_url = node_url.into();
        self.api_url = api_url.into();
        self.mainnet_url = node_url.clone();
        self.testnet_url = node_url;
        self
    }

    pub fn with_fallback(mut self, network: Network, url: impl Into<String>) -> Self {
        match network {
            Network::Mainnet => self.mainnet_fallback_url = Some(url.into()),
            Network::Testnet => self.testnet_fallback_url = Some(url.into()),
        }
        self
    }

    pub fn with_cache(mut self, max_size: usize, ttl: Duration) -> Self {
        self.cache_max_size = max_size;
        self.cache_ttl_secs = ttl.as_secs();
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn primary_url(&self, network: Network) -> &str {
        match network {
            Network::Mainnet => &self.mainnet_url,
            Network::Testnet => &self.testnet_url,
        }
    }

    /// Fallback for a network; ignored when it equals the primary
    pub fn fallback_url(&self, network: Network) -> Option<&str> {
        let fallback = match network {
            Network::Mainnet => self.mainnet_fallback_url.as_deref(),
            Network::Testnet => self.testnet_fallback_url.as_deref(),
        };
        fallback.filter(|url| !url.is_empty() && trim(url) != trim(self.primary_url(network)))
    }

    /// Whether `other` would build an identical result cache
    pub fn same_cache_settings(&self, other: &SdkConfig) -> bool {
        self.cache_enabled == other.cache_enabled
            && self.cache_max_size == other.cache_max_size
            && self.cache_ttl_secs == other.cache_ttl_secs
    }

    /// Apply a partial update; applying the same update twice is a no-op
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(size) = update.cache_max_size {
            self.cache_max_size = size;
        }
        if let Some(ttl) = update.cache_ttl_secs {
            self.cache_ttl_secs = ttl;
        }
        if let Some(disable) = update.disable_cache {
            self.cache_enabled = !disable;
        }
        if let Some(pool) = update.network_pool_size {
            self.network_pool_size = pool;
        }
        if let Some(url) = &update.mainnet_fallback_url {
            self.mainnet_fallback_url = non_empty(url);
        }
        if let Some(url) = &update.testnet_fallback_url {
            self.testnet_fallback_url = non_empty(url);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (field, url) in [
            ("api_url", &self.api_url),
            ("mainnet_url", &self.mainnet_url),
            ("testnet_url", &self.testnet_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::validation(format!("{} must be an http(s) URL: {:?}", field, url)));
            }
        }
        if self.page_size == 0 {
            return Err(Error::validation("page_size must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::validation(format!("cannot read config {}: {}", path.display(), e)).with_cause(e)
        })?;
        let config: SdkConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| {
            Error::validation(format!("cannot write config {}: {}", path.display(), e)).with_cause(e)
        })?;
        Ok(())
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            mainnet_url: default_mainnet_url(),
            testnet_url: default_testnet_url(),
            mainnet_fallback_url: None,
            testnet_fallback_url: None,
            disable_api: false,
            cache_enabled: true,
            cache_max_size: DEFAULT_CACHE_SIZE,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            network_pool_size: DEFAULT_POOL_SIZE,
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn trim(url: &str) -> &str {
    url.trim_end_matches('/')
}

fn non_empty(url: &str) -> Option<String> {
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Partial reconfiguration; `None` leaves a setting untouched
///
/// An empty fallback URL clears the fallback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, alias = "cache")]
    pub cache_max_size: Option<usize>,
    #[serde(default, alias = "cacheTTL")]
    pub cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub disable_cache: Option<bool>,
    #[serde(default)]
    pub network_pool_size: Option<usize>,
    #[serde(default)]
    pub testnet_fallback_url: Option<String>,
    #[serde(default)]
    pub mainnet_fallback_url: Option<String>,
}

impl ConfigUpdate {
    /// Whether endpoint pools must be rebuilt
    pub fn touches_endpoints(&self) -> bool {
        self.network_pool_size.is_some()
            || self.testnet_fallback_url.is_some()
            || self.mainnet_fallback_url.is_some()
    }

    /// Whether the cache must be rebuilt
    pub fn touches_cache(&self) -> bool {
        self.cache_max_size.is_some() || self.cache_ttl_secs.is_some() || self.disable_cache.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SdkConfig::default();
        assert_eq!(config.api_url, "https://api.bnsv2.com");
        assert_eq!(config.primary_url(Network::Testnet), "https://api.testnet.hiro.so");
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fallback_equal_to_primary_is_ignored() {
        let config = SdkConfig::default().with_fallback(Network::Mainnet, "https://api.hiro.so/");
        assert_eq!(config.fallback_url(Network::Mainnet), None);

        let config = config.with_fallback(Network::Mainnet, "https://backup.example");
        assert_eq!(config.fallback_url(Network::Mainnet), Some("https://backup.example"));
        assert_eq!(config.fallback_url(Network::Testnet), None);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let update = ConfigUpdate {
            cache_ttl_secs: Some(5),
            disable_cache: Some(true),
            testnet_fallback_url: Some("https://t.example".into()),
            ..Default::default()
        };
        let mut once = SdkConfig::default();
        once.apply(&update);
        let mut twice = once.clone();
        twice.apply(&update);
        assert_eq!(once, twice);
        assert!(!once.cache_enabled);
        assert_eq!(once.testnet_fallback_url.as_deref(), Some("https://t.example"));

        once.apply(&ConfigUpdate {
            testnet_fallback_url: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(once.testnet_fallback_url, None);
    }

    #[test]
    fn test_same_cache_settings() {
        let base = SdkConfig::default();
        let mut next = base.clone();
        next.apply(&ConfigUpdate {
            cache_max_size: Some(base.cache_max_size),
            network_pool_size: Some(1),
            ..Default::default()
        });
        assert!(base.same_cache_settings(&next));

        next.apply(&ConfigUpdate {
            cache_ttl_secs: Some(1),
            ..Default::default()
        });
        assert!(!base.same_cache_settings(&next));
    }

    #[test]
    fn test_update_from_camel_case_json() {
        let update: ConfigUpdate =
            serde_json::from_str(r#"{"cacheTTL": 60, "mainnetFallbackUrl": "https://m.example"}"#).unwrap();
        assert_eq!(update.cache_ttl_secs, Some(60));
        assert!(update.touches_endpoints());
        assert!(update.touches_cache());
    }

    #[test]
    fn test_load_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bns.json");
        let config = SdkConfig::default().with_fallback(Network::Testnet, "https://t.example");
        config.save(&path).unwrap();
        assert_eq!(SdkConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bns.json");
        std::fs::write(&path, r#"{"cache_max_size": 10}"#).unwrap();
        let config = SdkConfig::load(&path).unwrap();
        assert_eq!(config.cache_max_size, 10);
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = SdkConfig {
            api_url: "ftp://x".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
