//! Shared SDK context
//!
//! One context owns the configuration, the result cache, the endpoint pool
//! and the failure classifier. Resolvers hold it behind an `Arc`, so clones
//! of a resolver share every piece of state.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use bns_core::{ConfigUpdate, Network, Result, SdkConfig};
use tracing::info;

use crate::api::IndexingApi;
use crate::cache::{QueryFingerprint, ResultCache};
use crate::classify::ErrorClassifier;
use crate::dispatcher::ContractCallDispatcher;
use crate::metrics;
use crate::pool::EndpointPool;

type CachedValue = Arc<dyn Any + Send + Sync>;

pub struct SdkContext {
    config: ArcSwap<SdkConfig>,
    cache: Mutex<ResultCache<CachedValue>>,
    pool: EndpointPool,
    classifier: ErrorClassifier,
    api: IndexingApi,
    dispatcher: ContractCallDispatcher,
    /// Serializes `configure` calls
    reconfigure_lock: Mutex<()>,
}

impl SdkContext {
    pub fn new(config: SdkConfig) -> Result<Self> {
        config.validate()?;
        info!(
            api_url = %config.api_url,
            mainnet_url = %config.mainnet_url,
            testnet_url = %config.testnet_url,
            cache_enabled = config.cache_enabled,
            "Creating SDK context"
        );
        Ok(Self {
            cache: Mutex::new(ResultCache::new(config.cache_max_size, config.cache_ttl())),
            pool: EndpointPool::new(&config),
            classifier: ErrorClassifier::new(),
            api: IndexingApi::new(config.request_timeout()),
            dispatcher: ContractCallDispatcher::new(),
            config: ArcSwap::from_pointee(config),
            reconfigure_lock: Mutex::new(()),
        })
    }

    /// Apply a partial update
    ///
    /// The cache is replaced (dropping its entries) only when its settings
    /// actually change. A pool size change rebuilds the pool from the new
    /// configuration; a fallback change replaces just that network's fallback.
    pub fn configure(&self, update: &ConfigUpdate) -> Result<()> {
        let _guard = lock(&self.reconfigure_lock);

        let prev = self.config.load_full();
        let mut next = SdkConfig::clone(&prev);
        next.apply(update);
        next.validate()?;

        if update.touches_cache() && !prev.same_cache_settings(&next) {
            *lock(&self.cache) = ResultCache::new(next.cache_max_size, next.cache_ttl());
        }
        if update.touches_endpoints() {
            if prev.network_pool_size != next.network_pool_size {
                self.pool.reconfigure(&next);
            } else {
                for network in [Network::Mainnet, Network::Testnet] {
                    let fallback = next.fallback_url(network);
                    if fallback != prev.fallback_url(network) {
                        self.pool.set_fallback_url(network, fallback.map(str::to_string));
                    }
                }
            }
        }

        info!(
            cache_enabled = next.cache_enabled,
            cache_max_size = next.cache_max_size,
            cache_ttl_secs = next.cache_ttl_secs,
            pool_size = next.network_pool_size,
            "SDK reconfigured"
        );
        self.config.store(Arc::new(next));
        Ok(())
    }

    /// Replace or clear one network's fallback node
    pub fn set_fallback_url(&self, network: Network, url: Option<String>) -> Result<()> {
        let url = Some(url.unwrap_or_default());
        let update = match network {
            Network::Mainnet => ConfigUpdate {
                mainnet_fallback_url: url,
                ..Default::default()
            },
            Network::Testnet => ConfigUpdate {
                testnet_fallback_url: url,
                ..Default::default()
            },
        };
        self.configure(&update)
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Arc<SdkConfig> {
        self.config.load_full()
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub(crate) fn api(&self) -> &IndexingApi {
        &self.api
    }

    pub(crate) fn dispatcher(&self) -> &ContractCallDispatcher {
        &self.dispatcher
    }

    pub fn cache_get<T>(&self, key: &QueryFingerprint) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        if !self.config.load().cache_enabled {
            return None;
        }
        let hit = lock(&self.cache)
            .get(key.as_str())
            .and_then(|value| value.downcast_ref::<T>().cloned());
        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    pub fn cache_put<T>(&self, key: &QueryFingerprint, value: &T)
    where
        T: Clone + Send + Sync + 'static,
    {
        if !self.config.load().cache_enabled {
            return;
        }
        let value: CachedValue = Arc::new(value.clone());
        lock(&self.cache).set(key.as_str(), value);
    }

    pub fn clear_cache(&self) {
        lock(&self.cache).clear();
    }

    pub fn cache_len(&self) -> usize {
        lock(&self.cache).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SdkContext {
        SdkContext::new(SdkConfig::default().with_urls("http://api.local", "http://node.local")).unwrap()
    }

    fn key(path: &str) -> QueryFingerprint {
        QueryFingerprint::new(Network::Mainnet, path, &[])
    }

    #[test]
    fn test_typed_cache_roundtrip() {
        let ctx = context();
        ctx.cache_put(&key("a"), &Some("SP1".to_string()));
        assert_eq!(ctx.cache_get::<Option<String>>(&key("a")), Some(Some("SP1".to_string())));
        // a different type under the same key is a miss
        assert_eq!(ctx.cache_get::<u128>(&key("a")), None);
        assert_eq!(ctx.cache_len(), 1);
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let ctx = context();
        ctx.configure(&ConfigUpdate {
            disable_cache: Some(true),
            ..Default::default()
        })
        .unwrap();
        ctx.cache_put(&key("a"), &1u128);
        assert_eq!(ctx.cache_get::<u128>(&key("a")), None);
        assert_eq!(ctx.cache_len(), 0);
    }

    #[test]
    fn test_cache_update_replaces_entries() {
        let ctx = context();
        ctx.cache_put(&key("a"), &1u128);
        ctx.configure(&ConfigUpdate {
            cache_max_size: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.cache_len(), 0);
        assert_eq!(ctx.config().cache_max_size, 2);
    }

    #[test]
    fn test_endpoint_update_rebuilds_pool_only() {
        let ctx = context();
        ctx.cache_put(&key("a"), &1u128);
        ctx.configure(&ConfigUpdate {
            mainnet_fallback_url: Some("http://backup.local".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.pool().generation(), 1);
        assert_eq!(
            ctx.pool().get_fallback_url(Network::Mainnet).as_deref(),
            Some("http://backup.local")
        );
        assert_eq!(ctx.cache_get::<u128>(&key("a")), Some(1));
    }

    #[test]
    fn test_repeated_cache_update_keeps_entries() {
        let ctx = context();
        let update = ConfigUpdate {
            cache_max_size: Some(1000),
            cache_ttl_secs: Some(300),
            disable_cache: Some(false),
            ..Default::default()
        };
        ctx.configure(&update).unwrap();
        ctx.cache_put(&key("a"), &1u128);
        ctx.configure(&update).unwrap();
        assert_eq!(ctx.cache_get::<u128>(&key("a")), Some(1));
    }

    #[test]
    fn test_fallback_survives_update_of_other_network() {
        let ctx = context();
        ctx.set_fallback_url(Network::Mainnet, Some("http://127.0.0.1:1".into()))
            .unwrap();
        assert_eq!(
            ctx.config().mainnet_fallback_url.as_deref(),
            Some("http://127.0.0.1:1")
        );

        ctx.configure(&ConfigUpdate {
            testnet_fallback_url: Some("http://backup-t.local".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            ctx.pool().get_fallback_url(Network::Mainnet).as_deref(),
            Some("http://127.0.0.1:1")
        );
        assert_eq!(
            ctx.pool().get_fallback_url(Network::Testnet).as_deref(),
            Some("http://backup-t.local")
        );

        // a pool size change rebuilds from config and still keeps both
        ctx.configure(&ConfigUpdate {
            network_pool_size: Some(2),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ctx.pool().pool_size(), 2);
        assert_eq!(
            ctx.pool().get_fallback_url(Network::Mainnet).as_deref(),
            Some("http://127.0.0.1:1")
        );

        ctx.set_fallback_url(Network::Mainnet, None).unwrap();
        assert_eq!(ctx.pool().get_fallback_url(Network::Mainnet), None);
        assert_eq!(ctx.config().mainnet_fallback_url, None);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = SdkContext::new(SdkConfig {
            mainnet_url: "node.local".into(),
            ..Default::default()
        })
        .err()
        .unwrap();
        assert_eq!(err.kind(), bns_core::ErrorKind::ValidationError);
    }
}
