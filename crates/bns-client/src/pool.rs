//! Endpoint pool: per-network node handles with primary/fallback failover
//!
//! The whole pool lives behind one `ArcSwap`. Reconfiguration builds a fresh
//! state and stores it in a single swap, so a reader sees either the old or
//! the new endpoints, never a mix. Handles already handed out keep working
//! until dropped.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use bns_core::{Network, SdkConfig};
use reqwest::Client;
use tracing::{debug, info, warn};

/// Primary and optional fallback URL of one network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub primary_url: String,
    pub fallback_url: Option<String>,
}

impl EndpointConfig {
    pub fn new(primary_url: impl Into<String>, fallback_url: Option<String>) -> Self {
        let primary_url = normalize(&primary_url.into());
        let fallback_url = fallback_url
            .map(|url| normalize(&url))
            .filter(|url| !url.is_empty());
        if fallback_url.as_deref() == Some(primary_url.as_str()) {
            warn!(url = %primary_url, "Fallback URL equals primary, failover disabled");
            return Self {
                primary_url,
                fallback_url: None,
            };
        }
        Self {
            primary_url,
            fallback_url,
        }
    }

    fn from_config(config: &SdkConfig, network: Network) -> Self {
        Self::new(
            config.primary_url(network),
            config.fallback_url(network).map(str::to_string),
        )
    }
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// A ready-to-use connection to one node
pub struct EndpointHandle {
    pub network: Network,
    pub base_url: String,
    pub http: Client,
}

impl EndpointHandle {
    fn build(network: Network, base_url: &str, timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build HTTP client with timeout, using defaults");
            Client::new()
        });
        Self {
            network,
            base_url: base_url.to_string(),
            http,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl fmt::Debug for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointHandle")
            .field("network", &self.network)
            .field("base_url", &self.base_url)
            .finish()
    }
}

struct NetworkPool {
    config: EndpointConfig,
    handles: Vec<Arc<EndpointHandle>>,
    fallback: Option<Arc<EndpointHandle>>,
    cursor: AtomicUsize,
}

impl NetworkPool {
    fn build(network: Network, config: EndpointConfig, size: usize, timeout: Duration) -> Self {
        let handles = (0..size)
            .map(|_| Arc::new(EndpointHandle::build(network, &config.primary_url, timeout)))
            .collect();
        let fallback = config
            .fallback_url
            .as_deref()
            .map(|url| Arc::new(EndpointHandle::build(network, url, timeout)));
        Self {
            config,
            handles,
            fallback,
            cursor: AtomicUsize::new(0),
        }
    }
}

struct PoolState {
    mainnet: NetworkPool,
    testnet: NetworkPool,
    pool_size: usize,
    timeout: Duration,
    generation: u64,
}

impl PoolState {
    fn network(&self, network: Network) -> &NetworkPool {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }

    fn build(
        mainnet: EndpointConfig,
        testnet: EndpointConfig,
        pool_size: usize,
        timeout: Duration,
        generation: u64,
    ) -> Self {
        Self {
            mainnet: NetworkPool::build(Network::Mainnet, mainnet, pool_size, timeout),
            testnet: NetworkPool::build(Network::Testnet, testnet, pool_size, timeout),
            pool_size,
            timeout,
            generation,
        }
    }
}

/// Round-robin pool of node handles for both networks
pub struct EndpointPool {
    state: ArcSwap<PoolState>,
    /// Serializes writers; readers never take it
    write_lock: Mutex<()>,
}

impl EndpointPool {
    pub fn new(config: &SdkConfig) -> Self {
        let state = PoolState::build(
            EndpointConfig::from_config(config, Network::Mainnet),
            EndpointConfig::from_config(config, Network::Testnet),
            config.network_pool_size,
            config.request_timeout(),
            0,
        );
        Self {
            state: ArcSwap::from_pointee(state),
            write_lock: Mutex::new(()),
        }
    }

    /// Next primary handle; builds a fresh one when the pool is empty
    pub fn get_endpoint(&self, network: Network) -> Arc<EndpointHandle> {
        let state = self.state.load();
        let pool = state.network(network);
        if pool.handles.is_empty() {
            debug!(network = %network, "Endpoint pool empty, building fresh handle");
            return Arc::new(EndpointHandle::build(
                network,
                &pool.config.primary_url,
                state.timeout,
            ));
        }
        let idx = pool.cursor.fetch_add(1, Ordering::Relaxed) % pool.handles.len();
        pool.handles[idx].clone()
    }

    pub fn get_fallback_endpoint(&self, network: Network) -> Option<Arc<EndpointHandle>> {
        self.state.load().network(network).fallback.clone()
    }

    pub fn get_fallback_url(&self, network: Network) -> Option<String> {
        self.state.load().network(network).config.fallback_url.clone()
    }

    pub fn get_primary_url(&self, network: Network) -> String {
        self.state.load().network(network).config.primary_url.clone()
    }

    /// Replace one network's fallback and rebuild every handle
    ///
    /// Callers go through `SdkContext::set_fallback_url` so the SDK
    /// configuration stays the single record of endpoint URLs.
    pub(crate) fn set_fallback_url(&self, network: Network, url: Option<String>) {
        self.rebuild(|mainnet, testnet, _, _| {
            let target = match network {
                Network::Mainnet => mainnet,
                Network::Testnet => testnet,
            };
            *target = EndpointConfig::new(target.primary_url.clone(), url.clone());
        });
        info!(network = %network, fallback = ?self.get_fallback_url(network), "Fallback URL updated");
    }

    /// Rebuild both network pools from the current endpoint configuration
    pub fn refresh(&self) {
        self.rebuild(|_, _, _, _| {});
    }

    /// Rebuild from a full SDK configuration
    pub fn reconfigure(&self, config: &SdkConfig) {
        self.rebuild(|mainnet, testnet, pool_size, timeout| {
            *mainnet = EndpointConfig::from_config(config, Network::Mainnet);
            *testnet = EndpointConfig::from_config(config, Network::Testnet);
            *pool_size = config.network_pool_size;
            *timeout = config.request_timeout();
        });
    }

    /// Incremented on every rebuild
    pub fn generation(&self) -> u64 {
        self.state.load().generation
    }

    pub fn pool_size(&self) -> usize {
        self.state.load().pool_size
    }

    fn rebuild<F>(&self, edit: F)
    where
        F: FnOnce(&mut EndpointConfig, &mut EndpointConfig, &mut usize, &mut Duration),
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.state.load_full();
        let mut mainnet = current.mainnet.config.clone();
        let mut testnet = current.testnet.config.clone();
        let mut pool_size = current.pool_size;
        let mut timeout = current.timeout;
        edit(&mut mainnet, &mut testnet, &mut pool_size, &mut timeout);

        let next = PoolState::build(mainnet, testnet, pool_size, timeout, current.generation + 1);
        self.state.store(Arc::new(next));
        debug!(generation = current.generation + 1, "Endpoint pools rebuilt");
    }
}
