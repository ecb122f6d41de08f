//! bns-client: Dual-path BNS resolution
//!
//! Read-only queries try a result cache, then the indexing API, then a
//! read-only contract call on the network's primary node and, when that node
//! fails, its fallback node.
//!
//! ```no_run
//! use bns_client::BnsResolver;
//! use bns_core::{Network, SdkConfig};
//!
//! # async fn run() -> bns_core::Result<()> {
//! let resolver = BnsResolver::new(SdkConfig::default())?;
//! let owner = resolver.get_owner(Network::Mainnet, "alice.btc").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod classify;
pub mod context;
pub mod dispatcher;
pub mod listing;
pub mod metrics;
pub mod payload;
pub mod pool;
pub mod queries;
pub mod resolver;

pub use cache::{QueryFingerprint, ResultCache};
pub use classify::{ErrorClassifier, RawFailure, RecordedFailure};
pub use context::SdkContext;
pub use dispatcher::{build_call, CallError, ContractCallDispatcher, ContractCallPayload, ContractKind};
pub use payload::{
    name_renewal, name_transfer, namespace_ready, namespace_update_price, set_primary_name,
    update_zonefile,
};
pub use pool::{EndpointConfig, EndpointHandle, EndpointPool};
pub use resolver::BnsResolver;
