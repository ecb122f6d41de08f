//! Dual-path query resolution
//!
//! Every read query walks the same stages:
//!
//! 1. `CacheCheck`: a fresh cached answer for the query fingerprint wins.
//! 2. `ApiAttempt`: the indexing API, unless disabled or the query has no
//!    API form. Any failure here is absorbed and recorded.
//! 3. `ContractAttempt`: a read-only contract call on the primary node, then
//!    on the fallback node when the primary fails at the endpoint level.
//!
//! Contract rejections and decode failures end the walk; they are answers,
//! not endpoint trouble, and another node would return the same thing.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use bns_core::{ClarityValue, ConfigUpdate, Error, ErrorDetails, ErrorKind, Network, Result, SdkConfig};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::QueryFingerprint;
use crate::classify::RecordedFailure;
use crate::context::SdkContext;
use crate::dispatcher::{CallError, ContractCallPayload};
use crate::metrics;
use crate::pool::EndpointHandle;

/// Indexing API form of a query
pub(crate) struct ApiPlan<T> {
    pub path: String,
    pub decode: fn(&Value) -> Result<T>,
    /// Answer to return when the API reports 404
    pub not_found: Option<T>,
}

/// A read query with both resolution paths
pub(crate) struct Query<T> {
    pub label: &'static str,
    pub network: Network,
    pub fingerprint: QueryFingerprint,
    pub api: Option<ApiPlan<T>>,
    pub call: ContractCallPayload,
    pub decode: fn(ClarityValue) -> Result<T>,
}

enum Stage {
    CacheCheck,
    ApiAttempt,
    ContractAttempt,
}

enum Attempt {
    Primary,
    Fallback(Arc<EndpointHandle>),
}

/// BNS name resolver
///
/// Cheap to clone; clones share the cache, endpoint pool and configuration.
#[derive(Clone)]
pub struct BnsResolver {
    ctx: Arc<SdkContext>,
}

impl BnsResolver {
    pub fn new(config: SdkConfig) -> Result<Self> {
        Ok(Self::with_context(Arc::new(SdkContext::new(config)?)))
    }

    pub fn with_context(ctx: Arc<SdkContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<SdkContext> {
        &self.ctx
    }

    pub fn configure(&self, update: &ConfigUpdate) -> Result<()> {
        self.ctx.configure(update)
    }

    pub fn clear_cache(&self) {
        self.ctx.clear_cache()
    }

    /// Failures that were absorbed by a fallback path, oldest first
    pub fn recent_failures(&self) -> Vec<RecordedFailure> {
        self.ctx.classifier().recent_failures()
    }

    pub(crate) async fn resolve<T>(&self, query: Query<T>) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let started = Instant::now();
        let result = self.walk(&query, started).await;
        if let Err(err) = &result {
            metrics::record_query_error(query.label, err);
        }
        result
    }

    async fn walk<T>(&self, query: &Query<T>, started: Instant) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let config = self.ctx.config();
        let mut stage = Stage::CacheCheck;

        loop {
            stage = match stage {
                Stage::CacheCheck => {
                    if let Some(hit) = self.ctx.cache_get::<T>(&query.fingerprint) {
                        debug!(query = query.label, key = %query.fingerprint, "Cache hit");
                        metrics::record_query(query.label, metrics::SOURCE_CACHE, started.elapsed());
                        return Ok(hit);
                    }
                    debug!(query = query.label, key = %query.fingerprint, "Cache miss");
                    if query.api.is_some() && !config.disable_api {
                        Stage::ApiAttempt
                    } else {
                        Stage::ContractAttempt
                    }
                }
                Stage::ApiAttempt => {
                    if let Some(plan) = &query.api {
                        if let Some(value) = self.try_api(query, plan, &config.api_url).await {
                            self.ctx.cache_put(&query.fingerprint, &value);
                            metrics::record_query(query.label, metrics::SOURCE_API, started.elapsed());
                            return Ok(value);
                        }
                        metrics::record_api_fallback(query.network);
                    }
                    Stage::ContractAttempt
                }
                Stage::ContractAttempt => {
                    debug!(
                        query = query.label,
                        network = %query.network,
                        function = %query.call.function_name,
                        "Contract read-only attempt"
                    );
                    let dispatcher = *self.ctx.dispatcher();
                    let call = &query.call;
                    let raw = self
                        .with_failover(query.network, &call.function_name, |handle| async move {
                            dispatcher.call_read_only(&handle, call).await
                        })
                        .await?;

                    let details = self.details(query.network, &call.function_name, None);
                    let value = (query.decode)(raw).map_err(|e| e.merge_details(&details))?;
                    self.ctx.cache_put(&query.fingerprint, &value);
                    metrics::record_query(query.label, metrics::SOURCE_CONTRACT, started.elapsed());
                    return Ok(value);
                }
            };
        }
    }

    /// `None` means the contract path should take over
    async fn try_api<T: Clone>(&self, query: &Query<T>, plan: &ApiPlan<T>, base: &str) -> Option<T> {
        let details = ErrorDetails {
            endpoint: Some(base.to_string()),
            network: Some(query.network.to_string()),
            function: Some(plan.path.clone()),
            ..Default::default()
        };

        let err = match self.ctx.api().get(base, query.network, &plan.path).await {
            Ok(body) => match (plan.decode)(&body) {
                Ok(value) => return Some(value),
                Err(err) => err.merge_details(&details),
            },
            Err(failure) => {
                let err = self.ctx.classifier().classify(failure, &details);
                if err.kind() == ErrorKind::NotFound {
                    if let Some(value) = &plan.not_found {
                        return Some(value.clone());
                    }
                }
                err
            }
        };

        warn!(
            query = query.label,
            network = %query.network,
            kind = %err.kind(),
            error = err.message(),
            "Indexing API failed, falling back to contract"
        );
        self.ctx.classifier().remember(&err);
        None
    }

    /// Run an operation against the primary node, then the fallback when the
    /// primary fails at the endpoint level
    ///
    /// When both fail the fallback's error is returned and the primary's is
    /// kept in the classifier history.
    pub(crate) async fn with_failover<R, F, Fut>(
        &self,
        network: Network,
        function: &str,
        op: F,
    ) -> Result<R>
    where
        F: Fn(Arc<EndpointHandle>) -> Fut,
        Fut: Future<Output = std::result::Result<R, CallError>>,
    {
        let pool = self.ctx.pool();
        let mut attempt = Attempt::Primary;

        loop {
            let (handle, is_primary) = match attempt {
                Attempt::Primary => (pool.get_endpoint(network), true),
                Attempt::Fallback(handle) => (handle, false),
            };
            let details = self.details(network, function, Some(&handle.base_url));

            let failure = match op(handle.clone()).await {
                Ok(value) => return Ok(value),
                Err(CallError::Rejected(err)) => return Err(err.merge_details(&details)),
                Err(CallError::Endpoint(failure)) => failure,
            };

            let fallback = if is_primary {
                pool.get_fallback_endpoint(network)
            } else {
                None
            };
            match fallback {
                Some(fallback) => {
                    let err = self.ctx.classifier().record(failure, &details);
                    warn!(
                        network = %network,
                        function,
                        primary = %handle.base_url,
                        fallback = %fallback.base_url,
                        error = %err,
                        "Primary endpoint failed, trying fallback"
                    );
                    metrics::record_endpoint_failover(network);
                    attempt = Attempt::Fallback(fallback);
                }
                None => return Err(self.ctx.classifier().classify(failure, &details)),
            }
        }
    }

    fn details(&self, network: Network, function: &str, endpoint: Option<&str>) -> ErrorDetails {
        ErrorDetails {
            endpoint: endpoint.map(str::to_string),
            network: Some(network.to_string()),
            function: Some(function.to_string()),
            ..Default::default()
        }
    }
}

/// Error for a query whose answer does not exist
pub(crate) fn not_found(what: impl std::fmt::Display) -> Error {
    Error::not_found(format!("{} not found", what))
}
