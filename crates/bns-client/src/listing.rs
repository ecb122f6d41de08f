//! Owned-name listing
//!
//! The indexing API pages through an address's valid names. When it is
//! unavailable, the NFT holdings endpoint of the node supplies the token ids
//! and each id is resolved through the registry contract. Pages after the
//! first are fetched concurrently; the result is always sorted by namespace
//! then name, without duplicates.

use std::time::Instant;

use bns_core::constants::NAME_ASSET;
use bns_core::{decode_char_codes, ClarityValue, Error, ErrorDetails, Network, OwnedName, Principal, Result};
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{field_str, field_u128};
use crate::cache::QueryFingerprint;
use crate::classify::RawFailure;
use crate::dispatcher::CallError;
use crate::metrics;
use crate::pool::EndpointHandle;
use crate::queries::name_ref_query;
use crate::resolver::BnsResolver;

#[derive(Deserialize)]
struct HoldingsPage {
    total: u64,
    #[serde(default)]
    results: Vec<Holding>,
}

#[derive(Deserialize)]
struct Holding {
    value: HoldingValue,
}

#[derive(Deserialize)]
struct HoldingValue {
    #[serde(default)]
    hex: Option<String>,
    #[serde(default)]
    repr: Option<String>,
}

impl HoldingValue {
    /// Token id from the `uN` repr, or from the hex value when repr is absent
    fn token_id(&self) -> Result<u128> {
        if let Some(id) = self
            .repr
            .as_deref()
            .and_then(|r| r.strip_prefix('u'))
            .and_then(|r| r.parse::<u128>().ok())
        {
            return Ok(id);
        }
        match &self.hex {
            Some(hex) => ClarityValue::from_hex(hex)?.expect_uint(),
            None => Err(Error::unexpected("holding has neither repr nor hex value")),
        }
    }
}

/// Listing size reported by an API page
fn page_total(body: &Value) -> Result<u64> {
    let total = field_u128(body, "total")?;
    u64::try_from(total).map_err(|_| Error::unexpected(format!("listing total out of range: {}", total)))
}

/// Offsets of every page after the first
fn remaining_offsets(total: u64, page_size: u32) -> Vec<u64> {
    (1..)
        .map(|page| page * page_size as u64)
        .take_while(|offset| *offset < total)
        .collect()
}

fn finish(mut names: Vec<OwnedName>) -> Vec<OwnedName> {
    names.sort();
    names.dedup();
    names
}

impl BnsResolver {
    /// Every valid name held by `address`
    pub async fn list_owned_names(&self, network: Network, address: &str) -> Result<Vec<OwnedName>> {
        address.parse::<Principal>()?;
        let started = Instant::now();
        let key = QueryFingerprint::new(network, "list-owned-names", &[("address", address.to_string())]);

        if let Some(hit) = self.context().cache_get::<Vec<OwnedName>>(&key) {
            metrics::record_query("list-owned-names", metrics::SOURCE_CACHE, started.elapsed());
            return Ok(hit);
        }

        let config = self.context().config();
        if !config.disable_api {
            match self.list_from_api(network, address, &config.api_url, config.page_size).await {
                Ok(names) => {
                    let names = finish(names);
                    self.context().cache_put(&key, &names);
                    metrics::record_query("list-owned-names", metrics::SOURCE_API, started.elapsed());
                    return Ok(names);
                }
                Err(err) => {
                    warn!(
                        network = %network,
                        kind = %err.kind(),
                        error = err.message(),
                        "Indexing API listing failed, falling back to NFT holdings"
                    );
                    self.context().classifier().remember(&err);
                    metrics::record_api_fallback(network);
                }
            }
        }

        let result = self.list_from_holdings(network, address, config.page_size).await;
        match result {
            Ok(names) => {
                let names = finish(names);
                self.context().cache_put(&key, &names);
                metrics::record_query("list-owned-names", metrics::SOURCE_CONTRACT, started.elapsed());
                Ok(names)
            }
            Err(err) => {
                metrics::record_query_error("list-owned-names", &err);
                Err(err)
            }
        }
    }

    async fn list_from_api(
        &self,
        network: Network,
        address: &str,
        base: &str,
        page_size: u32,
    ) -> Result<Vec<OwnedName>> {
        let (total, mut names) = self.api_page(network, address, base, page_size, 0).await?;
        let pages = try_join_all(
            remaining_offsets(total, page_size)
                .into_iter()
                .map(|offset| self.api_page(network, address, base, page_size, offset)),
        )
        .await?;
        for (_, page) in pages {
            names.extend(page);
        }
        info!(network = %network, total, fetched = names.len(), "Listed owned names from indexing API");
        Ok(names)
    }

    async fn api_page(
        &self,
        network: Network,
        address: &str,
        base: &str,
        limit: u32,
        offset: u64,
    ) -> Result<(u64, Vec<OwnedName>)> {
        let path = format!("/names/address/{}/valid?limit={}&offset={}", address, limit, offset);
        let body = match self.context().api().get(base, network, &path).await {
            Ok(body) => body,
            Err(failure) => {
                let details = ErrorDetails {
                    endpoint: Some(base.to_string()),
                    network: Some(network.to_string()),
                    function: Some(path),
                    ..Default::default()
                };
                return Err(self.context().classifier().classify(failure, &details));
            }
        };

        let total = page_total(&body)?;
        let entries = match body.get("current_names") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok((total, Vec::new())),
            Some(other) => {
                return Err(Error::unexpected(format!("current_names is not a list: {}", other)))
            }
        };
        let names = entries
            .iter()
            .map(|entry| {
                let name = field_str(entry, "name_string")?;
                let namespace = decode_char_codes(&field_str(entry, "namespace_string")?)?;
                Ok(OwnedName {
                    full_name: format!("{}.{}", name, namespace),
                    name,
                    namespace,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((total, names))
    }

    async fn list_from_holdings(
        &self,
        network: Network,
        address: &str,
        page_size: u32,
    ) -> Result<Vec<OwnedName>> {
        let first = self.holdings_page(network, address, page_size, 0).await?;
        let total = first.total;
        let rest = try_join_all(
            remaining_offsets(total, page_size)
                .into_iter()
                .map(|offset| self.holdings_page(network, address, page_size, offset)),
        )
        .await?;

        let ids = std::iter::once(first)
            .chain(rest)
            .flat_map(|page| page.results)
            .map(|holding| holding.value.token_id())
            .collect::<Result<Vec<_>>>()?;
        debug!(network = %network, total, ids = ids.len(), "Resolving held token ids");

        let refs = try_join_all(
            ids.into_iter()
                .map(|id| self.resolve(name_ref_query(network, id, false))),
        )
        .await?;
        Ok(refs.into_iter().flatten().map(OwnedName::from).collect())
    }

    async fn holdings_page(
        &self,
        network: Network,
        address: &str,
        limit: u32,
        offset: u64,
    ) -> Result<HoldingsPage> {
        let asset = format!("{}::{}", network.registry_contract(), NAME_ASSET);
        let path = format!(
            "/extended/v1/tokens/nft/holdings?principal={}&asset_identifiers={}&limit={}&offset={}",
            address, asset, limit, offset
        );
        let path = path.as_str();
        self.with_failover(network, "nft-holdings", |handle| async move {
            fetch_holdings(&handle, path).await
        })
        .await
    }
}

async fn fetch_holdings(
    handle: &EndpointHandle,
    path: &str,
) -> std::result::Result<HoldingsPage, CallError> {
    let url = handle.url(path);
    let resp = handle
        .http
        .get(&url)
        .send()
        .await
        .map_err(|e| CallError::Endpoint(e.into()))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(CallError::Endpoint(RawFailure::status(
            status.as_u16(),
            format!("{} returned {}", url, status),
        )));
    }
    resp.json::<HoldingsPage>().await.map_err(|e| {
        CallError::Endpoint(RawFailure::Structured(
            Error::unexpected(format!("malformed holdings page: {}", e)).with_cause(e),
        ))
    })
}
