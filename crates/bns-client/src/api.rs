//! Indexing API client
//!
//! Plain HTTP GETs against the indexer. Bodies are snake_case JSON; the helpers
//! below pull typed fields out of them, accepting amounts either as JSON
//! numbers or as decimal strings.

use std::time::Duration;

use bns_core::{Error, Network, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

use crate::classify::RawFailure;

pub struct IndexingApi {
    http: Client,
}

impl IndexingApi {
    pub fn new(timeout: Duration) -> Self {
        let http = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build indexing API client with timeout, using defaults");
            Client::new()
        });
        Self { http }
    }

    /// Full URL: base + network prefix + path
    pub fn url(base: &str, network: Network, path: &str) -> String {
        format!("{}{}{}", base.trim_end_matches('/'), network.api_prefix(), path)
    }

    pub async fn get(
        &self,
        base: &str,
        network: Network,
        path: &str,
    ) -> std::result::Result<Value, RawFailure> {
        let url = Self::url(base, network, path);
        debug!(url = %url, "Indexing API request");

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RawFailure::status(
                status.as_u16(),
                format!("{} returned {}", url, status),
            ));
        }

        let body: Value = resp.json().await?;
        Ok(body)
    }
}

fn missing(field: &str) -> Error {
    Error::unexpected(format!("API response is missing {:?}", field))
}

/// Field holding an amount as a number or a decimal string
pub fn field_u128(body: &Value, field: &str) -> Result<u128> {
    parse_u128(body.get(field).ok_or_else(|| missing(field))?, field)
}

/// Same as `field_u128`, with `null` and absence both meaning `None`
pub fn field_opt_u128(body: &Value, field: &str) -> Result<Option<u128>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => parse_u128(v, field).map(Some),
    }
}

pub fn parse_u128(value: &Value, field: &str) -> Result<u128> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().map(u128::from),
        Value::String(s) => s.trim().trim_start_matches('u').parse::<u128>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| Error::unexpected(format!("{:?} is not an unsigned amount: {}", field, value)))
}

pub fn field_bool(body: &Value, field: &str) -> Result<bool> {
    match body.get(field) {
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::String(s)) if s == "true" || s == "false" => Ok(s == "true"),
        Some(other) => Err(Error::unexpected(format!("{:?} is not a boolean: {}", field, other))),
        None => Err(missing(field)),
    }
}

pub fn field_str(body: &Value, field: &str) -> Result<String> {
    field_opt_str(body, field)?.ok_or_else(|| missing(field))
}

pub fn field_opt_str(body: &Value, field: &str) -> Result<Option<String>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(Error::unexpected(format!("{:?} is not a string: {}", field, other))),
    }
}

/// Present field that may be `null`; absence is a malformed body
pub fn field_nullable_str(body: &Value, field: &str) -> Result<Option<String>> {
    match body.get(field) {
        None => Err(missing(field)),
        Some(_) => field_opt_str(body, field),
    }
}

/// Nested object under `field`
pub fn field_object<'a>(body: &'a Value, field: &str) -> Result<&'a Value> {
    match body.get(field) {
        Some(v @ Value::Object(_)) => Ok(v),
        Some(other) => Err(Error::unexpected(format!("{:?} is not an object: {}", field, other))),
        None => Err(missing(field)),
    }
}
