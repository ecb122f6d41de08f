//! Contract read-only call dispatch
//!
//! Encodes arguments, posts them to a node's call-read endpoint and decodes
//! the result envelope. Failures are split in two: endpoint failures (the node
//! could not answer) may be retried elsewhere, rejections (the contract
//! answered with an error or an undecodable value) may not.

use bns_core::{ClarityValue, ContractId, Error, Network};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::RawFailure;
use crate::pool::EndpointHandle;

/// Which BNS contract a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    Registry,
    Zonefile,
}

impl ContractKind {
    pub fn contract_id(&self, network: Network) -> ContractId {
        match self {
            ContractKind::Registry => network.registry_contract(),
            ContractKind::Zonefile => network.zonefile_contract(),
        }
    }
}

/// Why a read-only call produced no value
#[derive(Debug)]
pub enum CallError {
    /// The endpoint failed; another endpoint may succeed
    Endpoint(RawFailure),
    /// The contract answered; retrying elsewhere will not change it
    Rejected(Error),
}

/// A contract call ready to be signed and broadcast, or dispatched read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCallPayload {
    pub contract: ContractId,
    pub function_name: String,
    pub function_args: Vec<ClarityValue>,
    pub network: Network,
}

impl ContractCallPayload {
    /// Arguments in the hex form nodes expect
    pub fn args_hex(&self) -> Vec<String> {
        self.function_args.iter().map(ClarityValue::to_hex).collect()
    }
}

#[derive(Serialize)]
struct CallReadRequest<'a> {
    sender: &'a str,
    arguments: Vec<String>,
}

#[derive(Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<serde_json::Value>,
}

pub fn build_call(
    network: Network,
    kind: ContractKind,
    function: &str,
    args: Vec<ClarityValue>,
) -> ContractCallPayload {
    ContractCallPayload {
        contract: kind.contract_id(network),
        function_name: function.to_string(),
        function_args: args,
        network,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ContractCallDispatcher;

impl ContractCallDispatcher {
    pub fn new() -> Self {
        Self
    }

    /// Call-read path on a node for a payload
    pub fn call_path(payload: &ContractCallPayload) -> String {
        format!(
            "/v2/contracts/call-read/{}/{}/{}",
            payload.contract.address, payload.contract.name, payload.function_name
        )
    }

    pub async fn call_read_only(
        &self,
        handle: &EndpointHandle,
        payload: &ContractCallPayload,
    ) -> Result<ClarityValue, CallError> {
        let url = handle.url(&Self::call_path(payload));
        debug!(url = %url, function = %payload.function_name, "Contract read-only call");

        let body = CallReadRequest {
            sender: &payload.contract.address,
            arguments: payload.args_hex(),
        };

        let resp = handle
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CallError::Endpoint(e.into()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CallError::Endpoint(RawFailure::status(
                status.as_u16(),
                format!("{} returned {}: {}", url, status, text.trim()),
            )));
        }

        let envelope: CallReadResponse = resp.json().await.map_err(|e| {
            CallError::Endpoint(RawFailure::Structured(
                Error::unexpected(format!("malformed call-read response: {}", e)).with_cause(e),
            ))
        })?;

        if !envelope.okay {
            let cause = match envelope.cause {
                Some(serde_json::Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => "call rejected".to_string(),
            };
            return Err(CallError::Rejected(Error::contract(cause)));
        }

        let result = envelope.result.ok_or_else(|| {
            CallError::Endpoint(RawFailure::Structured(Error::unexpected(
                "call-read response has no result",
            )))
        })?;

        ClarityValue::from_hex(&result).map_err(CallError::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_path() {
        let payload = build_call(Network::Mainnet, ContractKind::Registry, "get-owner", vec![]);
        assert_eq!(
            ContractCallDispatcher::call_path(&payload),
            "/v2/contracts/call-read/SP2QEZ06AGJ3RKJPBV14SY1V5BBFNAW33D96YPGZF/BNS-V2/get-owner"
        );

        let payload = build_call(Network::Testnet, ContractKind::Zonefile, "resolve-name", vec![]);
        assert_eq!(payload.contract.name, "zonefile-resolver");
        assert!(payload.contract.address.starts_with("ST"));
    }

    #[test]
    fn test_args_hex() {
        let payload = build_call(
            Network::Mainnet,
            ContractKind::Registry,
            "get-owner",
            vec![ClarityValue::uint(1)],
        );
        assert_eq!(payload.args_hex(), vec![format!("0x01{}01", "00".repeat(15))]);
    }
}
