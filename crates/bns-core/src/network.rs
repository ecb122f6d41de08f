//! Network identity and the contracts deployed on each network

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{
    MAINNET_DEPLOYER, MAINNET_NODE_URL, REGISTRY_CONTRACT, TESTNET_API_PREFIX, TESTNET_DEPLOYER,
    TESTNET_NODE_URL, ZONEFILE_CONTRACT,
};
use crate::Error;

/// Network identifier
///
/// Selects contract addresses, the default node endpoint and the indexing API
/// path prefix. Queries against different networks never share cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn is_mainnet(&self) -> bool {
        matches!(self, Network::Mainnet)
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }

    /// Address that deployed the BNS contracts on this network
    pub fn deployer(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_DEPLOYER,
            Network::Testnet => TESTNET_DEPLOYER,
        }
    }

    /// The name registry contract
    pub fn registry_contract(&self) -> ContractId {
        ContractId::new(self.deployer(), REGISTRY_CONTRACT)
    }

    /// The zonefile resolution contract
    pub fn zonefile_contract(&self) -> ContractId {
        ContractId::new(self.deployer(), ZONEFILE_CONTRACT)
    }

    pub fn default_node_url(&self) -> &'static str {
        match self {
            Network::Mainnet => MAINNET_NODE_URL,
            Network::Testnet => TESTNET_NODE_URL,
        }
    }

    /// Path prefix inserted between the indexing API base URL and the query path
    pub fn api_prefix(&self) -> &'static str {
        match self {
            Network::Mainnet => "",
            Network::Testnet => TESTNET_API_PREFIX,
        }
    }

    /// c32 version byte for single-sig addresses on this network
    pub fn single_sig_version(&self) -> u8 {
        match self {
            Network::Mainnet => 22,
            Network::Testnet => 26,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(Error::validation(format!("unknown network: {}", other))),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Network::Mainnet
    }
}

/// Fully-qualified contract identifier (`address.name`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl ContractId {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}
