//! bns-core: Core types for the BNS name-service client
//!
//! This crate defines everything that does not touch the network:
//! - Network identities and the contracts deployed on each of them
//! - The Clarity value codec used by contract read-only calls
//! - c32check principal addresses
//! - Fully-qualified name parsing and the restricted name charset
//! - Decoded domain records (namespace properties, name info, price function)
//! - The closed error taxonomy shared with `bns-client`
//! - SDK configuration and the partial reconfiguration record
//!
//! # Value encoding
//!
//! Contract responses arrive as hex-encoded Clarity values:
//!
//! | Tag | Variant | Payload |
//! |-----|---------|---------|
//! | `0x00` | int | 16 bytes, big-endian |
//! | `0x01` | uint | 16 bytes, big-endian |
//! | `0x02` | buffer | u32 length + bytes |
//! | `0x03`/`0x04` | true/false | - |
//! | `0x05` | standard principal | version + hash160 |
//! | `0x06` | contract principal | standard principal + u8 length + name |
//! | `0x07`/`0x08` | response ok/err | inner value |
//! | `0x09`/`0x0a` | none/some | -/inner value |
//! | `0x0b` | list | u32 count + values |
//! | `0x0c` | tuple | u32 count + (u8 length + name + value)* |
//! | `0x0d`/`0x0e` | string-ascii/utf8 | u32 length + bytes |
//!
//! Integers are always 128-bit. On-chain amounts and token ids routinely exceed
//! the 53-bit range of loosely typed clients.

mod c32;
mod clarity;
mod config;
mod error;
mod names;
mod network;
mod price;
mod records;

pub use c32::{c32_decode, c32_encode, Principal, StandardPrincipal};
pub use clarity::{ClarityTuple, ClarityValue};
pub use config::{ConfigUpdate, SdkConfig};
pub use error::{Error, ErrorDetails, ErrorKind};
pub use names::{decode_char_codes, decode_name_text, validate_namespace, Fqn};
pub use network::{ContractId, Network};
pub use price::PriceFunction;
pub use records::{CanResolve, NameInfo, NameRef, NamespaceProperties, OwnedName, Zonefile};

pub type Result<T> = std::result::Result<T, Error>;

/// Constants shared by the client and its defaults
pub mod constants {
    /// Indexing API base URL
    pub const DEFAULT_API_URL: &str = "https://api.bnsv2.com";

    /// Path prefix the indexing API uses for testnet queries
    pub const TESTNET_API_PREFIX: &str = "/testnet";

    /// Mainnet node serving contract read-only calls
    pub const MAINNET_NODE_URL: &str = "https://api.hiro.so";

    /// Testnet node serving contract read-only calls
    pub const TESTNET_NODE_URL: &str = "https://api.testnet.hiro.so";

    /// Deployer of the BNS contracts on mainnet
    pub const MAINNET_DEPLOYER: &str = "SP2QEZ06AGJ3RKJPBV14SY1V5BBFNAW33D96YPGZF";

    /// Deployer of the BNS contracts on testnet
    pub const TESTNET_DEPLOYER: &str = "ST2QEZ06AGJ3RKJPBV14SY1V5BBFNAW33D9SZJQ0M";

    /// Name registry contract
    pub const REGISTRY_CONTRACT: &str = "BNS-V2";

    /// Zonefile resolution contract
    pub const ZONEFILE_CONTRACT: &str = "zonefile-resolver";

    /// NFT asset name of registered names inside the registry contract
    pub const NAME_ASSET: &str = "BNS-V2";

    /// Contract error returned by `get-primary` when no primary name is set
    pub const NO_PRIMARY_NAME_SENTINEL: &str = "u131";

    /// Number of price buckets in a namespace price function
    pub const PRICE_BUCKETS: usize = 16;

    /// Longest allowed name, in bytes
    pub const MAX_NAME_LEN: usize = 48;

    /// Longest allowed namespace, in bytes
    pub const MAX_NAMESPACE_LEN: usize = 20;

    /// Default number of cached query results
    pub const DEFAULT_CACHE_SIZE: usize = 1_000;

    /// Default cache time-to-live in seconds
    pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;

    /// Default number of pre-built endpoint handles per network
    pub const DEFAULT_POOL_SIZE: usize = 5;

    /// Default HTTP request timeout in milliseconds
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

    /// Default page size for owned-name listing
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
}
