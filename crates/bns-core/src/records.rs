//! Decoded domain records returned by read-only queries

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::names::{decode_char_codes, decode_name_text};
use crate::{ClarityValue, Error, PriceFunction, Result};

/// Result of `can-resolve-name`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanResolve {
    pub renewal: u128,
    pub owner: String,
}

impl CanResolve {
    pub fn from_clarity(value: ClarityValue) -> Result<Self> {
        let mut tuple = value.expect_tuple()?;
        Ok(Self {
            renewal: tuple.take("renewal")?.expect_uint()?,
            owner: tuple.take("owner")?.expect_principal()?,
        })
    }
}

/// A `name` + `namespace` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
    pub namespace: String,
}

impl NameRef {
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.name, self.namespace)
    }

    /// `{name: buff, namespace: buff}` tuple
    pub fn from_clarity(value: ClarityValue) -> Result<Self> {
        let mut tuple = value.expect_tuple()?;
        Ok(Self {
            name: decode_name_text(&tuple.take("name")?.expect_buffer()?)?,
            namespace: decode_name_text(&tuple.take("namespace")?.expect_buffer()?)?,
        })
    }
}

/// Properties of a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceProperties {
    pub namespace: String,
    pub namespace_manager: Option<String>,
    pub manager_transferable: bool,
    pub manager_frozen: bool,
    pub namespace_import: String,
    pub revealed_at: u128,
    pub launched_at: Option<u128>,
    pub lifetime: u128,
    pub can_update_price_function: bool,
    pub price_function: PriceFunction,
}

impl NamespaceProperties {
    /// `{namespace: buff, properties: {...}}` tuple from `get-namespace-properties`
    pub fn from_clarity(value: ClarityValue) -> Result<Self> {
        let mut outer = value.expect_tuple()?;
        let namespace = decode_name_text(&outer.take("namespace")?.expect_buffer()?)?;
        let mut props = outer.take("properties")?.expect_tuple()?;

        Ok(Self {
            namespace,
            namespace_manager: props
                .take_optional("namespace-manager")?
                .map(ClarityValue::expect_principal)
                .transpose()?,
            manager_transferable: props.take("manager-transferable")?.expect_bool()?,
            manager_frozen: props.take("manager-frozen")?.expect_bool()?,
            namespace_import: props.take("namespace-import")?.expect_principal()?,
            revealed_at: props.take("revealed-at")?.expect_uint()?,
            launched_at: props
                .take_optional("launched-at")?
                .map(ClarityValue::expect_uint)
                .transpose()?,
            lifetime: props.take("lifetime")?.expect_uint()?,
            can_update_price_function: props.take("can-update-price-function")?.expect_bool()?,
            price_function: PriceFunction::from_clarity(props.take("price-function")?)?,
        })
    }

    /// Namespace strings from older indexers arrive as character-code lists
    pub fn normalize_namespace(mut self) -> Result<Self> {
        self.namespace = decode_char_codes(&self.namespace)?;
        Ok(self)
    }
}

/// Registration record of a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameInfo {
    pub registered_at: Option<u128>,
    pub imported_at: Option<u128>,
    /// Hex-encoded preorder hash
    pub hashed_salted_fqn_preorder: Option<String>,
    pub preordered_by: Option<String>,
    pub renewal_height: u128,
    pub stx_burn: u128,
    pub owner: String,
}

impl NameInfo {
    pub fn from_clarity(value: ClarityValue) -> Result<Self> {
        let mut tuple = value.expect_tuple()?;
        Ok(Self {
            registered_at: tuple
                .take_optional("registered-at")?
                .map(ClarityValue::expect_uint)
                .transpose()?,
            imported_at: tuple
                .take_optional("imported-at")?
                .map(ClarityValue::expect_uint)
                .transpose()?,
            hashed_salted_fqn_preorder: tuple
                .take_optional("hashed-salted-fqn-preorder")?
                .map(|v| v.expect_buffer().map(hex::encode))
                .transpose()?,
            preordered_by: tuple
                .take_optional("preordered-by")?
                .map(ClarityValue::expect_principal)
                .transpose()?,
            renewal_height: tuple.take("renewal-height")?.expect_uint()?,
            stx_burn: tuple.take("stx-burn")?.expect_uint()?,
            owner: tuple.take("owner")?.expect_principal()?,
        })
    }
}

/// A name held by an address, as returned by bulk listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedName {
    pub full_name: String,
    pub name: String,
    pub namespace: String,
}

impl From<NameRef> for OwnedName {
    fn from(r: NameRef) -> Self {
        Self {
            full_name: r.full_name(),
            name: r.name,
            namespace: r.namespace,
        }
    }
}

impl Ord for OwnedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.namespace
            .cmp(&other.namespace)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.full_name.cmp(&other.full_name))
    }
}

impl PartialOrd for OwnedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Zonefile document attached to a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zonefile(pub serde_json::Value);

impl Zonefile {
    /// Parse the raw zonefile buffer stored by the resolver contract
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::zonefile(format!("zonefile is not UTF-8: {}", e)).with_cause(e))?;
        let value = serde_json::from_str(text)
            .map_err(|e| Error::zonefile(format!("zonefile is not valid JSON: {}", e)).with_cause(e))?;
        Ok(Self(value))
    }

    /// Owner field, when the zonefile carries one
    pub fn owner(&self) -> Option<&str> {
        self.0.get("owner").and_then(|v| v.as_str())
    }
}
