//! Read-only queries
//!
//! One method per query shape. Each builds a `Query` with its indexing API
//! form, its contract call and the two decoders, then hands it to the
//! resolver. Top-level-name queries reject subdomains before any I/O.

use bns_core::constants::NO_PRIMARY_NAME_SENTINEL;
use bns_core::{
    decode_char_codes, validate_namespace, CanResolve, ClarityValue, Error, Fqn, NameInfo,
    NameRef, NamespaceProperties, Network, Principal, PriceFunction, Result, Zonefile,
};
use serde_json::Value;

use crate::api::{
    field_bool, field_nullable_str, field_object, field_opt_str, field_opt_u128, field_str, field_u128, parse_u128,
};
use crate::cache::QueryFingerprint;
use crate::dispatcher::{build_call, ContractKind};
use crate::resolver::{not_found, ApiPlan, BnsResolver, Query};

/// Unwrap a `(ok ...)` response, turning `(err ...)` into a contract error;
/// values that are not responses pass through
pub(crate) fn unwrap_response(value: ClarityValue) -> Result<ClarityValue> {
    match value {
        ClarityValue::ResponseOk(_) | ClarityValue::ResponseErr(_) => value.expect_ok(),
        other => Ok(other),
    }
}

fn name_args(fqn: &Fqn) -> Result<Vec<ClarityValue>> {
    Ok(vec![
        ClarityValue::name_buffer(&fqn.name)?,
        ClarityValue::name_buffer(&fqn.namespace)?,
    ])
}

fn namespace_first_args(fqn: &Fqn) -> Result<Vec<ClarityValue>> {
    Ok(vec![
        ClarityValue::name_buffer(&fqn.namespace)?,
        ClarityValue::name_buffer(&fqn.name)?,
    ])
}

fn fqn_key(network: Network, label: &str, fqn: &Fqn) -> QueryFingerprint {
    QueryFingerprint::new(network, label, &[("fqn", fqn.top_level())])
}

fn id_key(network: Network, label: &str, id: u128) -> QueryFingerprint {
    QueryFingerprint::new(network, label, &[("id", id.to_string())])
}

fn namespace_key(network: Network, label: &str, namespace: &str) -> QueryFingerprint {
    QueryFingerprint::new(network, label, &[("namespace", namespace.to_string())])
}

pub(crate) fn name_ref_query(network: Network, id: u128, api: bool) -> Query<Option<NameRef>> {
    Query {
        label: "get-name-from-id",
        network,
        fingerprint: id_key(network, "get-name-from-id", id),
        api: api.then(|| ApiPlan {
            path: format!("/tokens/{}/name", id),
            decode: |body| {
                let name = field_nullable_str(body, "name")?;
                let namespace = field_nullable_str(body, "namespace")?;
                Ok(match (name, namespace) {
                    (Some(name), Some(namespace)) => Some(NameRef {
                        name,
                        namespace: decode_char_codes(&namespace)?,
                    }),
                    _ => None,
                })
            },
            not_found: None,
        }),
        call: build_call(
            network,
            ContractKind::Registry,
            "get-bns-from-id",
            vec![ClarityValue::uint(id)],
        ),
        decode: |value| {
            unwrap_response(value)?
                .expect_optional()?
                .map(NameRef::from_clarity)
                .transpose()
        },
    }
}

impl BnsResolver {
    /// Highest token id minted so far
    pub async fn get_last_token_id(&self, network: Network) -> Result<u128> {
        self.resolve(Query {
            label: "get-last-token-id",
            network,
            fingerprint: QueryFingerprint::new(network, "get-last-token-id", &[]),
            api: Some(ApiPlan {
                path: "/token/last-id".to_string(),
                decode: |body| field_u128(body, "last_token_id"),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-last-token-id", vec![]),
            decode: |value| unwrap_response(value)?.expect_uint(),
        })
        .await
    }

    pub async fn get_renewal_height(&self, network: Network, fqn: &str) -> Result<u128> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "get-renewal-height",
            network,
            fingerprint: fqn_key(network, "get-renewal-height", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/renewal", fqn.top_level()),
                decode: |body| field_u128(body, "renewal_height"),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-bns-info", name_args(&fqn)?),
            decode: |value| {
                let info = unwrap_response(value)?
                    .expect_optional()?
                    .ok_or_else(|| not_found("name"))?;
                info.expect_tuple()?.take("renewal-height")?.expect_uint()
            },
        })
        .await
    }

    pub async fn can_resolve_name(&self, network: Network, fqn: &str) -> Result<CanResolve> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "can-resolve-name",
            network,
            fingerprint: fqn_key(network, "can-resolve-name", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/can-resolve", fqn.top_level()),
                decode: |body| {
                    Ok(CanResolve {
                        renewal: field_u128(body, "renewal")?,
                        owner: field_str(body, "owner")?,
                    })
                },
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "can-resolve-name",
                namespace_first_args(&fqn)?,
            ),
            decode: |value| CanResolve::from_clarity(unwrap_response(value)?),
        })
        .await
    }

    /// Owner of a name; `None` when the name is not registered
    pub async fn get_owner(&self, network: Network, fqn: &str) -> Result<Option<String>> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "get-owner",
            network,
            fingerprint: fqn_key(network, "get-owner", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/owner", fqn.top_level()),
                decode: |body| field_nullable_str(body, "owner"),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-owner-name", name_args(&fqn)?),
            decode: decode_optional_principal,
        })
        .await
    }

    /// Owner of a token id; `None` when the id does not exist
    pub async fn get_owner_by_id(&self, network: Network, id: u128) -> Result<Option<String>> {
        self.resolve(Query {
            label: "get-owner-by-id",
            network,
            fingerprint: id_key(network, "get-owner-by-id", id),
            api: Some(ApiPlan {
                path: format!("/tokens/{}/owner", id),
                decode: |body| field_nullable_str(body, "owner"),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-owner", vec![ClarityValue::uint(id)]),
            decode: decode_optional_principal,
        })
        .await
    }

    /// Token id of a name; `NotFound` when the name is not registered
    pub async fn get_id_from_name(&self, network: Network, fqn: &str) -> Result<u128> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "get-id-from-name",
            network,
            fingerprint: fqn_key(network, "get-id-from-name", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/id", fqn.top_level()),
                decode: |body| field_u128(body, "id"),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-id-from-bns", name_args(&fqn)?),
            decode: |value| {
                unwrap_response(value)?
                    .expect_optional()?
                    .ok_or_else(|| not_found("name"))?
                    .expect_uint()
            },
        })
        .await
    }

    /// Name behind a token id; `None` when the id does not exist
    pub async fn get_name_from_id(&self, network: Network, id: u128) -> Result<Option<NameRef>> {
        self.resolve(name_ref_query(network, id, true)).await
    }

    pub async fn can_register_name(&self, network: Network, fqn: &str) -> Result<bool> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "can-register-name",
            network,
            fingerprint: fqn_key(network, "can-register-name", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/can-register", fqn.top_level()),
                decode: |body| field_bool(body, "can_register"),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "can-register-name",
                namespace_first_args(&fqn)?,
            ),
            decode: |value| unwrap_response(value)?.expect_bool(),
        })
        .await
    }

    /// Launch price of a namespace; a nested response layer is unwrapped
    /// like for name prices
    pub async fn get_namespace_price(&self, network: Network, namespace: &str) -> Result<u128> {
        validate_namespace(namespace)?;
        self.resolve(Query {
            label: "get-namespace-price",
            network,
            fingerprint: namespace_key(network, "get-namespace-price", namespace),
            api: Some(ApiPlan {
                path: format!("/namespaces/{}/price", namespace),
                decode: |body| field_u128(body, "price"),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "get-namespace-price",
                vec![ClarityValue::name_buffer(namespace)?],
            ),
            decode: |value| unwrap_response(unwrap_response(value)?)?.expect_uint(),
        })
        .await
    }

    /// Registration price of a name; the contract nests the amount in two
    /// response layers
    pub async fn get_name_price(&self, network: Network, fqn: &str) -> Result<u128> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "get-name-price",
            network,
            fingerprint: fqn_key(network, "get-name-price", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}/price", fqn.top_level()),
                decode: |body| field_u128(body, "price"),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "get-name-price",
                namespace_first_args(&fqn)?,
            ),
            decode: |value| unwrap_response(unwrap_response(value)?)?.expect_uint(),
        })
        .await
    }

    pub async fn can_namespace_be_registered(&self, network: Network, namespace: &str) -> Result<bool> {
        validate_namespace(namespace)?;
        self.resolve(Query {
            label: "can-namespace-be-registered",
            network,
            fingerprint: namespace_key(network, "can-namespace-be-registered", namespace),
            api: Some(ApiPlan {
                path: format!("/namespaces/{}/can-register", namespace),
                decode: |body| field_bool(body, "can_register"),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "can-namespace-be-registered",
                vec![ClarityValue::name_buffer(namespace)?],
            ),
            decode: |value| unwrap_response(value)?.expect_bool(),
        })
        .await
    }

    /// Namespace properties; `NotFound` when the namespace does not exist
    pub async fn get_namespace_properties(
        &self,
        network: Network,
        namespace: &str,
    ) -> Result<NamespaceProperties> {
        validate_namespace(namespace)?;
        self.resolve(Query {
            label: "get-namespace-properties",
            network,
            fingerprint: namespace_key(network, "get-namespace-properties", namespace),
            api: Some(ApiPlan {
                path: format!("/namespaces/{}", namespace),
                decode: |body| namespace_from_json(field_object(body, "namespace")?),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "get-namespace-properties",
                vec![ClarityValue::name_buffer(namespace)?],
            ),
            decode: |value| {
                let props = match unwrap_response(value)? {
                    ClarityValue::OptionalNone => return Err(not_found("namespace")),
                    ClarityValue::OptionalSome(inner) => *inner,
                    other => other,
                };
                NamespaceProperties::from_clarity(props)?.normalize_namespace()
            },
        })
        .await
    }

    /// Registration record of a name; `NotFound` when it is not registered
    pub async fn get_name_info(&self, network: Network, fqn: &str) -> Result<NameInfo> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "get-name-info",
            network,
            fingerprint: fqn_key(network, "get-name-info", &fqn),
            api: Some(ApiPlan {
                path: format!("/names/{}", fqn.top_level()),
                decode: |body| name_info_from_json(field_object(body, "data")?),
                not_found: None,
            }),
            call: build_call(network, ContractKind::Registry, "get-bns-info", name_args(&fqn)?),
            decode: |value| {
                let info = unwrap_response(value)?
                    .expect_optional()?
                    .ok_or_else(|| not_found("name"))?;
                NameInfo::from_clarity(info)
            },
        })
        .await
    }

    /// Primary name of an address; `None` when it has none
    pub async fn get_primary_name(&self, network: Network, address: &str) -> Result<Option<String>> {
        let principal: Principal = address.parse()?;
        self.resolve(Query {
            label: "get-primary-name",
            network,
            fingerprint: QueryFingerprint::new(network, "get-primary-name", &[("address", address.to_string())]),
            api: Some(ApiPlan {
                path: format!("/names/address/{}/primary", address),
                decode: |body| field_nullable_str(body, "full_name"),
                not_found: None,
            }),
            call: build_call(
                network,
                ContractKind::Registry,
                "get-primary",
                vec![ClarityValue::principal(&principal.to_string())?],
            ),
            decode: decode_primary_name,
        })
        .await
    }

    /// Zonefile of a name; `None` when no zonefile is set
    pub async fn resolve_zonefile(&self, network: Network, fqn: &str) -> Result<Option<Zonefile>> {
        let fqn = Fqn::parse_top_level(fqn)?;
        self.resolve(Query {
            label: "resolve-zonefile",
            network,
            fingerprint: fqn_key(network, "resolve-zonefile", &fqn),
            api: Some(ApiPlan {
                path: format!("/resolve-name/{}", fqn.top_level()),
                decode: |body| match body.get("zonefile") {
                    None => Err(Error::unexpected("API response is missing \"zonefile\"")),
                    Some(Value::Null) => Ok(None),
                    Some(Value::String(text)) => Zonefile::from_bytes(text.as_bytes()).map(Some),
                    Some(doc) => Ok(Some(Zonefile(doc.clone()))),
                },
                not_found: Some(None),
            }),
            call: build_call(network, ContractKind::Zonefile, "resolve-name", name_args(&fqn)?),
            decode: |value| {
                unwrap_response(value)?
                    .expect_optional()?
                    .map(|buf| Zonefile::from_bytes(&buf.expect_buffer()?))
                    .transpose()
            },
        })
        .await
    }
}

fn decode_optional_principal(value: ClarityValue) -> Result<Option<String>> {
    unwrap_response(value)?
        .expect_optional()?
        .map(ClarityValue::expect_principal)
        .transpose()
}

fn decode_primary_name(value: ClarityValue) -> Result<Option<String>> {
    let inner = match value {
        ClarityValue::ResponseErr(code) if code.repr() == NO_PRIMARY_NAME_SENTINEL => return Ok(None),
        other => unwrap_response(other)?,
    };
    let name = match inner {
        ClarityValue::OptionalNone => return Ok(None),
        ClarityValue::OptionalSome(tuple) => *tuple,
        tuple => tuple,
    };
    Ok(Some(NameRef::from_clarity(name)?.full_name()))
}

fn namespace_from_json(ns: &Value) -> Result<NamespaceProperties> {
    let namespace = match field_opt_str(ns, "namespace_string")? {
        Some(text) => text,
        None => field_str(ns, "namespace")?,
    };
    NamespaceProperties {
        namespace,
        namespace_manager: field_opt_str(ns, "namespace_manager")?,
        manager_transferable: field_bool(ns, "manager_transferable")?,
        manager_frozen: field_bool(ns, "manager_frozen")?,
        namespace_import: field_str(ns, "namespace_import")?,
        revealed_at: field_u128(ns, "revealed_at")?,
        launched_at: field_opt_u128(ns, "launched_at")?,
        lifetime: field_u128(ns, "lifetime")?,
        can_update_price_function: field_bool(ns, "can_update_price_function")?,
        price_function: price_function_from_json(ns)?,
    }
    .normalize_namespace()
}

/// Price fields sit next to the namespace fields; buckets arrive as a JSON
/// list or a comma-separated string
fn price_function_from_json(ns: &Value) -> Result<PriceFunction> {
    let source = match ns.get("price_function") {
        Some(pf @ Value::Object(_)) => pf,
        _ => ns,
    };

    let values: Vec<u128> = match source.get("buckets") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| parse_u128(v, "buckets"))
            .collect::<Result<_>>()?,
        Some(Value::String(text)) => text
            .split(',')
            .map(|v| parse_u128(&Value::String(v.trim().to_string()), "buckets"))
            .collect::<Result<_>>()?,
        _ => return Err(Error::unexpected("namespace has no price buckets")),
    };

    let mut pf = PriceFunction {
        base: field_u128(source, "base")?,
        coeff: field_u128(source, "coeff")?,
        nonalpha_discount: field_u128(source, "nonalpha_discount")?,
        no_vowel_discount: field_u128(source, "no_vowel_discount")?,
        ..Default::default()
    };
    if values.len() != pf.buckets.len() {
        return Err(Error::unexpected(format!(
            "price function has {} buckets, expected {}",
            values.len(),
            pf.buckets.len()
        )));
    }
    pf.buckets.copy_from_slice(&values);
    Ok(pf)
}

fn name_info_from_json(data: &Value) -> Result<NameInfo> {
    Ok(NameInfo {
        registered_at: field_opt_u128(data, "registered_at")?,
        imported_at: field_opt_u128(data, "imported_at")?,
        hashed_salted_fqn_preorder: field_opt_str(data, "hashed_salted_fqn_preorder")?,
        preordered_by: field_opt_str(data, "preordered_by")?,
        renewal_height: field_u128(data, "renewal_height")?,
        stx_burn: field_u128(data, "stx_burn")?,
        owner: field_str(data, "owner")?,
    })
}
