//! Unsigned call payloads for state-changing contract functions
//!
//! Builders only encode arguments and pick the contract for the network.
//! Signing, post-conditions and broadcasting belong to the wallet side.

use bns_core::{validate_namespace, ClarityValue, Error, Fqn, Network, PriceFunction, Result, Zonefile};

use crate::dispatcher::{build_call, ContractCallPayload, ContractKind};

fn top_level(fqn: &str) -> Result<Fqn> {
    Fqn::parse_top_level(fqn)
}

/// Transfer token `id` from `owner` to `recipient`
pub fn name_transfer(network: Network, id: u128, owner: &str, recipient: &str) -> Result<ContractCallPayload> {
    Ok(build_call(
        network,
        ContractKind::Registry,
        "transfer",
        vec![
            ClarityValue::uint(id),
            ClarityValue::principal(owner)?,
            ClarityValue::principal(recipient)?,
        ],
    ))
}

pub fn set_primary_name(network: Network, fqn: &str) -> Result<ContractCallPayload> {
    let fqn = top_level(fqn)?;
    Ok(build_call(
        network,
        ContractKind::Registry,
        "set-primary-name",
        vec![
            ClarityValue::name_buffer(&fqn.name)?,
            ClarityValue::name_buffer(&fqn.namespace)?,
        ],
    ))
}

/// Set or clear (`None`) the zonefile of a name
pub fn update_zonefile(network: Network, fqn: &str, zonefile: Option<&Zonefile>) -> Result<ContractCallPayload> {
    let fqn = top_level(fqn)?;
    let content = zonefile
        .map(|zf| {
            serde_json::to_vec(&zf.0)
                .map(ClarityValue::buffer)
                .map_err(|e| Error::zonefile(format!("cannot encode zonefile: {}", e)).with_cause(e))
        })
        .transpose()?;
    Ok(build_call(
        network,
        ContractKind::Zonefile,
        "update-zonefile",
        vec![
            ClarityValue::name_buffer(&fqn.name)?,
            ClarityValue::name_buffer(&fqn.namespace)?,
            ClarityValue::optional(content),
        ],
    ))
}

pub fn name_renewal(network: Network, fqn: &str) -> Result<ContractCallPayload> {
    let fqn = top_level(fqn)?;
    Ok(build_call(
        network,
        ContractKind::Registry,
        "name-renewal",
        vec![
            ClarityValue::name_buffer(&fqn.namespace)?,
            ClarityValue::name_buffer(&fqn.name)?,
        ],
    ))
}

pub fn namespace_ready(network: Network, namespace: &str) -> Result<ContractCallPayload> {
    validate_namespace(namespace)?;
    Ok(build_call(
        network,
        ContractKind::Registry,
        "namespace-ready",
        vec![ClarityValue::name_buffer(namespace)?],
    ))
}

/// Replace a namespace's price function; buckets are passed as 16 separate
/// arguments between the coefficient and the discounts
pub fn namespace_update_price(
    network: Network,
    namespace: &str,
    price: &PriceFunction,
) -> Result<ContractCallPayload> {
    validate_namespace(namespace)?;
    let mut args = vec![
        ClarityValue::name_buffer(namespace)?,
        ClarityValue::uint(price.base),
        ClarityValue::uint(price.coeff),
    ];
    args.extend(price.buckets.iter().map(|b| ClarityValue::uint(*b)));
    args.push(ClarityValue::uint(price.nonalpha_discount));
    args.push(ClarityValue::uint(price.no_vowel_discount));
    Ok(build_call(network, ContractKind::Registry, "namespace-update-price", args))
}
