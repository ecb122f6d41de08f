//! End-to-end resolution tests
//!
//! Drives `BnsResolver` against mock indexing API and node servers: cache,
//! API fast path, contract fallback, decoding and the absent-value policy.

mod common;

use bns_client::{BnsResolver, ContractKind};
use bns_core::{ClarityValue, ConfigUpdate, ErrorKind, Network, PriceFunction, SdkConfig};
use common::{call_ok, call_rejected, config, name_tuple, MockServer, ALICE};
use serde_json::json;

fn contract_only(api: &MockServer, node: &MockServer) -> SdkConfig {
    SdkConfig {
        disable_api: true,
        ..config(api, node)
    }
}

#[tokio::test]
async fn test_last_token_id_from_api_is_cached() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    api.respond("/token/last-id", json!({"last_token_id": "42"}));

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    assert_eq!(resolver.get_last_token_id(Network::Mainnet).await.unwrap(), 42);
    assert_eq!(api.hits(), 1);

    assert_eq!(resolver.get_last_token_id(Network::Mainnet).await.unwrap(), 42);
    assert_eq!(api.hits(), 1, "second call within TTL must not touch the network");
    assert_eq!(node.hits(), 0);
}

#[tokio::test]
async fn test_owner_falls_back_to_contract_when_api_down() {
    let api = MockServer::failing(503).await;
    let node = MockServer::start().await;
    node.respond_call_args(
        Network::Mainnet,
        ContractKind::Registry,
        "get-owner-name",
        &[ClarityValue::buffer(b"alice".to_vec()), ClarityValue::buffer(b"btc".to_vec())],
        call_ok(&ClarityValue::some(ClarityValue::principal(ALICE).unwrap())),
    );

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    let owner = resolver.get_owner(Network::Mainnet, "alice.btc").await.unwrap();
    assert_eq!(owner.as_deref(), Some(ALICE));
    assert_eq!(api.hits(), 1);
    assert_eq!(node.hits(), 1);

    let absorbed = resolver.recent_failures();
    assert_eq!(absorbed.len(), 1);
    assert_eq!(absorbed[0].kind, ErrorKind::ApiError);
    assert_eq!(absorbed[0].details.status, Some(503));
}

#[tokio::test]
async fn test_subdomain_rejected_before_any_request() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    let resolver = BnsResolver::new(config(&api, &node)).unwrap();

    let err = resolver.get_owner(Network::Mainnet, "sub.alice.btc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractError);
    let err = resolver.resolve_zonefile(Network::Mainnet, "sub.alice.btc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractError);

    assert_eq!(api.hits(), 0);
    assert_eq!(node.hits(), 0);
}

#[tokio::test]
async fn test_invalid_input_is_validation_error() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    let resolver = BnsResolver::new(config(&api, &node)).unwrap();

    for bad in ["Alice.btc", "ålice.btc", "alice", "a.b.c.d"] {
        let err = resolver.get_owner(Network::Mainnet, bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError, "input {:?}", bad);
    }
    let err = resolver.get_primary_name(Network::Mainnet, "not-an-address").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationError);
    assert_eq!(api.hits() + node.hits(), 0);
}

#[tokio::test]
async fn test_missing_id_is_none_but_missing_name_is_not_found() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-owner",
        call_ok(&ClarityValue::ok(ClarityValue::OptionalNone)),
    );
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-id-from-bns",
        call_ok(&ClarityValue::OptionalNone),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    assert_eq!(resolver.get_owner_by_id(Network::Mainnet, 999).await.unwrap(), None);

    let err = resolver.get_id_from_name(Network::Mainnet, "ghost.btc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.details().function.as_deref(), Some("get-id-from-bns"));
    assert_eq!(api.hits(), 0);
}

#[tokio::test]
async fn test_primary_name_sentinel_is_none() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-primary",
        call_ok(&ClarityValue::err(ClarityValue::uint(131))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    assert_eq!(resolver.get_primary_name(Network::Mainnet, ALICE).await.unwrap(), None);
}

#[tokio::test]
async fn test_primary_name_other_error_is_contract_error() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-primary",
        call_ok(&ClarityValue::err(ClarityValue::uint(7))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let err = resolver.get_primary_name(Network::Mainnet, ALICE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractError);
    assert_eq!(err.message(), "u7");

    // errors are never cached
    resolver.get_primary_name(Network::Mainnet, ALICE).await.unwrap_err();
    assert_eq!(node.hits(), 2);
}

#[tokio::test]
async fn test_primary_name_from_contract() {
    let api = MockServer::failing(500).await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-primary",
        call_ok(&ClarityValue::ok(ClarityValue::some(name_tuple("alice", "btc")))),
    );

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    let name = resolver.get_primary_name(Network::Mainnet, ALICE).await.unwrap();
    assert_eq!(name.as_deref(), Some("alice.btc"));
}

#[tokio::test]
async fn test_zonefile_api_404_is_none_without_contract_call() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    assert_eq!(resolver.resolve_zonefile(Network::Mainnet, "alice.btc").await.unwrap(), None);
    assert_eq!(api.hits(), 1);
    assert_eq!(node.hits(), 0);
}

#[tokio::test]
async fn test_zonefile_from_contract_buffer() {
    let api = MockServer::failing(502).await;
    let node = MockServer::start().await;
    let doc = json!({"owner": ALICE, "general": "hello"});
    node.respond_call(
        Network::Mainnet,
        ContractKind::Zonefile,
        "resolve-name",
        call_ok(&ClarityValue::ok(ClarityValue::some(ClarityValue::buffer(
            serde_json::to_vec(&doc).unwrap(),
        )))),
    );

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    let zonefile = resolver
        .resolve_zonefile(Network::Mainnet, "alice.btc")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(zonefile.owner(), Some(ALICE));
}

#[tokio::test]
async fn test_corrupt_zonefile_is_zonefile_error() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Zonefile,
        "resolve-name",
        call_ok(&ClarityValue::ok(ClarityValue::some(ClarityValue::buffer(b"{oops".to_vec())))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let err = resolver.resolve_zonefile(Network::Mainnet, "alice.btc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ZonefileError);
}

#[tokio::test]
async fn test_networks_never_share_cache_entries() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    api.respond("/token/last-id", json!({"last_token_id": 42}));
    api.respond("/testnet/token/last-id", json!({"last_token_id": "7"}));

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    for _ in 0..2 {
        assert_eq!(resolver.get_last_token_id(Network::Mainnet).await.unwrap(), 42);
        assert_eq!(resolver.get_last_token_id(Network::Testnet).await.unwrap(), 7);
    }
    assert_eq!(api.hits(), 2);
}

#[tokio::test]
async fn test_decode_mismatch_reports_tag() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-owner-name",
        call_ok(&ClarityValue::ok(ClarityValue::uint(1))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let err = resolver.get_owner(Network::Mainnet, "alice.btc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedResponse);
    assert_eq!(err.details().response_type.as_deref(), Some("uint"));
    assert_eq!(err.details().network.as_deref(), Some("mainnet"));
}

#[tokio::test]
async fn test_contract_rejection_is_contract_error() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-last-token-id",
        call_rejected("Runtime(UnknownFunction)"),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let err = resolver.get_last_token_id(Network::Mainnet).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractError);
    assert!(err.message().contains("UnknownFunction"));
}

#[tokio::test]
async fn test_name_price_unwraps_nested_responses() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-name-price",
        call_ok(&ClarityValue::ok(ClarityValue::ok(ClarityValue::uint(u64::MAX as u128 + 1)))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let price = resolver.get_name_price(Network::Mainnet, "alice.btc").await.unwrap();
    assert_eq!(price, u64::MAX as u128 + 1);
}

#[tokio::test]
async fn test_namespace_price_unwraps_nested_responses() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-namespace-price",
        call_ok(&ClarityValue::ok(ClarityValue::ok(ClarityValue::uint(1000)))),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    assert_eq!(resolver.get_namespace_price(Network::Mainnet, "btc").await.unwrap(), 1000);

    // a single layer still decodes
    resolver.clear_cache();
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-namespace-price",
        call_ok(&ClarityValue::ok(ClarityValue::uint(640))),
    );
    assert_eq!(resolver.get_namespace_price(Network::Mainnet, "btc").await.unwrap(), 640);
}

#[tokio::test]
async fn test_api_body_missing_field_falls_back_to_contract() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    api.respond("/names/alice.btc/owner", json!({"message": "rate limited"}));
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-owner-name",
        call_ok(&ClarityValue::some(ClarityValue::principal(ALICE).unwrap())),
    );

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    let owner = resolver.get_owner(Network::Mainnet, "alice.btc").await.unwrap();
    assert_eq!(owner.as_deref(), Some(ALICE));
    assert_eq!(node.hits(), 1);

    let absorbed = resolver.recent_failures();
    assert_eq!(absorbed.len(), 1);
    assert_eq!(absorbed[0].kind, ErrorKind::UnexpectedResponse);

    // an explicit null is a real answer
    api.respond("/names/bob.btc/owner", json!({"owner": null}));
    assert_eq!(resolver.get_owner(Network::Mainnet, "bob.btc").await.unwrap(), None);
    assert_eq!(node.hits(), 1);
}

#[tokio::test]
async fn test_namespace_properties_from_contract() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    let mut price = PriceFunction {
        base: 10,
        coeff: 1,
        nonalpha_discount: 2,
        no_vowel_discount: 3,
        ..Default::default()
    };
    price.buckets = [5; 16];
    let props = ClarityValue::tuple([
        ("namespace", ClarityValue::buffer(b"btc".to_vec())),
        (
            "properties",
            ClarityValue::tuple([
                ("namespace-manager", ClarityValue::OptionalNone),
                ("manager-transferable", ClarityValue::bool(false)),
                ("manager-frozen", ClarityValue::bool(false)),
                ("namespace-import", ClarityValue::principal(ALICE).unwrap()),
                ("revealed-at", ClarityValue::uint(100)),
                ("launched-at", ClarityValue::some(ClarityValue::uint(110))),
                ("lifetime", ClarityValue::uint(0)),
                ("can-update-price-function", ClarityValue::bool(true)),
                ("price-function", price.to_clarity()),
            ]),
        ),
    ]);
    node.respond_call(
        Network::Mainnet,
        ContractKind::Registry,
        "get-namespace-properties",
        call_ok(&ClarityValue::ok(props)),
    );

    let resolver = BnsResolver::new(contract_only(&api, &node)).unwrap();
    let ns = resolver.get_namespace_properties(Network::Mainnet, "btc").await.unwrap();
    assert_eq!(ns.namespace, "btc");
    assert_eq!(ns.launched_at, Some(110));
    assert_eq!(ns.price_function, price);
}

#[tokio::test]
async fn test_name_info_from_api() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    api.respond(
        "/names/alice.btc",
        json!({"data": {
            "registered_at": "100",
            "imported_at": null,
            "hashed_salted_fqn_preorder": null,
            "preordered_by": null,
            "renewal_height": "5000",
            "stx_burn": 0,
            "owner": ALICE
        }}),
    );

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    let info = resolver.get_name_info(Network::Mainnet, "alice.btc").await.unwrap();
    assert_eq!(info.renewal_height, 5000);
    assert_eq!(info.owner, ALICE);
    assert_eq!(node.hits(), 0);
}

#[tokio::test]
async fn test_disabling_cache_forces_requests() {
    let api = MockServer::start().await;
    let node = MockServer::start().await;
    api.respond("/names/alice.btc/can-register", json!({"can_register": false}));

    let resolver = BnsResolver::new(config(&api, &node)).unwrap();
    resolver
        .configure(&ConfigUpdate {
            disable_cache: Some(true),
            ..Default::default()
        })
        .unwrap();

    for _ in 0..3 {
        assert!(!resolver.can_register_name(Network::Mainnet, "alice.btc").await.unwrap());
    }
    assert_eq!(api.hits(), 3);
}
