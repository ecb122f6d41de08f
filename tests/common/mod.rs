//! Mock indexing API and node servers for integration tests
//!
//! Each `MockServer` answers from a table of canned responses keyed by path
//! and query. Contract calls can additionally be keyed by their hex arguments.
//! Unknown routes answer 404, or a fixed status when the server is failing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::{Json, Router};
use bns_client::{build_call, ContractCallDispatcher, ContractKind};
use bns_core::{ClarityValue, Network, SdkConfig};
use serde_json::{json, Value};
use tokio::net::TcpListener;

static PORT_COUNTER: AtomicU16 = AtomicU16::new(19400);

fn next_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

pub const ALICE: &str = "SP2J6ZY48GV1EZ5V2V5RB9MP66SW86PYKKNRV9EJ7";

#[derive(Default)]
struct Inner {
    hits: AtomicUsize,
    requests: Mutex<Vec<String>>,
    routes: Mutex<HashMap<String, (u16, Value)>>,
    failing: Mutex<Option<u16>>,
}

pub struct MockServer {
    pub url: String,
    inner: Arc<Inner>,
}

impl MockServer {
    pub async fn start() -> Self {
        let inner = Arc::new(Inner::default());
        let router = Router::new().fallback(handle).with_state(inner.clone());

        let (listener, port) = loop {
            let port = next_port();
            let addr: SocketAddr = ([127, 0, 0, 1], port).into();
            if let Ok(listener) = TcpListener::bind(addr).await {
                break (listener, port);
            }
        };

        tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            url: format!("http://127.0.0.1:{}", port),
            inner,
        }
    }

    /// A server answering every request with `status`
    pub async fn failing(status: u16) -> Self {
        let server = Self::start().await;
        *server.inner.failing.lock().unwrap() = Some(status);
        server
    }

    pub fn respond(&self, path_and_query: impl Into<String>, body: Value) -> &Self {
        self.respond_with(path_and_query, 200, body)
    }

    pub fn respond_with(&self, path_and_query: impl Into<String>, status: u16, body: Value) -> &Self {
        self.inner
            .routes
            .lock()
            .unwrap()
            .insert(path_and_query.into(), (status, body));
        self
    }

    /// Answer a read-only call regardless of its arguments
    pub fn respond_call(&self, network: Network, kind: ContractKind, function: &str, result: Value) -> &Self {
        self.respond(call_path(network, kind, function), result)
    }

    /// Answer a read-only call only for these exact arguments
    pub fn respond_call_args(
        &self,
        network: Network,
        kind: ContractKind,
        function: &str,
        args: &[ClarityValue],
        result: Value,
    ) -> &Self {
        let hex: Vec<String> = args.iter().map(ClarityValue::to_hex).collect();
        self.respond(format!("{}#{}", call_path(network, kind, function), hex.join(",")), result)
    }

    pub fn hits(&self) -> usize {
        self.inner.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.inner.requests.lock().unwrap().clone()
    }
}

async fn handle(State(inner): State<Arc<Inner>>, uri: Uri, body: String) -> (StatusCode, Json<Value>) {
    inner.hits.fetch_add(1, Ordering::SeqCst);
    let key = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    inner.requests.lock().unwrap().push(key.clone());

    if let Some(status) = *inner.failing.lock().unwrap() {
        return (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": "unavailable"})),
        );
    }

    let args_key = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("arguments").cloned())
        .and_then(|args| serde_json::from_value::<Vec<String>>(args).ok())
        .map(|args| format!("{}#{}", key, args.join(",")));

    let routes = inner.routes.lock().unwrap();
    let found = args_key
        .as_ref()
        .and_then(|k| routes.get(k))
        .or_else(|| routes.get(&key));
    match found {
        Some((status, body)) => (StatusCode::from_u16(*status).unwrap(), Json(body.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"error": "not found"}))),
    }
}

pub fn call_path(network: Network, kind: ContractKind, function: &str) -> String {
    ContractCallDispatcher::call_path(&build_call(network, kind, function, vec![]))
}

pub fn call_ok(value: &ClarityValue) -> Value {
    json!({"okay": true, "result": value.to_hex()})
}

pub fn call_rejected(cause: &str) -> Value {
    json!({"okay": false, "cause": cause})
}

pub fn config(api: &MockServer, node: &MockServer) -> SdkConfig {
    SdkConfig::default().with_urls(api.url.as_str(), node.url.as_str())
}

pub fn name_tuple(name: &str, namespace: &str) -> ClarityValue {
    ClarityValue::tuple([
        ("name", ClarityValue::buffer(name.as_bytes().to_vec())),
        ("namespace", ClarityValue::buffer(namespace.as_bytes().to_vec())),
    ])
}
