//! Resolution metrics
//!
//! Labels are limited to network, query label, source and outcome; names and
//! addresses never appear in metric labels. Without an installed recorder
//! every call is a no-op.

use bns_core::{Error, Network};
use metrics::{counter, histogram};
use std::time::Duration;

pub const SOURCE_CACHE: &str = "cache";
pub const SOURCE_API: &str = "api";
pub const SOURCE_CONTRACT: &str = "contract";

pub const OUTCOME_HIT: &str = "hit";
pub const OUTCOME_MISS: &str = "miss";
pub const OUTCOME_OK: &str = "ok";

pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { OUTCOME_HIT } else { OUTCOME_MISS };
    counter!("bns_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_api_fallback(network: Network) {
    counter!("bns_api_fallbacks_total", "network" => network.to_string()).increment(1);
}

pub fn record_endpoint_failover(network: Network) {
    counter!("bns_endpoint_failovers_total", "network" => network.to_string()).increment(1);
}

/// Resolved query, labelled by where the answer came from
pub fn record_query(label: &'static str, source: &'static str, duration: Duration) {
    counter!("bns_queries_total", "query" => label, "outcome" => OUTCOME_OK).increment(1);
    histogram!("bns_query_duration_seconds", "query" => label, "source" => source)
        .record(duration.as_secs_f64());
}

pub fn record_query_error(label: &'static str, err: &Error) {
    counter!("bns_queries_total", "query" => label, "outcome" => err.kind().as_str()).increment(1);
}
