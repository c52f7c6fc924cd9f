// src/sources/mod.rs
pub mod github;
pub mod news;
pub mod pipeline;
pub mod types;
pub mod weather;

pub use github::GitHubProvider;
pub use news::NewsProvider;
pub use pipeline::{CachedSource, SourceContext};
pub use types::{NormalizedItem, Provider, SourceAdapter};
pub use weather::WeatherProvider;

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(describe_metrics);
}

/// Registers descriptions with whatever recorder is installed right now.
pub(crate) fn describe_metrics() {
    describe_counter!(
        "aggregator_cache_hits_total",
        "Source fetches answered from the response cache."
    );
    describe_counter!(
        "aggregator_cache_misses_total",
        "Source fetches that went to the provider."
    );
    describe_gauge!(
        "aggregator_cache_ttl_seconds",
        "Configured response cache TTL in seconds."
    );
    describe_counter!(
        "upstream_retries_total",
        "Retries issued after transient upstream failures."
    );
    describe_counter!(
        "upstream_fallbacks_total",
        "Upstream calls answered by the empty fallback."
    );
    describe_histogram!(
        "upstream_call_duration_ms",
        "Wall-clock duration of a resilient upstream call in milliseconds."
    );
}

/// Publishes the cache TTL gauge.
pub(crate) fn publish_cache_ttl(ttl: std::time::Duration) {
    gauge!("aggregator_cache_ttl_seconds").set(ttl.as_secs_f64());
}

/// Decode HTML entities, drop tags, collapse whitespace.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    let mut stripped = String::with_capacity(decoded.len());
    let mut in_tag = false;
    for ch in decoded.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
