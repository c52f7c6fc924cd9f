// src/sources/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::transport::HttpRequest;

/// The common item shape every provider is translated into.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NormalizedItem {
    pub source: String, // registered source id, e.g. "NewsAPI", "GitHub"
    pub title: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// What the aggregator fans out to. Never fails: upstream trouble shows up as
/// an empty (or shorter) list plus a log event.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    async fn fetch(&self, query: Option<&str>) -> Vec<NormalizedItem>;
    fn id(&self) -> &'static str;
}

/// Provider-specific half of an adapter: how to ask and how to read the answer.
/// Caching, retries and timing live in [`super::CachedSource`].
pub trait Provider: Send + Sync + 'static {
    fn id(&self) -> &'static str;

    /// Used when the caller did not pass a query.
    fn default_query(&self) -> &str;

    fn build_request(&self, query: &str) -> Result<HttpRequest>;

    /// Malformed payloads are errors here; the caller turns them into an empty list.
    fn parse(&self, query: &str, body: &str) -> Result<Vec<NormalizedItem>>;
}
