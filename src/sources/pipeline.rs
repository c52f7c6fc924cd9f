//! Cache → resilient call → timing → parse → cache, shared by every provider.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};

use super::ensure_metrics_described;
use super::types::{NormalizedItem, Provider, SourceAdapter};
use crate::cache::ResponseCache;
use crate::resilience::RetryPolicy;
use crate::stats::StatisticsRecorder;
use crate::transport::{HttpResponse, HttpTransport};

/// Collaborators every adapter shares. Cheap to clone.
#[derive(Clone)]
pub struct SourceContext {
    pub transport: Arc<dyn HttpTransport>,
    pub cache: ResponseCache,
    pub stats: Arc<StatisticsRecorder>,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl SourceContext {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: ResponseCache,
        stats: Arc<StatisticsRecorder>,
    ) -> Self {
        Self {
            transport,
            cache,
            stats,
            retry: RetryPolicy::default(),
            cache_ttl: Duration::from_secs(120),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// [`SourceAdapter`] built from a [`Provider`] plus the shared context.
pub struct CachedSource<P: Provider> {
    provider: P,
    ctx: SourceContext,
}

impl<P: Provider> CachedSource<P> {
    pub fn new(provider: P, ctx: SourceContext) -> Self {
        Self { provider, ctx }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    async fn fetch_impl(&self, query: Option<&str>) -> Vec<NormalizedItem> {
        ensure_metrics_described();
        let id = self.provider.id();
        let query = query.map(str::trim).filter(|q| !q.is_empty());

        // 1) Cache lookup. Hits skip the network and the statistics.
        let key = ResponseCache::key_for(id, query);
        if let Some(hit) = self.ctx.cache.get(&key) {
            tracing::debug!(target: "upstream", source = id, %key, items = hit.len(), "cache hit");
            counter!("aggregator_cache_hits_total", "source" => id).increment(1);
            return hit.as_ref().clone();
        }
        counter!("aggregator_cache_misses_total", "source" => id).increment(1);

        // 2) Default + request.
        let effective = query.unwrap_or_else(|| self.provider.default_query());
        let request = match self.provider.build_request(effective) {
            Ok(r) => r.with_timeout(self.ctx.request_timeout),
            Err(e) => {
                tracing::error!(target: "upstream", source = id, query = effective, error = ?e, "could not build provider request");
                return Vec::new();
            }
        };
        tracing::info!(target: "upstream", source = id, query = effective, "fetching from provider");

        // 3) Resilient call, timed as a whole (retries and backoff included).
        let transport = self.ctx.transport.as_ref();
        let started = tokio::time::Instant::now();
        let response = self
            .ctx
            .retry
            .execute(id, || {
                let req = request.clone();
                async move {
                    transport
                        .execute(req)
                        .await
                        .and_then(HttpResponse::error_for_status)
                }
            })
            .await;
        let elapsed = started.elapsed();
        self.ctx.stats.record(id, elapsed);
        histogram!("upstream_call_duration_ms", "source" => id)
            .record(elapsed.as_secs_f64() * 1_000.0);

        // 4) Parse; malformed payloads become an empty list.
        let items = match self.provider.parse(effective, &response.body) {
            Ok(items) => items,
            Err(e) => {
                tracing::error!(target: "upstream", source = id, error = ?e, "malformed provider payload");
                Vec::new()
            }
        };

        // 5) Cache and return.
        self.ctx.cache.insert(key, items.clone(), self.ctx.cache_ttl);
        tracing::debug!(
            target: "upstream",
            source = id,
            items = items.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "provider fetch done"
        );
        items
    }
}

#[async_trait::async_trait]
impl<P: Provider> SourceAdapter for CachedSource<P> {
    async fn fetch(&self, query: Option<&str>) -> Vec<NormalizedItem> {
        self.fetch_impl(query).await
    }

    fn id(&self) -> &'static str {
        self.provider.id()
    }
}
