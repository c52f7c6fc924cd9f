//! Wires config into a ready-to-serve set of components.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::aggregator::{Aggregator, QueryParam};
use crate::cache::ResponseCache;
use crate::clock::{Clock, SystemClock};
use crate::config::{AggregatorConfig, SourceCfg};
use crate::monitor::AnomalyMonitor;
use crate::sources::{
    CachedSource, GitHubProvider, NewsProvider, SourceAdapter, SourceContext, WeatherProvider,
};
use crate::stats::StatisticsRecorder;
use crate::transport::{HttpTransport, ReqwestTransport};

/// Everything the binaries need. The monitor is not started yet.
pub struct Runtime {
    pub aggregator: Arc<Aggregator>,
    pub stats: Arc<StatisticsRecorder>,
    pub cache: ResponseCache,
    pub monitor: Option<AnomalyMonitor>,
}

impl Runtime {
    /// Production wiring: reqwest transport, wall clock.
    pub fn from_config(cfg: &AggregatorConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&cfg.http.user_agent, cfg.connect_timeout())
            .context("building http client")?;
        Ok(Self::with_parts(cfg, Arc::new(transport), Arc::new(SystemClock)))
    }

    /// Same wiring with an injected transport and clock.
    pub fn with_parts(
        cfg: &AggregatorConfig,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = ResponseCache::with_clock(clock.clone());
        let stats = Arc::new(StatisticsRecorder::with_clock(clock));
        let ctx = SourceContext::new(transport, cache.clone(), stats.clone())
            .with_retry(cfg.retry.policy())
            .with_cache_ttl(cfg.cache_ttl())
            .with_request_timeout(cfg.request_timeout());

        let mut aggregator = Aggregator::new();
        let s = &cfg.sources;

        if s.news.enabled {
            let mut p = NewsProvider::new(key_or_empty(&s.news, "news"));
            if let Some(url) = &s.news.base_url {
                p = p.with_base_url(url);
            }
            if let Some(q) = &s.news.default_query {
                p = p.with_default_query(q);
            }
            aggregator.register(adapter(p, &ctx), QueryParam::Keyword);
        }

        if s.github.enabled {
            let mut p = GitHubProvider::new().with_token(s.github.api_key.clone());
            if let Some(url) = &s.github.base_url {
                p = p.with_base_url(url);
            }
            if let Some(q) = &s.github.default_query {
                p = p.with_default_query(q);
            }
            aggregator.register(adapter(p, &ctx), QueryParam::Keyword);
        }

        if s.weather.enabled {
            let mut p = WeatherProvider::new(key_or_empty(&s.weather, "weather"));
            if let Some(url) = &s.weather.base_url {
                p = p.with_base_url(url);
            }
            if let Some(q) = &s.weather.default_query {
                p = p.with_default_query(q);
            }
            aggregator.register(adapter(p, &ctx), QueryParam::Location);
        }

        let monitor = cfg
            .monitor
            .enabled
            .then(|| AnomalyMonitor::new(stats.clone(), cfg.monitor.to_monitor_cfg()));

        tracing::info!(
            target: "aggregator",
            sources = ?aggregator.source_ids(),
            cache_ttl_secs = cfg.cache.ttl_secs,
            max_retries = cfg.retry.max_retries,
            monitor = cfg.monitor.enabled,
            "runtime ready"
        );

        Self {
            aggregator: Arc::new(aggregator),
            stats,
            cache,
            monitor,
        }
    }
}

fn adapter<P: crate::sources::Provider>(p: P, ctx: &SourceContext) -> Arc<dyn SourceAdapter> {
    Arc::new(CachedSource::new(p, ctx.clone()))
}

fn key_or_empty(cfg: &SourceCfg, name: &str) -> String {
    match cfg.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => k.to_string(),
        None => {
            // Upstream will answer 401, which is not retried and yields no items.
            tracing::warn!(target: "aggregator", source = name, "no api key configured");
            String::new()
        }
    }
}
