//! Fan-out to every registered source, fan-in, filter, sort.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use once_cell::sync::OnceCell;

use crate::sources::{NormalizedItem, SourceAdapter};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("aggregate_requests_total", "Aggregations served.");
        describe_histogram!(
            "aggregate_items_returned",
            "Items returned per aggregation after filtering."
        );
    });
}

/// Which caller parameter a source consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryParam {
    Keyword,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Newest first.
    Date,
    /// Source name, ascending.
    Source,
    /// Keep filter-stage order.
    Unchanged,
}

impl SortOrder {
    /// `"date"` / `"source"` (any case); everything else, absent included, is `Unchanged`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("date") => Self::Date,
            Some("source") => Self::Source,
            _ => Self::Unchanged,
        }
    }
}

/// Caller parameters; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateQuery {
    pub keyword: Option<String>,
    pub sort_by: Option<String>,
    pub location: Option<String>,
    pub source: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AggregateQuery {
    fn param(&self, which: QueryParam) -> Option<&str> {
        match which {
            QueryParam::Keyword => non_blank(self.keyword.as_deref()),
            QueryParam::Location => non_blank(self.location.as_deref()),
        }
    }
}

struct Registration {
    adapter: Arc<dyn SourceAdapter>,
    param: QueryParam,
}

/// Registered sources in registration order.
#[derive(Default)]
pub struct Aggregator {
    sources: Vec<Registration>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source; results are concatenated in registration order.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>, param: QueryParam) -> &mut Self {
        tracing::info!(target: "aggregator", source = adapter.id(), ?param, "source registered");
        self.sources.push(Registration { adapter, param });
        self
    }

    pub fn with_source(mut self, adapter: Arc<dyn SourceAdapter>, param: QueryParam) -> Self {
        self.register(adapter, param);
        self
    }

    pub fn source_ids(&self) -> Vec<&'static str> {
        self.sources.iter().map(|r| r.adapter.id()).collect()
    }

    /// Fetch everything concurrently, then filter and sort.
    ///
    /// Adapters never fail, so neither does this: a dead upstream just contributes
    /// nothing.
    pub async fn aggregate(&self, query: &AggregateQuery) -> Vec<NormalizedItem> {
        ensure_metrics_described();

        let fetches = self
            .sources
            .iter()
            .map(|r| r.adapter.fetch(query.param(r.param)));
        // join_all keeps input order regardless of completion order.
        let per_source = join_all(fetches).await;

        let fetched: usize = per_source.iter().map(Vec::len).sum();
        let all: Vec<NormalizedItem> = per_source.into_iter().flatten().collect();
        let mut items = filter_items(all, non_blank(query.source.as_deref()), query.from, query.to);
        sort_items(&mut items, SortOrder::parse(query.sort_by.as_deref()));

        counter!("aggregate_requests_total").increment(1);
        histogram!("aggregate_items_returned").record(items.len() as f64);
        tracing::info!(
            target: "aggregator",
            sources = self.sources.len(),
            fetched,
            returned = items.len(),
            "aggregation done"
        );
        items
    }
}

/// Source filter (exact, Unicode case-insensitive) and inclusive `[from, to]` window.
pub fn filter_items(
    items: Vec<NormalizedItem>,
    source: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<NormalizedItem> {
    let wanted = source.map(str::to_lowercase);
    items
        .into_iter()
        .filter(|it| wanted.as_deref().map_or(true, |s| it.source.to_lowercase() == s))
        .filter(|it| from.map_or(true, |f| it.timestamp >= f))
        .filter(|it| to.map_or(true, |t| it.timestamp <= t))
        .collect()
}

/// Stable sort, so ties keep their filter-stage order.
pub fn sort_items(items: &mut [NormalizedItem], order: SortOrder) {
    match order {
        SortOrder::Date => items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        SortOrder::Source => items.sort_by(|a, b| a.source.cmp(&b.source)),
        SortOrder::Unchanged => {}
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
