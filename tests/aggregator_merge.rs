// tests/aggregator_merge.rs
//
// Fan-out/fan-in over stub adapters: ordering is registration order no matter
// which source answers first, fetches run concurrently, and a source that
// yields nothing does not disturb the others.

mod common;

use std::sync::Arc;
use std::time::Duration;

use api_aggregator::{AggregateQuery, Aggregator, NormalizedItem, QueryParam, SourceAdapter};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use tokio::time::Instant;

use common::item;

struct Stub {
    id: &'static str,
    delay: Duration,
    items: Vec<NormalizedItem>,
    seen: Mutex<Vec<Option<String>>>,
}

impl Stub {
    fn new(id: &'static str, delay_ms: u64, items: Vec<NormalizedItem>) -> Arc<Self> {
        Arc::new(Self {
            id,
            delay: Duration::from_millis(delay_ms),
            items,
            seen: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SourceAdapter for Stub {
    async fn fetch(&self, query: Option<&str>) -> Vec<NormalizedItem> {
        self.seen.lock().push(query.map(str::to_string));
        tokio::time::sleep(self.delay).await;
        self.items.clone()
    }

    fn id(&self) -> &'static str {
        self.id
    }
}

fn titles(items: &[NormalizedItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

#[tokio::test(start_paused = true)]
async fn results_follow_registration_order_and_fetches_overlap() {
    let news = Stub::new("NewsAPI", 300, vec![item("NewsAPI", "n1", 8), item("NewsAPI", "n2", 12)]);
    let gh = Stub::new("GitHub", 50, vec![item("GitHub", "g1", 10)]);
    let weather = Stub::new("OpenWeatherMap", 150, vec![item("OpenWeatherMap", "w1", 9)]);

    let agg = Aggregator::new()
        .with_source(news.clone(), QueryParam::Keyword)
        .with_source(gh.clone(), QueryParam::Keyword)
        .with_source(weather.clone(), QueryParam::Location);

    let started = Instant::now();
    let out = agg.aggregate(&AggregateQuery::default()).await;

    assert_eq!(titles(&out), ["n1", "n2", "g1", "w1"]);
    // concurrent: bounded by the slowest source, not the sum
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn keyword_and_location_reach_the_right_sources() {
    let news = Stub::new("NewsAPI", 0, vec![]);
    let weather = Stub::new("OpenWeatherMap", 0, vec![]);
    let agg = Aggregator::new()
        .with_source(news.clone(), QueryParam::Keyword)
        .with_source(weather.clone(), QueryParam::Location);

    let q = AggregateQuery {
        keyword: Some("rust".into()),
        location: Some("Oslo".into()),
        ..Default::default()
    };
    agg.aggregate(&q).await;
    agg.aggregate(&AggregateQuery {
        keyword: Some("  ".into()),
        ..Default::default()
    })
    .await;

    assert_eq!(*news.seen.lock(), [Some("rust".to_string()), None]);
    assert_eq!(*weather.seen.lock(), [Some("Oslo".to_string()), None]);
}

#[tokio::test(start_paused = true)]
async fn empty_source_does_not_affect_the_others() {
    let dead = Stub::new("NewsAPI", 10, vec![]);
    let gh = Stub::new("GitHub", 10, vec![item("GitHub", "g1", 1), item("GitHub", "g2", 2)]);
    let agg = Aggregator::new()
        .with_source(dead, QueryParam::Keyword)
        .with_source(gh, QueryParam::Keyword);

    let out = agg.aggregate(&AggregateQuery::default()).await;
    assert_eq!(titles(&out), ["g1", "g2"]);
}

#[tokio::test(start_paused = true)]
async fn filters_then_sorts() {
    let news = Stub::new("NewsAPI", 0, vec![item("NewsAPI", "n-early", 6), item("NewsAPI", "n-late", 20)]);
    let gh = Stub::new("GitHub", 0, vec![item("GitHub", "g-mid", 12), item("GitHub", "g-noon", 13)]);
    let agg = Aggregator::new()
        .with_source(news, QueryParam::Keyword)
        .with_source(gh, QueryParam::Keyword);

    let q = AggregateQuery {
        sort_by: Some("date".into()),
        from: Some(Utc.with_ymd_and_hms(2024, 7, 25, 7, 0, 0).unwrap()),
        to: Some(Utc.with_ymd_and_hms(2024, 7, 25, 20, 0, 0).unwrap()),
        ..Default::default()
    };
    let out = agg.aggregate(&q).await;
    assert_eq!(titles(&out), ["n-late", "g-noon", "g-mid"]);

    let by_source = agg
        .aggregate(&AggregateQuery {
            sort_by: Some("source".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(titles(&by_source), ["g-mid", "g-noon", "n-early", "n-late"]);

    let only_news = agg
        .aggregate(&AggregateQuery {
            source: Some("newsapi".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(titles(&only_news), ["n-early", "n-late"]);
}

#[tokio::test]
async fn no_sources_means_no_items() {
    let agg = Aggregator::new();
    assert!(agg.aggregate(&AggregateQuery::default()).await.is_empty());
    assert!(agg.source_ids().is_empty());
}
