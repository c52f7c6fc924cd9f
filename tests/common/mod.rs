// tests/common/mod.rs
// Shared fakes for integration tests: a scripted HTTP transport and item builders.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use api_aggregator::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use api_aggregator::NormalizedItem;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;

pub const NEWS_FIXTURE: &str = include_str!("../fixtures/newsapi_top_headlines.json");
pub const GITHUB_FIXTURE: &str = include_str!("../fixtures/github_search_repositories.json");
pub const WEATHER_FIXTURE: &str = include_str!("../fixtures/openweathermap_current.json");

/// Replays queued outcomes in order, then answers every further call with `fallback`.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    fallback: Result<HttpResponse, TransportError>,
    latency: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// Always answers `200` with `body`.
    pub fn always_ok(body: &str) -> Self {
        Self::with_fallback(Ok(HttpResponse::ok_json(body)))
    }

    pub fn always_err(err: TransportError) -> Self {
        Self::with_fallback(Err(err))
    }

    pub fn with_fallback(fallback: Result<HttpResponse, TransportError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, outcome: Result<HttpResponse, TransportError>) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    /// Every call sleeps this long (tokio time) before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push(request);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn status(code: u16) -> HttpResponse {
    HttpResponse {
        status: code,
        body: String::new(),
    }
}

pub fn item(source: &str, title: &str, hour: u32) -> NormalizedItem {
    NormalizedItem {
        source: source.into(),
        title: title.into(),
        url: format!("https://example.test/{source}/{title}"),
        timestamp: Utc.with_ymd_and_hms(2024, 7, 25, hour, 0, 0).unwrap(),
    }
}
