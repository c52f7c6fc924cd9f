// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// The router runs on the real bootstrap wiring with a fake transport that
// serves fixture payloads per provider host.
//
// Covered:
// - GET /health
// - GET /api/aggregate (merge, filters, sort, date validation)
// - GET /api/statistics
// - POST /admin/monitor/stop

mod common;

use std::sync::Arc;

use api_aggregator::clock::ManualClock;
use api_aggregator::transport::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use api_aggregator::{api, AggregatorConfig, AppState, Runtime};
use async_trait::async_trait;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tokio::sync::watch;
use tower::ServiceExt as _; // for `oneshot`

use common::{GITHUB_FIXTURE, NEWS_FIXTURE, WEATHER_FIXTURE};

const BODY_LIMIT: usize = 1024 * 1024;

/// Picks the fixture by upstream host.
struct FixtureTransport;

#[async_trait]
impl HttpTransport for FixtureTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let body = if request.url.contains("newsapi.org") {
            NEWS_FIXTURE
        } else if request.url.contains("api.github.com") {
            GITHUB_FIXTURE
        } else if request.url.contains("openweathermap.org") {
            WEATHER_FIXTURE
        } else {
            return Err(TransportError::InvalidRequest(request.url));
        };
        Ok(HttpResponse::ok_json(body))
    }
}

fn test_runtime() -> Runtime {
    let mut cfg = AggregatorConfig::default();
    cfg.sources.news.api_key = Some("test-news".into());
    cfg.sources.weather.api_key = Some("test-weather".into());
    Runtime::with_parts(
        &cfg,
        Arc::new(FixtureTransport),
        Arc::new(ManualClock::starting_now()),
    )
}

fn test_router() -> Router {
    let rt = test_runtime();
    api::router(AppState::new(rt.aggregator, rt.stats))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn sources_of(v: &Json) -> Vec<String> {
    v["data"]
        .as_array()
        .expect("data array")
        .iter()
        .map(|i| i["source"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "ok");
}

#[tokio::test]
async fn aggregate_merges_all_sources_in_registration_order() {
    let (status, v) = get_json(test_router(), "/api/aggregate").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(
        sources_of(&v),
        ["NewsAPI", "NewsAPI", "GitHub", "GitHub", "OpenWeatherMap"]
    );
    assert_eq!(v["data"][4]["title"], "Weather in Athens: Clear, 31.5°C");
}

#[tokio::test]
async fn aggregate_sorts_by_date_newest_first() {
    let (_, v) = get_json(test_router(), "/api/aggregate?sort=DATE").await;
    let stamps: Vec<String> = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["timestamp"].as_str().unwrap().to_string())
        .collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted);
    assert_eq!(v["data"][0]["title"], "tokio-rs/tokio");
}

#[tokio::test]
async fn aggregate_filters_by_source_case_insensitively() {
    let (status, v) = get_json(test_router(), "/api/aggregate?source=github").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sources_of(&v), ["GitHub", "GitHub"]);
}

#[tokio::test]
async fn aggregate_date_only_window_covers_the_whole_day() {
    let (status, v) =
        get_json(test_router(), "/api/aggregate?from=2024-07-25&to=2024-07-25").await;
    assert_eq!(status, StatusCode::OK);
    // news 14:30, axum 18:45, weather 09:33 on 2024-07-25
    assert_eq!(sources_of(&v), ["NewsAPI", "GitHub", "OpenWeatherMap"]);
}

#[tokio::test]
async fn aggregate_rejects_inverted_range() {
    let (status, v) = get_json(
        test_router(),
        "/api/aggregate?from=2024-07-26T00:00:00Z&to=2024-07-25T00:00:00Z",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["success"], false);
    assert!(v["error"].as_str().unwrap().contains("from"));
    assert!(v.get("data").is_none());
}

#[tokio::test]
async fn aggregate_rejects_unparseable_date() {
    let (status, v) = get_json(test_router(), "/api/aggregate?to=next-tuesday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["success"], false);
}

#[tokio::test]
async fn statistics_reflect_upstream_calls_only() {
    let app = test_router();
    let (_, _) = get_json(app.clone(), "/api/aggregate?keyword=rust").await;
    // same keyword again: served from cache, not counted
    let (_, _) = get_json(app.clone(), "/api/aggregate?keyword=rust").await;

    let (status, v) = get_json(app, "/api/statistics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    for source in ["NewsAPI", "GitHub", "OpenWeatherMap"] {
        assert_eq!(v["data"][source]["totalRequests"], 1, "{source}");
        assert!(v["data"][source]["averageMs"].is_number());
    }
}

#[tokio::test]
async fn monitor_stop_flips_the_shutdown_flag() {
    let rt = test_runtime();
    let (tx, rx) = watch::channel(false);
    let app = api::router(AppState::new(rt.aggregator, rt.stats).with_monitor_shutdown(tx));

    let req = Request::builder()
        .method("POST")
        .uri("/admin/monitor/stop")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["data"]["wasRunning"], true);
    assert!(*rx.borrow());

    // second stop is a no-op
    let req = Request::builder()
        .method("POST")
        .uri("/admin/monitor/stop")
        .body(Body::empty())
        .unwrap();
    let bytes = body::to_bytes(app.oneshot(req).await.unwrap().into_body(), BODY_LIMIT)
        .await
        .unwrap();
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["data"]["wasRunning"], false);
}
