//! HTTP surface over the aggregator core.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::aggregator::{AggregateQuery, Aggregator};
use crate::sources::NormalizedItem;
use crate::stats::{SourceStats, StatisticsRecorder};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub stats: Arc<StatisticsRecorder>,
    /// `None` when the monitor is disabled.
    pub monitor_shutdown: Option<Arc<watch::Sender<bool>>>,
}

impl AppState {
    pub fn new(aggregator: Arc<Aggregator>, stats: Arc<StatisticsRecorder>) -> Self {
        Self {
            aggregator,
            stats,
            monitor_shutdown: None,
        }
    }

    pub fn with_monitor_shutdown(mut self, tx: watch::Sender<bool>) -> Self {
        self.monitor_shutdown = Some(Arc::new(tx));
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/aggregate", get(aggregate))
        .route("/api/statistics", get(statistics))
        .route("/admin/monitor/stop", post(stop_monitor))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

/// 400 with `{success:false,error}`.
pub struct BadRequest(String);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.0),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct AggregateParams {
    keyword: Option<String>,
    #[serde(alias = "sortBy", alias = "sort_by")]
    sort: Option<String>,
    location: Option<String>,
    source: Option<String>,
    from: Option<String>,
    to: Option<String>,
}

async fn aggregate(
    State(state): State<AppState>,
    Query(p): Query<AggregateParams>,
) -> Result<Json<ApiResponse<Vec<NormalizedItem>>>, BadRequest> {
    let from = parse_bound(p.from.as_deref(), Bound::Start).map_err(BadRequest)?;
    let to = parse_bound(p.to.as_deref(), Bound::End).map_err(BadRequest)?;
    if let (Some(f), Some(t)) = (from, to) {
        if f > t {
            return Err(BadRequest("'from' must not be later than 'to'".into()));
        }
    }

    let query = AggregateQuery {
        keyword: p.keyword,
        sort_by: p.sort,
        location: p.location,
        source: p.source,
        from,
        to,
    };
    let items = state.aggregator.aggregate(&query).await;
    Ok(ApiResponse::ok(items))
}

async fn statistics(State(state): State<AppState>) -> Json<ApiResponse<BTreeMap<String, SourceStats>>> {
    ApiResponse::ok(state.stats.get_statistics())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StopOut {
    was_running: bool,
}

async fn stop_monitor(State(state): State<AppState>) -> Response {
    match &state.monitor_shutdown {
        Some(tx) => {
            let was_stopped = tx.send_replace(true);
            tracing::info!(target: "anomaly", "monitor stop requested");
            ApiResponse::ok(StopOut { was_running: !was_stopped }).into_response()
        }
        None => ApiResponse::ok(StopOut { was_running: false }).into_response(),
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// RFC 3339, or a bare `YYYY-MM-DD` (start of day for `from`, end of day for `to`, UTC).
fn parse_bound(raw: Option<&str>, bound: Bound) -> Result<Option<DateTime<Utc>>, String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{raw}': expected RFC 3339 or YYYY-MM-DD"))?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN),
    };
    Ok(Some(date.and_time(time).and_utc()))
}
