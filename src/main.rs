//! API aggregator service, binary entrypoint.
//! Loads config, wires sources, starts the anomaly monitor and serves the router.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tokio::sync::watch;

use api_aggregator::{api, metrics::Metrics, AggregatorConfig, AppState, Runtime};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    api_aggregator::init_tracing();

    let cfg = AggregatorConfig::load_default().context("loading aggregator config")?;
    let rt = Runtime::from_config(&cfg)?;

    let mut state = AppState::new(rt.aggregator.clone(), rt.stats.clone());
    if let Some(monitor) = rt.monitor {
        let (tx, rx) = watch::channel(false);
        // The handle is not awaited; the task ends when the stop flag is set or the state is dropped.
        let _monitor_task = monitor.spawn(rx);
        state = state.with_monitor_shutdown(tx);
    }

    let mut router = api::router(state);
    match Metrics::install(cfg.cache_ttl()) {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics exporter not installed"),
    }

    Ok(router.into())
}
