//! Runs one aggregation against the configured providers and prints it as JSON.
//!
//! Usage: `aggregate-once [keyword=..] [location=..] [sort=date|source] [source=..]`

use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use api_aggregator::{AggregateQuery, AggregatorConfig, Runtime};

fn parse_args() -> Result<AggregateQuery> {
    let mut q = AggregateQuery::default();
    for arg in std::env::args().skip(1) {
        let Some((k, v)) = arg.split_once('=') else {
            bail!("expected key=value, got '{arg}'");
        };
        let v = Some(v.to_string());
        match k {
            "keyword" => q.keyword = v,
            "location" => q.location = v,
            "sort" | "sortBy" => q.sort_by = v,
            "source" => q.source = v,
            other => bail!("unknown argument '{other}'"),
        }
    }
    Ok(q)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    api_aggregator::init_tracing();

    let query = parse_args()?;
    let cfg = AggregatorConfig::load_default().context("loading aggregator config")?;
    let rt = Runtime::from_config(&cfg)?;

    let (tx, rx) = watch::channel(false);
    let monitor = rt.monitor.map(|m| m.spawn(rx));

    let items = rt.aggregator.aggregate(&query).await;
    println!("{}", serde_json::to_string_pretty(&items)?);

    let stats = rt.stats.get_statistics();
    tracing::info!(target: "stats", ?stats, "call statistics");

    tx.send_replace(true);
    if let Some(handle) = monitor {
        handle.await.context("joining anomaly monitor")?;
    }
    Ok(())
}
