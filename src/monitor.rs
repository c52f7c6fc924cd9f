//! Background latency-regression detector.
//!
//! Every tick compares each source's recent average (look-back window) against its
//! all-time average and warns when the recent one exceeds `threshold_ratio ×` the
//! historical one. Sources with too few recent calls are skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::stats::{SourceStats, StatisticsRecorder};

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("anomaly_ticks_total", "Anomaly monitor ticks completed.");
        describe_counter!(
            "anomaly_warnings_total",
            "Latency anomalies flagged, per source."
        );
    });
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalyMonitorCfg {
    pub interval: Duration,
    pub lookback: Duration,
    pub min_samples: usize,
    pub threshold_ratio: f64,
}

impl Default for AnomalyMonitorCfg {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            lookback: Duration::from_secs(5 * 60),
            min_samples: 5,
            threshold_ratio: 1.5,
        }
    }
}

/// One flagged regression.
#[derive(Clone, Debug, PartialEq)]
pub struct Anomaly {
    pub source: String,
    pub recent_avg_ms: f64,
    pub historical_avg_ms: f64,
    pub recent_samples: usize,
}

pub struct AnomalyMonitor {
    stats: Arc<StatisticsRecorder>,
    cfg: AnomalyMonitorCfg,
    ticks: Arc<AtomicU64>,
}

impl AnomalyMonitor {
    pub fn new(stats: Arc<StatisticsRecorder>, cfg: AnomalyMonitorCfg) -> Self {
        Self {
            stats,
            cfg,
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cfg(&self) -> &AnomalyMonitorCfg {
        &self.cfg
    }

    /// Completed ticks so far. Stays readable after the monitor moves into its task.
    pub fn tick_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.ticks)
    }

    /// Runs one tick. A failing source is logged and skipped; the others still run.
    pub fn check_once(&self) -> Vec<Anomaly> {
        ensure_metrics_described();
        let all_time = self.stats.get_statistics();
        let mut found = Vec::new();

        for (source, historical) in &all_time {
            match self.check_source(source, historical) {
                Ok(Some(anomaly)) => {
                    tracing::warn!(
                        target: "anomaly",
                        source = %anomaly.source,
                        recent_avg_ms = format!("{:.2}", anomaly.recent_avg_ms),
                        historical_avg_ms = format!("{:.2}", anomaly.historical_avg_ms),
                        samples = anomaly.recent_samples,
                        "average response time increased significantly"
                    );
                    counter!("anomaly_warnings_total", "source" => source.clone()).increment(1);
                    found.push(anomaly);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(target: "anomaly", %source, error = ?e, "anomaly check failed");
                }
            }
        }

        counter!("anomaly_ticks_total").increment(1);
        self.ticks.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn check_source(&self, source: &str, historical: &SourceStats) -> Result<Option<Anomaly>> {
        let recent = self.stats.get_recent_stats(source, self.cfg.lookback);
        if recent.len() < self.cfg.min_samples {
            return Ok(None);
        }

        let recent_avg = recent.iter().map(|r| r.duration_ms()).sum::<f64>() / recent.len() as f64;
        let historical_avg = historical.average_ms;
        if !recent_avg.is_finite() || !historical_avg.is_finite() {
            bail!("non-finite averages: recent={recent_avg} historical={historical_avg}");
        }

        if recent_avg > historical_avg * self.cfg.threshold_ratio {
            Ok(Some(Anomaly {
                source: source.to_string(),
                recent_avg_ms: recent_avg,
                historical_avg_ms: historical_avg,
                recent_samples: recent.len(),
            }))
        } else {
            Ok(None)
        }
    }

    /// Tick, sleep, repeat until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Shutdown is observed during the sleep; a tick that already started runs to the end.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let clock = self.stats.clock();
        tracing::info!(
            target: "anomaly",
            interval_secs = self.cfg.interval.as_secs(),
            lookback_secs = self.cfg.lookback.as_secs(),
            "anomaly monitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tracing::debug!(target: "anomaly", at = %clock.now(), "anomaly tick");
            let anomalies = self.check_once();
            if !anomalies.is_empty() {
                tracing::debug!(target: "anomaly", count = anomalies.len(), "tick flagged sources");
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.cfg.interval) => {}
            }
        }

        tracing::info!(target: "anomaly", "anomaly monitor stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
