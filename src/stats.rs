//! # Statistics Recorder
//! Per-source latency log for upstream calls.
//!
//! Every completed upstream fetch appends one [`CallRecord`]. Records are kept for
//! the lifetime of the recorder and summarised on demand into [`SourceStats`].
//!
//! Each source owns its own lock, so appends for `GitHub` never wait on appends for
//! `NewsAPI`. The outer map lock is only taken for writing the first time a source
//! shows up.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::clock::{cutoff, Clock, SystemClock};

/// Calls faster than this are "fast".
pub const FAST_BELOW_MS: f64 = 100.0;
/// Calls slower than this are "slow"; anything in between (inclusive) is "average".
pub const SLOW_ABOVE_MS: f64 = 200.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub source: String,
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
    pub observed_at: DateTime<Utc>,
}

impl CallRecord {
    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1_000.0
    }
}

/// Summary of one source's records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub total_requests: usize,
    pub average_ms: f64,
    pub fast_count: usize,
    pub average_count: usize,
    pub slow_count: usize,
}

impl SourceStats {
    fn from_records(records: &[CallRecord]) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        let mut sum = 0.0;
        let (mut fast, mut average, mut slow) = (0, 0, 0);
        for r in records {
            let ms = r.duration_ms();
            sum += ms;
            if ms < FAST_BELOW_MS {
                fast += 1;
            } else if ms <= SLOW_ABOVE_MS {
                average += 1;
            } else {
                slow += 1;
            }
        }
        Some(Self {
            total_requests: records.len(),
            average_ms: sum / records.len() as f64,
            fast_count: fast,
            average_count: average,
            slow_count: slow,
        })
    }
}

type Bucket = Arc<Mutex<Vec<CallRecord>>>;

pub struct StatisticsRecorder {
    buckets: RwLock<HashMap<String, Bucket>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for StatisticsRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatisticsRecorder")
            .field("sources", &self.sources())
            .finish()
    }
}

impl Default for StatisticsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsRecorder {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Appends a record stamped with the recorder's clock.
    pub fn record(&self, source: &str, duration: Duration) {
        let entry = CallRecord {
            source: source.to_string(),
            duration,
            observed_at: self.clock.now(),
        };
        let bucket = self.bucket(source);
        bucket.lock().push(entry);
        tracing::trace!(target: "stats", source, duration_ms = duration.as_millis() as u64, "call recorded");
    }

    /// Summary for every source with at least one record.
    pub fn get_statistics(&self) -> BTreeMap<String, SourceStats> {
        self.snapshot_buckets()
            .into_iter()
            .filter_map(|(source, bucket)| {
                let records = bucket.lock();
                SourceStats::from_records(&records).map(|s| (source, s))
            })
            .collect()
    }

    /// Summary for one source, `None` if it has no records.
    pub fn stats_for(&self, source: &str) -> Option<SourceStats> {
        let bucket = self.buckets.read().get(source).cloned()?;
        let records = bucket.lock();
        SourceStats::from_records(&records)
    }

    /// Records for `source` observed within the last `period`. Unknown source → empty.
    pub fn get_recent_stats(&self, source: &str, period: Duration) -> Vec<CallRecord> {
        let Some(bucket) = self.buckets.read().get(source).cloned() else {
            return Vec::new();
        };
        let threshold = cutoff(self.clock.now(), period);
        let records = bucket.lock();
        records
            .iter()
            .filter(|r| r.observed_at >= threshold)
            .cloned()
            .collect()
    }

    /// Known source identifiers, sorted.
    pub fn sources(&self) -> Vec<String> {
        let mut out: Vec<String> = self.buckets.read().keys().cloned().collect();
        out.sort();
        out
    }

    fn bucket(&self, source: &str) -> Bucket {
        if let Some(b) = self.buckets.read().get(source) {
            return Arc::clone(b);
        }
        let mut map = self.buckets.write();
        Arc::clone(map.entry(source.to_string()).or_default())
    }

    fn snapshot_buckets(&self) -> Vec<(String, Bucket)> {
        self.buckets
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }
}

fn serialize_duration_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1_000.0)
}
