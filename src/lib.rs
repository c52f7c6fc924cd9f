// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregator;
pub mod api;
pub mod bootstrap;
pub mod cache;
pub mod clock;
pub mod config;
pub mod metrics;
pub mod monitor;
pub mod resilience;
pub mod sources;
pub mod stats;
pub mod transport;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{AggregateQuery, Aggregator, QueryParam, SortOrder};
pub use crate::api::{router, AppState};
pub use crate::bootstrap::Runtime;
pub use crate::config::AggregatorConfig;
pub use crate::monitor::{Anomaly, AnomalyMonitor, AnomalyMonitorCfg};
pub use crate::sources::{NormalizedItem, SourceAdapter};
pub use crate::stats::{SourceStats, StatisticsRecorder};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Safe to call more than once; later calls are no-ops.
///
/// `RUST_LOG` overrides the default filter, `LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("api_aggregator=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}
