// src/config/mod.rs
//! Service configuration, read from TOML.
//!
//! Lookup order:
//! 1) `$AGGREGATOR_CONFIG_PATH` (must exist)
//! 2) `config/aggregator.toml`
//! 3) built-in defaults
//!
//! Every field has a default, so a partial (or empty) file is fine.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::monitor::AnomalyMonitorCfg;
use crate::resilience::{Backoff, RetryPolicy};

pub const ENV_PATH: &str = "AGGREGATOR_CONFIG_PATH";
pub const DEFAULT_PATH: &str = "config/aggregator.toml";

/// Placeholder meaning "read the key from the provider's env var".
const ENV_PLACEHOLDER: &str = "ENV";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    pub http: HttpCfg,
    pub cache: CacheCfg,
    pub retry: RetryCfg,
    pub monitor: MonitorCfg,
    pub sources: SourcesCfg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpCfg {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpCfg {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: concat!("api-aggregator/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheCfg {
    pub ttl_secs: u64,
}

impl Default for CacheCfg {
    fn default() -> Self {
        Self { ttl_secs: 120 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryCfg {
    pub max_retries: u32,
    pub backoff_step_ms: u64,
}

impl Default for RetryCfg {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_ms: 500,
        }
    }
}

impl RetryCfg {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            backoff: Backoff::Linear {
                step: Duration::from_millis(self.backoff_step_ms),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorCfg {
    pub enabled: bool,
    pub interval_secs: u64,
    pub lookback_secs: u64,
    pub min_samples: usize,
    pub threshold_ratio: f64,
}

impl Default for MonitorCfg {
    fn default() -> Self {
        let d = AnomalyMonitorCfg::default();
        Self {
            enabled: true,
            interval_secs: d.interval.as_secs(),
            lookback_secs: d.lookback.as_secs(),
            min_samples: d.min_samples,
            threshold_ratio: d.threshold_ratio,
        }
    }
}

impl MonitorCfg {
    pub fn to_monitor_cfg(&self) -> AnomalyMonitorCfg {
        AnomalyMonitorCfg {
            interval: Duration::from_secs(self.interval_secs),
            lookback: Duration::from_secs(self.lookback_secs),
            min_samples: self.min_samples,
            threshold_ratio: self.threshold_ratio,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesCfg {
    pub news: SourceCfg,
    pub github: SourceCfg,
    pub weather: SourceCfg,
}

/// Per-provider settings. `None` fields fall back to the provider's own defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCfg {
    pub enabled: bool,
    pub base_url: Option<String>,
    pub default_query: Option<String>,
    /// Literal key, or "ENV" to read it from the provider's env var.
    pub api_key: Option<String>,
}

impl Default for SourceCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            default_query: None,
            api_key: None,
        }
    }
}

impl AggregatorConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AggregatorConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        cfg.resolve_keys()?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = Self::default();
        cfg.resolve_keys()?;
        Ok(cfg)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.http.connect_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    fn resolve_keys(&mut self) -> Result<()> {
        if self.sources.news.enabled {
            resolve_key(&mut self.sources.news.api_key, "NEWSAPI_API_KEY")?;
        }
        if self.sources.weather.enabled {
            resolve_key(&mut self.sources.weather.api_key, "OPENWEATHERMAP_API_KEY")?;
        }
        // GitHub works anonymously; a missing token only lowers the rate limit.
        if is_env_placeholder(self.sources.github.api_key.as_deref()) {
            self.sources.github.api_key = std::env::var("GITHUB_TOKEN").ok();
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        let d = MonitorCfg::default();
        if self.monitor.interval_secs == 0 {
            self.monitor.interval_secs = d.interval_secs;
        }
        if !(self.monitor.threshold_ratio.is_finite() && self.monitor.threshold_ratio > 0.0) {
            self.monitor.threshold_ratio = d.threshold_ratio;
        }
        if self.http.timeout_secs == 0 {
            self.http.timeout_secs = HttpCfg::default().timeout_secs;
        }
    }
}

fn is_env_placeholder(v: Option<&str>) -> bool {
    v.is_some_and(|k| k.trim().eq_ignore_ascii_case(ENV_PLACEHOLDER))
}

fn resolve_key(slot: &mut Option<String>, var: &str) -> Result<()> {
    if is_env_placeholder(slot.as_deref()) {
        let key = std::env::var(var).map_err(|_| anyhow!("Missing {var} env var"))?;
        *slot = Some(key);
    }
    Ok(())
}
