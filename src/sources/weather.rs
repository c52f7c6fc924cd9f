// src/sources/weather.rs
use anyhow::{Context, Result};
use chrono::DateTime;
use serde::Deserialize;

use super::types::{NormalizedItem, Provider};
use crate::transport::HttpRequest;

pub const SOURCE_ID: &str = "OpenWeatherMap";
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_QUERY: &str = "Athens";

#[derive(Debug, Deserialize)]
struct WeatherResponse {
    id: Option<i64>,
    #[serde(default)]
    weather: Vec<Condition>,
    main: Option<MainInfo>,
    dt: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Condition {
    main: String,
}

#[derive(Debug, Deserialize)]
struct MainInfo {
    temp: f64,
}

/// Current weather for one city, as a single item.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    base_url: String,
    api_key: String,
    default_query: String,
}

impl WeatherProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            default_query: DEFAULT_QUERY.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_query(mut self, query: impl Into<String>) -> Self {
        self.default_query = query.into();
        self
    }
}

impl Provider for WeatherProvider {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn default_query(&self) -> &str {
        &self.default_query
    }

    fn build_request(&self, query: &str) -> Result<HttpRequest> {
        // OpenWeatherMap only accepts the key as a query parameter.
        let url = reqwest::Url::parse_with_params(
            &self.base_url,
            &[
                ("q", query),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ],
        )
        .with_context(|| format!("building OpenWeatherMap url from {}", self.base_url))?;
        Ok(HttpRequest::get(url.as_str()))
    }

    fn parse(&self, query: &str, body: &str) -> Result<Vec<NormalizedItem>> {
        let resp: WeatherResponse =
            serde_json::from_str(body).context("parsing OpenWeatherMap json")?;

        let condition = resp.weather.first();
        let timestamp = resp.dt.and_then(|dt| DateTime::from_timestamp(dt, 0));
        let (Some(condition), Some(main), Some(city_id), Some(timestamp)) =
            (condition, resp.main, resp.id, timestamp)
        else {
            tracing::warn!(target: "upstream", source = SOURCE_ID, location = query, "incomplete weather data received");
            return Ok(Vec::new());
        };

        Ok(vec![NormalizedItem {
            source: SOURCE_ID.to_string(),
            title: format!("Weather in {}: {}, {}°C", query, condition.main, main.temp),
            url: format!("https://openweathermap.org/city/{city_id}"),
            timestamp,
        }])
    }
}
