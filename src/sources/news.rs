// src/sources/news.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::normalize_title;
use super::types::{NormalizedItem, Provider};
use crate::transport::HttpRequest;

pub const SOURCE_ID: &str = "NewsAPI";
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2/top-headlines";
pub const DEFAULT_QUERY: &str = "tech";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    url: Option<String>,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
}

/// NewsAPI top headlines.
#[derive(Debug, Clone)]
pub struct NewsProvider {
    base_url: String,
    api_key: String,
    default_query: String,
}

impl NewsProvider {
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

impl Provider for NewsProvider {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn default_query(&self) -> &str {
        &self.default_query
    }

    fn build_request(&self, query: &str) -> Result<HttpRequest> {
        let url = reqwest::Url::parse_with_params(&self.base_url, &[("q", query)])
            .with_context(|| format!("building NewsAPI url from {}", self.base_url))?;
        // Key goes in a header so it never shows up in URLs or logs.
        Ok(HttpRequest::get(url.as_str()).with_header("X-Api-Key", self.api_key.as_str()))
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<NormalizedItem>> {
        let resp: NewsResponse = serde_json::from_str(body).context("parsing NewsAPI json")?;

        let mut out = Vec::with_capacity(resp.articles.len());
        for a in resp.articles {
            let (Some(title), Some(url), Some(ts)) = (a.title, a.url, a.published_at) else {
                continue;
            };
            let title = normalize_title(&title);
            if title.is_empty() || url.trim().is_empty() {
                continue;
            }
            out.push(NormalizedItem {
                source: SOURCE_ID.to_string(),
                title,
                url,
                timestamp: ts,
            });
        }
        Ok(out)
    }
}
