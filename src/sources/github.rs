// src/sources/github.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::normalize_title;
use super::types::{NormalizedItem, Provider};
use crate::transport::HttpRequest;

pub const SOURCE_ID: &str = "GitHub";
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/search/repositories";
pub const DEFAULT_QUERY: &str = "rust";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    full_name: Option<String>,
    html_url: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

/// GitHub repository search, most-starred first.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    base_url: String,
    token: Option<String>,
    default_query: String,
}

impl Default for GitHubProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubProvider {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
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

    /// Optional token; raises the search rate limit.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

impl Provider for GitHubProvider {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    fn default_query(&self) -> &str {
        &self.default_query
    }

    fn build_request(&self, query: &str) -> Result<HttpRequest> {
        let url =
            reqwest::Url::parse_with_params(&self.base_url, &[("q", query), ("sort", "stars")])
                .with_context(|| format!("building GitHub url from {}", self.base_url))?;
        let mut req =
            HttpRequest::get(url.as_str()).with_header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            req = req.with_header("Authorization", format!("Bearer {token}"));
        }
        Ok(req)
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<NormalizedItem>> {
        let resp: SearchResponse =
            serde_json::from_str(body).context("parsing GitHub search json")?;

        Ok(resp
            .items
            .into_iter()
            .filter_map(|repo| {
                let title = normalize_title(repo.full_name.as_deref()?);
                let url = repo.html_url?;
                if title.is_empty() {
                    return None;
                }
                Some(NormalizedItem {
                    source: SOURCE_ID.to_string(),
                    title,
                    url,
                    timestamp: repo.updated_at?,
                })
            })
            .collect())
    }
}
