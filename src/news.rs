//! News search seam and Tavily client
//!
//! Keyword search restricted to a fixed allow-list of finance domains.

use crate::error::AssistantError;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

/// Only results from these domains are returned
pub const FINANCE_NEWS_DOMAINS: &[&str] = &["finance.yahoo.com", "reuters.com", "bloomberg.com"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub content: String,
}

#[async_trait::async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsArticle>>;
}

pub struct TavilyClient {
    client: Client,
    api_key: String,
    search_url: String,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    include_domains: &'a [&'a str],
    max_results: usize,
}

#[derive(Deserialize)]
struct SearchResponse {
    results: Vec<NewsArticle>,
}

impl TavilyClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            search_url: TAVILY_SEARCH_URL.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl NewsSearch for TavilyClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NewsArticle>> {
        debug!(%query, max_results, "Tavily search");

        let request = SearchRequest {
            api_key: &self.api_key,
            query,
            search_depth: "advanced",
            include_domains: FINANCE_NEWS_DOMAINS,
            max_results,
        };

        let response = self
            .client
            .post(&self.search_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AssistantError::NewsSearch(format!("Search request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::NewsSearch(format!(
                "Tavily returned {}: {}",
                status, body
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::NewsSearch(format!("Invalid JSON response: {}", e)))?;

        Ok(parsed.results)
    }
}
