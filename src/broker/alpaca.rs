//! Alpaca paper-trading REST client
//!
//! Synchronous request/response against the v2 API with a long-lived,
//! connection-pooled reqwest client. No retry or backoff: a failed call is
//! surfaced once and the model decides whether to try again.

use crate::broker::{Account, Brokerage, Clock, OrderRequest, Position};
use crate::error::AssistantError;
use crate::Result;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets/v2";

pub struct AlpacaClient {
    client: Client,
    base_url: String,
}

impl AlpacaClient {
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self> {
        Self::with_base_url(api_key, api_secret, PAPER_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, api_secret: &str, base_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "APCA-API-KEY-ID",
            HeaderValue::from_str(api_key)
                .map_err(|_| AssistantError::Config("Invalid ALPACA_API_KEY".to_string()))?,
        );
        headers.insert(
            "APCA-API-SECRET-KEY",
            HeaderValue::from_str(api_secret)
                .map_err(|_| AssistantError::Config("Invalid ALPACA_SECRET_KEY".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Alpaca GET");

        let response = self.client.get(&url).send().await.map_err(|e| {
            AssistantError::Brokerage(format!("Request failed for {}: {}", path, e))
        })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::Brokerage(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::Brokerage(format!(
                "Alpaca returned {} for {}: {}",
                status, path, body
            )));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Brokerage for AlpacaClient {
    async fn get_account(&self) -> Result<Account> {
        let body = self.get_json("/account").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn list_positions(&self) -> Result<Vec<Position>> {
        let body = self.get_json("/positions").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn get_position(&self, symbol: &str) -> Result<Option<Position>> {
        let url = format!("{}/positions/{}", self.base_url, symbol);

        let response = self.client.get(&url).send().await.map_err(|e| {
            AssistantError::Brokerage(format!("Request failed for position {}: {}", symbol, e))
        })?;

        // The broker answers 404 when the account holds no position.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::Brokerage(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::Brokerage(format!(
                "Alpaca returned {} for position {}: {}",
                status, symbol, body
            )));
        }
        Ok(Some(serde_json::from_value(body)?))
    }

    async fn get_clock(&self) -> Result<Clock> {
        let body = self.get_json("/clock").await?;
        Ok(serde_json::from_value(body)?)
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<Value> {
        let url = format!("{}/orders", self.base_url);
        debug!(symbol = %order.symbol, qty = order.qty, side = %order.side, "Alpaca submit order");

        let response = self
            .client
            .post(&url)
            .json(order)
            .send()
            .await
            .map_err(|e| AssistantError::Brokerage(format!("Order submission failed: {}", e)))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::Brokerage(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::Brokerage(format!(
                "Alpaca rejected order: {} {}",
                status, body
            )));
        }
        Ok(body)
    }
}
