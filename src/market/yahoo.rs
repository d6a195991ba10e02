//! Yahoo Finance client
//!
//! Reads the public quoteSummary and chart endpoints. Yahoo wraps most
//! numbers in `{ "raw": ..., "fmt": ... }` envelopes; values are unwrapped to
//! their raw form before they reach the tool layer.

use crate::error::AssistantError;
use crate::market::{BalanceSheet, Bar, MarketData};
use crate::Result;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";
const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

const PROFILE_MODULES: &str = "assetProfile,price,summaryDetail,defaultKeyStatistics,financialData";

pub struct YahooFinanceClient {
    client: Client,
    quote_summary_url: String,
    chart_url: String,
}

impl YahooFinanceClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible; ai-investment-assistant)")
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            quote_summary_url: QUOTE_SUMMARY_URL.to_string(),
            chart_url: CHART_URL.to_string(),
        })
    }

    async fn quote_summary(&self, symbol: &str, modules: &str) -> Result<Value> {
        let url = format!("{}/{}", self.quote_summary_url, symbol);
        debug!(%symbol, %modules, "Yahoo quoteSummary");

        let response = self
            .client
            .get(&url)
            .query(&[("modules", modules)])
            .send()
            .await
            .map_err(|e| AssistantError::MarketData(format!("Request failed for {}: {}", symbol, e)))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::MarketData(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::MarketData(format!(
                "Yahoo returned {} for {}: {}",
                status, symbol, body
            )));
        }

        body.pointer("/quoteSummary/result/0")
            .cloned()
            .ok_or_else(|| {
                AssistantError::MarketData(format!("No quoteSummary result for {}", symbol))
            })
    }
}

/// Unwrap Yahoo's `{ raw, fmt }` number envelope to the raw value
fn unwrap_raw(value: &Value) -> Value {
    match value {
        Value::Object(map) => match map.get("raw") {
            Some(raw) => raw.clone(),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

/// Flatten one module's fields into the target map, unwrapping envelopes
fn flatten_module(target: &mut Map<String, Value>, module: &Value) {
    if let Some(fields) = module.as_object() {
        for (key, value) in fields {
            target.insert(key.clone(), unwrap_raw(value));
        }
    }
}

#[async_trait::async_trait]
impl MarketData for YahooFinanceClient {
    async fn company_profile(&self, symbol: &str) -> Result<Map<String, Value>> {
        let result = self.quote_summary(symbol, PROFILE_MODULES).await?;

        let mut info = Map::new();
        for module in PROFILE_MODULES.split(',') {
            if let Some(section) = result.get(module) {
                flatten_module(&mut info, section);
            }
        }
        Ok(info)
    }

    async fn price_targets(&self, symbol: &str) -> Result<Value> {
        let result = self.quote_summary(symbol, "financialData").await?;
        let data = result
            .get("financialData")
            .ok_or_else(|| AssistantError::MarketData(format!("No financialData for {}", symbol)))?;

        Ok(serde_json::json!({
            "current": unwrap_raw(data.get("currentPrice").unwrap_or(&Value::Null)),
            "low": unwrap_raw(data.get("targetLowPrice").unwrap_or(&Value::Null)),
            "high": unwrap_raw(data.get("targetHighPrice").unwrap_or(&Value::Null)),
            "mean": unwrap_raw(data.get("targetMeanPrice").unwrap_or(&Value::Null)),
            "median": unwrap_raw(data.get("targetMedianPrice").unwrap_or(&Value::Null)),
        }))
    }

    async fn recommendations(&self, symbol: &str) -> Result<Value> {
        let result = self.quote_summary(symbol, "recommendationTrend").await?;
        result
            .pointer("/recommendationTrend/trend")
            .cloned()
            .ok_or_else(|| {
                AssistantError::MarketData(format!("No recommendation trend for {}", symbol))
            })
    }

    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<Bar>> {
        let midnight = NaiveTime::MIN;
        let period1 = start.and_time(midnight).and_utc().timestamp();
        let period2 = end.and_time(midnight).and_utc().timestamp();

        let url = format!("{}/{}", self.chart_url, symbol);
        debug!(%symbol, %interval, period1, period2, "Yahoo chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", interval.to_string()),
            ])
            .send()
            .await
            .map_err(|e| AssistantError::MarketData(format!("Request failed for {}: {}", symbol, e)))?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::MarketData(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::MarketData(format!(
                "Yahoo returned {} for {}: {}",
                status, symbol, body
            )));
        }

        let result = body.pointer("/chart/result/0").ok_or_else(|| {
            AssistantError::MarketData(format!("No chart result for {}", symbol))
        })?;

        let timestamps = result
            .get("timestamp")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let quote = result
            .pointer("/indicators/quote/0")
            .cloned()
            .unwrap_or(Value::Null);

        let series = |key: &str| -> Vec<Value> {
            quote
                .get(key)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()
        };
        let opens = series("open");
        let highs = series("high");
        let lows = series("low");
        let closes = series("close");
        let volumes = series("volume");

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let timestamp = match ts.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)) {
                Some(t) => t,
                None => continue,
            };
            // Yahoo pads missing sessions with nulls; skip incomplete bars.
            let close = match closes.get(i).and_then(Value::as_f64) {
                Some(c) => c,
                None => continue,
            };
            bars.push(Bar {
                timestamp,
                open: opens.get(i).and_then(Value::as_f64).unwrap_or(close),
                high: highs.get(i).and_then(Value::as_f64).unwrap_or(close),
                low: lows.get(i).and_then(Value::as_f64).unwrap_or(close),
                close,
                volume: volumes.get(i).and_then(Value::as_u64).unwrap_or(0),
            });
        }
        Ok(bars)
    }

    async fn balance_sheet(&self, symbol: &str) -> Result<BalanceSheet> {
        let result = self.quote_summary(symbol, "balanceSheetHistory").await?;
        let statement = result
            .pointer("/balanceSheetHistory/balanceSheetStatements/0")
            .ok_or_else(|| {
                AssistantError::MarketData(format!("No balance sheet for {}", symbol))
            })?;

        let date = statement
            .pointer("/endDate/fmt")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut items = Map::new();
        if let Some(fields) = statement.as_object() {
            for (key, value) in fields {
                if key == "endDate" || key == "maxAge" {
                    continue;
                }
                items.insert(key.clone(), unwrap_raw(value));
            }
        }
        Ok(BalanceSheet { date, items })
    }
}
