//! Market data seam
//!
//! Ticker info, historical bars, analyst figures and balance sheets come from
//! an external market-data provider behind this trait.

use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod yahoo;
pub use yahoo::YahooFinanceClient;

/// One OHLCV bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Most recent balance-sheet column: reporting date plus line items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub date: String,
    pub items: Map<String, Value>,
}

#[async_trait::async_trait]
pub trait MarketData: Send + Sync {
    /// Flat map of company info fields (profile, key statistics, ratios)
    async fn company_profile(&self, symbol: &str) -> Result<Map<String, Value>>;

    /// Analyst price targets (low/high/mean/median plus current price)
    async fn price_targets(&self, symbol: &str) -> Result<Value>;

    /// Analyst recommendation trend
    async fn recommendations(&self, symbol: &str) -> Result<Value>;

    /// Historical OHLCV bars for the requested window and interval
    async fn price_history(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
        interval: &str,
    ) -> Result<Vec<Bar>>;

    /// Most recent annual balance-sheet statement
    async fn balance_sheet(&self, symbol: &str) -> Result<BalanceSheet>;
}
