//! Financial analyst tools: price targets, recommendations, fundamental
//! ratios and technical indicators

use crate::indicators::{ema, macd, rsi, sma};
use crate::market::MarketData;
use crate::models::{ToolInput, ToolOutput};
use crate::tools::{optional_str, require_str, Tool};
use crate::error::AssistantError;
use crate::Result;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Get analyst price targets for a stock
pub struct PriceTargetsTool {
    market: Arc<dyn MarketData>,
}

impl PriceTargetsTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for PriceTargetsTool {
    fn name(&self) -> &'static str {
        "get_analyst_price_targets"
    }

    fn description(&self) -> &'static str {
        "Get analyst price targets for a stock"
    }

    fn parameters(&self) -> Value {
        ticker_only_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        match self.market.price_targets(&ticker).await {
            Ok(targets) => Ok(ToolOutput::ok(targets)),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

/// Get analyst recommendations for a stock
pub struct RecommendationsTool {
    market: Arc<dyn MarketData>,
}

impl RecommendationsTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for RecommendationsTool {
    fn name(&self) -> &'static str {
        "get_recommendations"
    }

    fn description(&self) -> &'static str {
        "Get analyst recommendations for a stock"
    }

    fn parameters(&self) -> Value {
        ticker_only_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        match self.market.recommendations(&ticker).await {
            Ok(recommendations) => Ok(ToolOutput::ok(json!({
                "recommendations": recommendations
            }))),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

//
// ================= Fundamental analysis =================
//

const VALUATION_FIELDS: &[&str] = &[
    "trailingPE",
    "forwardPE",
    "priceToBook",
    "enterpriseToRevenue",
    "enterpriseToEbitda",
];
const PROFITABILITY_FIELDS: &[&str] = &[
    "returnOnEquity",
    "returnOnAssets",
    "grossMargins",
    "operatingMargins",
    "profitMargins",
];
const GROWTH_FIELDS: &[&str] = &["earningsQuarterlyGrowth", "revenueGrowth"];
const FINANCIAL_STRENGTH_FIELDS: &[&str] = &[
    "totalDebt",
    "debtToEquity",
    "currentRatio",
    "quickRatio",
    "totalCash",
    "totalAssets",
];
const CASH_FLOW_FIELDS: &[&str] = &["operatingCashflow", "freeCashflow"];

fn group(info: &Map<String, Value>, fields: &[&str]) -> Value {
    let mut out = Map::new();
    for field in fields {
        // Absent upstream fields map to null, never to a raised fault.
        out.insert(
            (*field).to_string(),
            info.get(*field).cloned().unwrap_or(Value::Null),
        );
    }
    Value::Object(out)
}

/// Grouped fundamental ratios: valuation, profitability, growth, financial
/// strength and cash flow
pub struct FundamentalAnalysisTool {
    market: Arc<dyn MarketData>,
}

impl FundamentalAnalysisTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for FundamentalAnalysisTool {
    fn name(&self) -> &'static str {
        "get_fundamental_analysis"
    }

    fn description(&self) -> &'static str {
        "Retrieve a grouped set of fundamental ratios: valuation, profitability, growth, financial strength and cash flow"
    }

    fn parameters(&self) -> Value {
        ticker_only_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        let info = match self.market.company_profile(&ticker).await {
            Ok(info) => info,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        Ok(ToolOutput::ok(json!({
            "valuation": group(&info, VALUATION_FIELDS),
            "profitability": group(&info, PROFITABILITY_FIELDS),
            "growth": group(&info, GROWTH_FIELDS),
            "financial_strength": group(&info, FINANCIAL_STRENGTH_FIELDS),
            "cash_flow": group(&info, CASH_FLOW_FIELDS),
        })))
    }
}

//
// ================= Technical analysis =================
//

const ALL_INDICATORS: &[&str] = &["SMA", "EMA", "RSI", "MACD"];

/// Build the indicator table for the requested families. Column values line
/// up index-for-index with the input bars, with nulls where a window is not
/// yet full.
fn compute_indicators(closes: &[f64], requested: &[String]) -> Map<String, Value> {
    let mut table = Map::new();
    let has = |name: &str| requested.iter().any(|r| r.eq_ignore_ascii_case(name));

    let optional_column = |values: Vec<Option<f64>>| -> Value {
        Value::Array(values.into_iter().map(|v| json!(v)).collect())
    };
    let column = |values: Vec<f64>| -> Value {
        Value::Array(values.into_iter().map(|v| json!(v)).collect())
    };

    if has("SMA") {
        table.insert("SMA_20".to_string(), optional_column(sma(closes, 20)));
    }
    if has("EMA") {
        table.insert("EMA_20".to_string(), column(ema(closes, 20)));
    }
    if has("RSI") {
        table.insert("RSI_14".to_string(), optional_column(rsi(closes, 14)));
    }
    if has("MACD") {
        let result = macd(closes, 12, 26, 9);
        table.insert("MACD".to_string(), column(result.line));
        table.insert("MACD_Signal".to_string(), column(result.signal));
        table.insert("MACD_Hist".to_string(), column(result.histogram));
    }
    table
}

fn parse_date(input: &ToolInput, key: &str) -> Result<NaiveDate> {
    let raw = require_str(input, key)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        AssistantError::InvalidToolInput(format!(
            "{}: '{}' must be a YYYY-MM-DD date, got '{}'",
            input.tool_name, key, raw
        ))
    })
}

/// Historical bars plus common technical indicators over the window
pub struct TechnicalAnalysisTool {
    market: Arc<dyn MarketData>,
}

impl TechnicalAnalysisTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for TechnicalAnalysisTool {
    fn name(&self) -> &'static str {
        "get_technical_analysis"
    }

    fn description(&self) -> &'static str {
        "Retrieve historical price data and compute technical indicators (SMA, EMA, RSI, MACD)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": { "type": "string", "description": "The stock ticker symbol" },
                "start_date": { "type": "string", "description": "Start of the time range (YYYY-MM-DD)" },
                "end_date": { "type": "string", "description": "End of the time range (YYYY-MM-DD)" },
                "interval": { "type": "string", "description": "Data interval ('1d', '1wk', '1mo'). Default '1d'" },
                "indicators": {
                    "type": "array",
                    "items": { "type": "string", "enum": ALL_INDICATORS },
                    "description": "Indicators to compute; omit for all of them"
                }
            },
            "required": ["ticker", "start_date", "end_date"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        let start = parse_date(input, "start_date")?;
        let end = parse_date(input, "end_date")?;
        let interval = optional_str(input, "interval").unwrap_or_else(|| "1d".to_string());

        let requested: Vec<String> = match input.parameters.get("indicators") {
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            // No selection means every indicator family.
            _ => ALL_INDICATORS.iter().map(|s| s.to_string()).collect(),
        };

        let bars = match self.market.price_history(&ticker, start, end, &interval).await {
            Ok(bars) => bars,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let closes: Vec<f64> = bars.iter().map(|bar| bar.close).collect();
        let indicators = compute_indicators(&closes, &requested);

        Ok(ToolOutput::ok(json!({
            "historical_prices": bars,
            "indicators": indicators,
        })))
    }
}

fn ticker_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": { "type": "string", "description": "The stock ticker symbol" }
        },
        "required": ["ticker"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::{BalanceSheet, Bar, MarketData};
    use chrono::{TimeZone, Utc};

    /// Canned market data: a fixed info map and five rising closes
    struct FakeMarketData {
        info: Map<String, Value>,
    }

    impl FakeMarketData {
        fn new(info: Value) -> Self {
            let info = info.as_object().cloned().unwrap_or_default();
            Self { info }
        }
    }

    #[async_trait::async_trait]
    impl MarketData for FakeMarketData {
        async fn company_profile(&self, _symbol: &str) -> Result<Map<String, Value>> {
            Ok(self.info.clone())
        }

        async fn price_targets(&self, _symbol: &str) -> Result<Value> {
            Ok(json!({ "current": 160.0, "low": 140.0, "high": 220.0, "mean": 185.5, "median": 190.0 }))
        }

        async fn recommendations(&self, _symbol: &str) -> Result<Value> {
            Ok(json!([{ "period": "0m", "strongBuy": 11, "buy": 21, "hold": 6, "sell": 0, "strongSell": 0 }]))
        }

        async fn price_history(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _interval: &str,
        ) -> Result<Vec<Bar>> {
            let closes = [100.0, 101.0, 102.0, 103.0, 104.0];
            Ok(closes
                .iter()
                .enumerate()
                .map(|(i, close)| Bar {
                    timestamp: Utc.with_ymd_and_hms(2024, 1, 2 + i as u32, 0, 0, 0).unwrap(),
                    open: close - 1.0,
                    high: close + 1.0,
                    low: close - 2.0,
                    close: *close,
                    volume: 1000 + i as u64 * 100,
                })
                .collect())
        }

        async fn balance_sheet(&self, _symbol: &str) -> Result<BalanceSheet> {
            Ok(BalanceSheet {
                date: "2023-09-30".to_string(),
                items: Map::new(),
            })
        }
    }

    fn ticker_input(tool_name: &str) -> ToolInput {
        ToolInput {
            tool_name: tool_name.to_string(),
            parameters: json!({ "ticker": "AAPL" }),
        }
    }

    #[tokio::test]
    async fn test_fundamental_analysis_has_all_five_groups() {
        // Only a few fields present; absent ones must map to null.
        let market = Arc::new(FakeMarketData::new(json!({
            "trailingPE": 31.2,
            "returnOnEquity": 1.6,
            "revenueGrowth": 0.02,
        })));
        let tool = FundamentalAnalysisTool::new(market);

        let result = tool
            .execute(&ticker_input("get_fundamental_analysis"))
            .await
            .unwrap();
        assert!(result.success);

        let groups = result.data.as_object().unwrap();
        assert_eq!(groups.len(), 5);
        for key in [
            "valuation",
            "profitability",
            "growth",
            "financial_strength",
            "cash_flow",
        ] {
            assert!(groups.contains_key(key), "missing group {}", key);
        }

        assert_eq!(
            result.data.pointer("/valuation/trailingPE"),
            Some(&json!(31.2))
        );
        assert_eq!(result.data.pointer("/valuation/forwardPE"), Some(&Value::Null));
        assert_eq!(result.data.pointer("/cash_flow/freeCashflow"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_technical_analysis_selected_indicators_only() {
        let market = Arc::new(FakeMarketData::new(json!({})));
        let tool = TechnicalAnalysisTool::new(market);

        let input = ToolInput {
            tool_name: "get_technical_analysis".to_string(),
            parameters: json!({
                "ticker": "AAPL",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
                "indicators": ["SMA", "RSI"],
            }),
        };
        let result = tool.execute(&input).await.unwrap();
        assert!(result.success);

        let indicators = result.data.get("indicators").and_then(Value::as_object).unwrap();
        assert!(indicators.contains_key("SMA_20"));
        assert!(indicators.contains_key("RSI_14"));
        assert!(!indicators.contains_key("EMA_20"));
        assert!(!indicators.contains_key("MACD"));
        assert!(!indicators.contains_key("MACD_Signal"));

        // Five bars, so both columns are all nulls but full length.
        let sma_column = indicators.get("SMA_20").and_then(Value::as_array).unwrap();
        assert_eq!(sma_column.len(), 5);
        assert!(sma_column.iter().all(Value::is_null));

        let prices = result
            .data
            .get("historical_prices")
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(prices.len(), 5);
    }

    #[tokio::test]
    async fn test_technical_analysis_defaults_to_all_indicators() {
        let market = Arc::new(FakeMarketData::new(json!({})));
        let tool = TechnicalAnalysisTool::new(market);

        let input = ToolInput {
            tool_name: "get_technical_analysis".to_string(),
            parameters: json!({
                "ticker": "AAPL",
                "start_date": "2024-01-01",
                "end_date": "2024-01-31",
            }),
        };
        let result = tool.execute(&input).await.unwrap();
        assert!(result.success);

        let indicators = result.data.get("indicators").and_then(Value::as_object).unwrap();
        for column in ["SMA_20", "EMA_20", "RSI_14", "MACD", "MACD_Signal", "MACD_Hist"] {
            assert!(indicators.contains_key(column), "missing column {}", column);
        }
    }

    #[tokio::test]
    async fn test_technical_analysis_rejects_bad_date() {
        let market = Arc::new(FakeMarketData::new(json!({})));
        let tool = TechnicalAnalysisTool::new(market);

        let input = ToolInput {
            tool_name: "get_technical_analysis".to_string(),
            parameters: json!({
                "ticker": "AAPL",
                "start_date": "January 1st",
                "end_date": "2024-01-31",
            }),
        };
        assert!(tool.execute(&input).await.is_err());
    }

    #[tokio::test]
    async fn test_price_targets_and_recommendations() {
        let market = Arc::new(FakeMarketData::new(json!({})));

        let targets = PriceTargetsTool::new(market.clone())
            .execute(&ticker_input("get_analyst_price_targets"))
            .await
            .unwrap();
        assert!(targets.success);
        assert_eq!(targets.data.get("mean"), Some(&json!(185.5)));

        let recs = RecommendationsTool::new(market)
            .execute(&ticker_input("get_recommendations"))
            .await
            .unwrap();
        assert!(recs.success);
        assert!(recs.data.get("recommendations").and_then(Value::as_array).is_some());
    }
}
