//! Company research tools: basic info, financial news, balance sheet and
//! quarterly reports

use crate::filings::FilingsDatabase;
use crate::market::MarketData;
use crate::models::{ToolInput, ToolOutput};
use crate::news::NewsSearch;
use crate::tools::{optional_u64, require_str, Tool};
use crate::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Curated subset of company profile fields exposed to the model
const BASIC_INFO_KEYS: &[&str] = &[
    "longName",
    "symbol",
    "companyOfficers",
    "market",
    "address1",
    "city",
    "state",
    "zip",
    "country",
    "phone",
    "website",
    "industry",
    "sector",
    "longBusinessSummary",
    "fullTimeEmployees",
];

const DEFAULT_NEWS_RESULTS: usize = 3;
const NEWS_CONTENT_PREVIEW_CHARS: usize = 200;

/// Get basic information about a company
pub struct BasicInfoTool {
    market: Arc<dyn MarketData>,
}

impl BasicInfoTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for BasicInfoTool {
    fn name(&self) -> &'static str {
        "get_basic_info"
    }

    fn description(&self) -> &'static str {
        "Get basic information about a company: overview, sector, key statistics"
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        let info = match self.market.company_profile(&ticker).await {
            Ok(info) => info,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let mut basic_info = Map::new();
        for key in BASIC_INFO_KEYS {
            let value = info.get(*key).cloned().unwrap_or(Value::Null);
            // The officer list is collapsed to its first (most senior) entry.
            let value = if *key == "companyOfficers" {
                match value {
                    Value::Array(officers) => {
                        officers.into_iter().next().unwrap_or(Value::Null)
                    }
                    other => other,
                }
            } else {
                value
            };
            basic_info.insert((*key).to_string(), value);
        }
        Ok(ToolOutput::ok(Value::Object(basic_info)))
    }
}

/// Search for the latest financial news about a company
pub struct NewsSearchTool {
    news: Arc<dyn NewsSearch>,
}

impl NewsSearchTool {
    pub fn new(news: Arc<dyn NewsSearch>) -> Self {
        Self { news }
    }
}

#[async_trait::async_trait]
impl Tool for NewsSearchTool {
    fn name(&self) -> &'static str {
        "search_financial_news"
    }

    fn description(&self) -> &'static str {
        "Search for the latest financial news about a company"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company_name": { "type": "string", "description": "The company to search news for" },
                "num_results": { "type": "integer", "description": "Number of results to fetch (default 3)" }
            },
            "required": ["company_name"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let company_name = require_str(input, "company_name")?;
        let num_results = optional_u64(input, "num_results")
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_NEWS_RESULTS);

        let query = format!("latest financial news {} stock market", company_name);
        let articles = match self.news.search(&query, num_results).await {
            Ok(articles) => articles,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let digest = articles
            .iter()
            .map(|article| {
                let preview: String = article
                    .content
                    .chars()
                    .take(NEWS_CONTENT_PREVIEW_CHARS)
                    .collect();
                format!("- {}: {}...", article.title, preview)
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ToolOutput::ok(json!({ "news": digest })))
    }
}

/// Get the most recent balance sheet of a company
pub struct BalanceSheetTool {
    market: Arc<dyn MarketData>,
}

impl BalanceSheetTool {
    pub fn new(market: Arc<dyn MarketData>) -> Self {
        Self { market }
    }
}

#[async_trait::async_trait]
impl Tool for BalanceSheetTool {
    fn name(&self) -> &'static str {
        "get_balance_sheet"
    }

    fn description(&self) -> &'static str {
        "Get the most recent balance sheet of a company"
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        match self.market.balance_sheet(&ticker).await {
            Ok(statement) => Ok(ToolOutput::ok(json!({
                "date": statement.date,
                "balance_sheet": statement.items,
            }))),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

/// Get the most recent quarterly report (10-Q) of a company
pub struct QuarterlyReportTool {
    filings: Arc<dyn FilingsDatabase>,
}

impl QuarterlyReportTool {
    pub fn new(filings: Arc<dyn FilingsDatabase>) -> Self {
        Self { filings }
    }
}

#[async_trait::async_trait]
impl Tool for QuarterlyReportTool {
    fn name(&self) -> &'static str {
        "get_quarterly_report"
    }

    fn description(&self) -> &'static str {
        "Get the text of the most recent quarterly report (10-Q) of a company"
    }

    fn parameters(&self) -> Value {
        ticker_schema()
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let ticker = require_str(input, "ticker")?;
        match self.filings.latest_quarterly_filing(&ticker).await {
            Ok(report) => Ok(ToolOutput::ok(json!({ "quarterly_report": report }))),
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

fn ticker_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "ticker": { "type": "string", "description": "The stock ticker symbol" }
        },
        "required": ["ticker"]
    })
}
