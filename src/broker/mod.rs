//! Brokerage seam
//!
//! The paper-trading broker is an external collaborator; everything the tool
//! layer needs from it sits behind this trait so tests can substitute a fake
//! without patching process globals.

use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod alpaca;
pub use alpaca::AlpacaClient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Case-insensitive parse of the two recognized sides
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "buy" => Some(OrderSide::Buy),
            "sell" => Some(OrderSide::Sell),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// Title-cased form used in order confirmation messages
    pub fn title(&self) -> &'static str {
        match self {
            OrderSide::Buy => "Buy",
            OrderSide::Sell => "Sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub qty: u32,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: String,
    pub time_in_force: String,
}

impl OrderRequest {
    /// Market order, good until cancelled — the only kind this assistant places
    pub fn market_gtc(symbol: impl Into<String>, qty: u32, side: OrderSide) -> Self {
        Self {
            symbol: symbol.into(),
            qty,
            side,
            order_type: "market".to_string(),
            time_in_force: "gtc".to_string(),
        }
    }
}

/// Account summary. The broker reports monetary fields as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub cash: String,
    pub buying_power: String,
    pub portfolio_value: String,
    pub equity: String,
}

/// An open position with cost-basis and current valuation fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub qty: String,
    pub avg_entry_price: String,
    pub current_price: String,
    pub market_value: String,
    pub unrealized_pl: String,
    /// Unrealized P&L as a fraction of cost basis, e.g. "0.0625"
    pub unrealized_plpc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clock {
    pub is_open: bool,
}

#[async_trait::async_trait]
pub trait Brokerage: Send + Sync {
    async fn get_account(&self) -> Result<Account>;

    async fn list_positions(&self) -> Result<Vec<Position>>;

    /// `Ok(None)` when the account holds no position in the symbol;
    /// `Err` is reserved for transport or broker failures.
    async fn get_position(&self, symbol: &str) -> Result<Option<Position>>;

    async fn get_clock(&self) -> Result<Clock>;

    /// Submit an order and return the broker's raw order payload
    async fn submit_order(&self, order: &OrderRequest) -> Result<Value>;
}
