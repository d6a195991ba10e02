//! Portfolio manager tools: order placement and portfolio state

use crate::broker::{Brokerage, OrderRequest, OrderSide};
use crate::error::AssistantError;
use crate::models::{ToolInput, ToolOutput};
use crate::tools::{require_str, require_u64, Tool};
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Place a buy or sell market order for a given stock
pub struct PlaceOrderTool {
    broker: Arc<dyn Brokerage>,
}

impl PlaceOrderTool {
    pub fn new(broker: Arc<dyn Brokerage>) -> Self {
        Self { broker }
    }
}

#[async_trait::async_trait]
impl Tool for PlaceOrderTool {
    fn name(&self) -> &'static str {
        "place_order"
    }

    fn description(&self) -> &'static str {
        "Place a buy or sell market order for a given stock"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "symbol": { "type": "string", "description": "The stock ticker (e.g., \"AAPL\")" },
                "qty": { "type": "integer", "description": "Number of shares to trade" },
                "side": { "type": "string", "description": "Either 'buy' or 'sell'" }
            },
            "required": ["symbol", "qty", "side"]
        })
    }

    async fn execute(&self, input: &ToolInput) -> Result<ToolOutput> {
        let symbol = require_str(input, "symbol")?;
        let qty: u32 = require_u64(input, "qty")?.try_into().map_err(|_| {
            AssistantError::InvalidToolInput(format!(
                "{}: 'qty' is out of range",
                input.tool_name
            ))
        })?;
        let side_raw = require_str(input, "side")?;

        let side = match OrderSide::parse(&side_raw) {
            Some(side) => side,
            None => return Ok(ToolOutput::error("Invalid side. Use 'buy' or 'sell'.")),
        };

        let clock = match self.broker.get_clock().await {
            Ok(clock) => clock,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        if !clock.is_open {
            return Ok(ToolOutput::error("Market is closed. Cannot place orders."));
        }

        if side == OrderSide::Sell {
            match self.broker.get_position(&symbol).await {
                Ok(Some(position)) => {
                    let held = position.qty.parse::<i64>().unwrap_or(0);
                    if held < qty as i64 {
                        return Ok(ToolOutput::error(format!(
                            "Not enough shares to sell. You only have {}.",
                            position.qty
                        )));
                    }
                }
                Ok(None) => {
                    return Ok(ToolOutput::error(format!(
                        "No position found for {}.",
                        symbol
                    )))
                }
                Err(e) => return Ok(ToolOutput::error(e.to_string())),
            }
        }

        // The clock and position reads above race the live account between
        // check and submission; the broker remains the final arbiter and a
        // rejected order comes back as an error result like any other.
        let request = OrderRequest::market_gtc(&symbol, qty, side);
        match self.broker.submit_order(&request).await {
            Ok(order) => {
                info!(%symbol, qty, side = %side, "Order submitted");
                Ok(ToolOutput::ok(json!({
                    "status": "success",
                    "message": format!(
                        "{} order submitted for {} share(s) of {}",
                        side.title(), qty, symbol
                    ),
                    "order": order,
                })))
            }
            Err(e) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

/// Retrieve the current state of the paper-trading portfolio
pub struct PortfolioStateTool {
    broker: Arc<dyn Brokerage>,
}

impl PortfolioStateTool {
    pub fn new(broker: Arc<dyn Brokerage>) -> Self {
        Self { broker }
    }
}

#[async_trait::async_trait]
impl Tool for PortfolioStateTool {
    fn name(&self) -> &'static str {
        "get_portfolio_state"
    }

    fn description(&self) -> &'static str {
        "Retrieve the current state of the portfolio: cash, equity and open positions"
    }

    fn parameters(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _input: &ToolInput) -> Result<ToolOutput> {
        let account = match self.broker.get_account().await {
            Ok(account) => account,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };
        let positions = match self.broker.list_positions().await {
            Ok(positions) => positions,
            Err(e) => return Ok(ToolOutput::error(e.to_string())),
        };

        let positions: Vec<Value> = positions
            .iter()
            .map(|p| {
                let plpc = p.unrealized_plpc.parse::<f64>().unwrap_or(0.0);
                json!({
                    "symbol": p.symbol,
                    "qty": p.qty,
                    "avg_entry_price": p.avg_entry_price,
                    "current_price": p.current_price,
                    "market_value": p.market_value,
                    "unrealized_pl": p.unrealized_pl,
                    "unrealized_plpc": format!("{:.2}%", plpc * 100.0),
                })
            })
            .collect();

        Ok(ToolOutput::ok(json!({
            "cash": account.cash,
            "buying_power": account.buying_power,
            "portfolio_value": account.portfolio_value,
            "equity": account.equity,
            "positions": positions,
        })))
    }
}
