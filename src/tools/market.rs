//! Ticker-based market data capabilities

use crate::error::AssistantError;
use crate::market::MarketDataProvider;
use crate::tools::{Capability, CapabilitySchema, ParamType, ParametersSchema, GET_STOCK_DATA, GET_STOCK_NEWS};
use crate::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::error;

const TICKER_DESCRIPTION: &str = "The stock ticker symbol, e.g., AAPL for Apple Inc.";

fn ticker_schema(name: &str, description: &str) -> CapabilitySchema {
    CapabilitySchema::new(
        name,
        description,
        ParametersSchema::new().required("ticker", ParamType::String, TICKER_DESCRIPTION),
    )
}

/// Trimmed, upper-cased ticker from validated arguments
fn require_ticker(args: &Map<String, Value>) -> Result<String> {
    args.get("ticker")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AssistantError::InvalidToolInput("Expected a non-empty 'ticker'".to_string()))
}

pub struct StockDataCapability {
    schema: CapabilitySchema,
    provider: Arc<dyn MarketDataProvider>,
}

impl StockDataCapability {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            schema: ticker_schema(
                GET_STOCK_DATA,
                "Get current price and other market information for a specific stock by ticker symbol",
            ),
            provider,
        }
    }
}

#[async_trait::async_trait]
impl Capability for StockDataCapability {
    fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<Value> {
        let ticker = require_ticker(args)?;

        match self.provider.quote(&ticker).await {
            Ok(quote) => Ok(serde_json::to_value(quote)?),
            Err(AssistantError::NoData(_)) => Ok(json!({
                "error": format!("No data found for ticker {}", ticker)
            })),
            Err(e) => {
                error!(ticker = %ticker, error = %e, "Error fetching stock data");
                Ok(json!({
                    "error": format!("Failed to get stock data for {}", ticker)
                }))
            }
        }
    }
}

pub struct StockNewsCapability {
    schema: CapabilitySchema,
    provider: Arc<dyn MarketDataProvider>,
}

impl StockNewsCapability {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            schema: ticker_schema(
                GET_STOCK_NEWS,
                "Get the latest news articles for a specific stock by ticker symbol",
            ),
            provider,
        }
    }
}

#[async_trait::async_trait]
impl Capability for StockNewsCapability {
    fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<Value> {
        let ticker = require_ticker(args)?;

        match self.provider.news(&ticker).await {
            Ok(items) => Ok(serde_json::to_value(items)?),
            Err(AssistantError::NoData(_)) => Ok(json!({
                "error": format!("No news found for ticker {}", ticker)
            })),
            Err(e) => {
                error!(ticker = %ticker, error = %e, "Error fetching news");
                Ok(json!({
                    "error": format!("Failed to get news for {}", ticker)
                }))
            }
        }
    }
}
