//! Market data provider trait and implementations
//!
//! Providers return typed quotes/news or an error; turning errors into
//! `{error}` payloads is the capability layer's job.

use crate::models::{NewsItem, StockQuote};
use crate::Result;
use async_trait::async_trait;

pub mod alpha_vantage;
pub use alpha_vantage::AlphaVantageClient;

/// Maximum number of news items surfaced per ticker
pub const MAX_NEWS_ITEMS: usize = 3;

/// Trait for live market data lookups by ticker
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Latest quote. `AssistantError::NoData` when the provider knows nothing.
    async fn quote(&self, ticker: &str) -> Result<StockQuote>;

    /// Up to [`MAX_NEWS_ITEMS`] recent articles, newest first
    async fn news(&self, ticker: &str) -> Result<Vec<NewsItem>>;
}
