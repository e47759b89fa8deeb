//! Alpha Vantage market data client
//!
//! GLOBAL_QUOTE for prices, NEWS_SENTIMENT for headlines.

use crate::config::Config;
use crate::error::AssistantError;
use crate::market::{MarketDataProvider, MAX_NEWS_ITEMS};
use crate::models::{NewsItem, StockQuote};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub struct AlphaVantageClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.credentials.alpha_vantage_api_key.clone(),
            &config.market_base_url,
        )
    }

    async fn get_json(&self, function: &str, params: &[(&str, &str)]) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("function", function), ("apikey", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            .map_err(|e| {
                AssistantError::MarketData(format!("{} request failed: {}", function, e))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::MarketData(format!("Invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::MarketData(format!(
                "{} returned {}: {}",
                function, status, body
            )));
        }

        // Throttled or rejected calls still answer 200 with a notice instead of data
        if let Some(notice) = body.get("Note").or_else(|| body.get("Information")) {
            warn!(function, "Alpha Vantage notice: {}", notice);
        }

        Ok(body)
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn quote(&self, ticker: &str) -> Result<StockQuote> {
        debug!(ticker, "Fetching quote");
        let body = self.get_json("GLOBAL_QUOTE", &[("symbol", ticker)]).await?;
        parse_global_quote(&body, ticker)
    }

    async fn news(&self, ticker: &str) -> Result<Vec<NewsItem>> {
        debug!(ticker, "Fetching news");
        let body = self.get_json("NEWS_SENTIMENT", &[("tickers", ticker)]).await?;
        parse_news_feed(&body, ticker)
    }
}

fn quote_field<'a>(quote: &'a Value, key: &str) -> Result<&'a str> {
    quote
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| AssistantError::MarketData(format!("Quote is missing '{}'", key)))
}

fn parse_number<T: std::str::FromStr>(quote: &Value, key: &str) -> Result<T> {
    let raw = quote_field(quote, key)?;
    raw.parse::<T>()
        .map_err(|_| AssistantError::MarketData(format!("Malformed '{}': {}", key, raw)))
}

/// Map a GLOBAL_QUOTE body to a quote; an absent or empty quote is `NoData`
pub(crate) fn parse_global_quote(body: &Value, ticker: &str) -> Result<StockQuote> {
    let quote = match body.get("Global Quote") {
        Some(Value::Object(map)) if !map.is_empty() => &body["Global Quote"],
        _ => return Err(AssistantError::NoData(ticker.to_string())),
    };

    Ok(StockQuote {
        symbol: ticker.to_uppercase(),
        price: parse_number(quote, "05. price")?,
        change: parse_number(quote, "09. change")?,
        change_percent: quote_field(quote, "10. change percent")?.to_string(),
        volume: parse_number(quote, "06. volume")?,
        latest_trading_day: quote_field(quote, "07. latest trading day")?.to_string(),
    })
}

/// Map a NEWS_SENTIMENT body to at most [`MAX_NEWS_ITEMS`] items
pub(crate) fn parse_news_feed(body: &Value, ticker: &str) -> Result<Vec<NewsItem>> {
    let feed = body
        .get("feed")
        .and_then(Value::as_array)
        .filter(|feed| !feed.is_empty())
        .ok_or_else(|| AssistantError::NoData(ticker.to_string()))?;

    let text = |item: &Value, key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    Ok(feed
        .iter()
        .take(MAX_NEWS_ITEMS)
        .map(|item| NewsItem {
            title: text(item, "title"),
            summary: text(item, "summary"),
            source: text(item, "source"),
            url: text(item, "url"),
            time_published: text(item, "time_published"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_global_quote() {
        let body = json!({
            "Global Quote": {
                "01. symbol": "IBM",
                "05. price": "168.2200",
                "06. volume": "3281549",
                "07. latest trading day": "2024-05-10",
                "09. change": "1.1400",
                "10. change percent": "0.6823%"
            }
        });

        let quote = parse_global_quote(&body, "ibm").unwrap();
        assert_eq!(quote.symbol, "IBM");
        assert!((quote.price - 168.22).abs() < 1e-9);
        assert_eq!(quote.volume, 3_281_549);
        assert_eq!(quote.change_percent, "0.6823%");
    }

    #[test]
    fn test_empty_quote_is_no_data() {
        let body = json!({ "Global Quote": {} });
        assert!(matches!(
            parse_global_quote(&body, "ZZZZ"),
            Err(AssistantError::NoData(ref t)) if t == "ZZZZ"
        ));

        let throttled = json!({ "Note": "Thank you for using Alpha Vantage!" });
        assert!(matches!(
            parse_global_quote(&throttled, "IBM"),
            Err(AssistantError::NoData(_))
        ));
    }

    #[test]
    fn test_malformed_price_is_error() {
        let body = json!({
            "Global Quote": {
                "05. price": "n/a",
                "06. volume": "1",
                "07. latest trading day": "2024-05-10",
                "09. change": "0",
                "10. change percent": "0%"
            }
        });
        assert!(matches!(
            parse_global_quote(&body, "IBM"),
            Err(AssistantError::MarketData(_))
        ));
    }

    #[test]
    fn test_news_feed_truncated() {
        let items: Vec<Value> = (0..5)
            .map(|i| {
                json!({
                    "title": format!("Headline {}", i),
                    "summary": "...",
                    "source": "Newswire",
                    "url": format!("https://example.com/{}", i),
                    "time_published": "20240510T120000"
                })
            })
            .collect();

        let news = parse_news_feed(&json!({ "feed": items }), "AAPL").unwrap();
        assert_eq!(news.len(), MAX_NEWS_ITEMS);
        assert_eq!(news[0].title, "Headline 0");
        assert_eq!(news[2].time_published, "20240510T120000");

        assert!(matches!(
            parse_news_feed(&json!({ "feed": [] }), "AAPL"),
            Err(AssistantError::NoData(_))
        ));
    }
}
