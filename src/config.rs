//! Runtime configuration
//!
//! Values come from the process environment (optionally seeded from `.env`).
//! The three credentials are mandatory; everything else has a default.

use crate::agent::{FanOut, StrategyKind};
use crate::error::AssistantError;
use crate::Result;
use std::fmt;
use std::str::FromStr;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ALPHA_VANTAGE_API_KEY: &str = "ALPHA_VANTAGE_API_KEY";
pub const HELICONE_API_KEY: &str = "HELICONE_API_KEY";

const DEFAULT_BASE_URL: &str = "https://oai.helicone.ai/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_MARKET_BASE_URL: &str = "https://www.alphavantage.co/query";

/// Upper bound for `ASSISTANT_HISTORY_EXCHANGES`
pub const MAX_HISTORY_EXCHANGES: usize = 1000;

/// API keys required at startup
#[derive(Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub alpha_vantage_api_key: String,
    pub helicone_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"***")
            .field("alpha_vantage_api_key", &"***")
            .field("helicone_api_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub embedding_model: String,
    pub market_base_url: String,
    pub strategy: StrategyKind,
    pub fan_out: FanOut,
    pub max_rounds: u32,
    pub history_exchanges: usize,
    pub api_port: u16,
}

impl Config {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let require = |key: &str| {
            get(key).ok_or_else(|| AssistantError::MissingCredential(key.to_string()))
        };

        let credentials = Credentials {
            openai_api_key: require(OPENAI_API_KEY)?,
            alpha_vantage_api_key: require(ALPHA_VANTAGE_API_KEY)?,
            helicone_api_key: require(HELICONE_API_KEY)?,
        };

        let api_port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => 8080,
        };

        let history_exchanges = parse_or(
            "ASSISTANT_HISTORY_EXCHANGES",
            get("ASSISTANT_HISTORY_EXCHANGES"),
            4usize,
        )?;
        if history_exchanges > MAX_HISTORY_EXCHANGES {
            return Err(AssistantError::Config(format!(
                "ASSISTANT_HISTORY_EXCHANGES={}: must be at most {}",
                history_exchanges, MAX_HISTORY_EXCHANGES
            )));
        }

        Ok(Self {
            credentials,
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model: get("ASSISTANT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or("ASSISTANT_TEMPERATURE", get("ASSISTANT_TEMPERATURE"), 0.1)?,
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            market_base_url: get("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_MARKET_BASE_URL.to_string()),
            strategy: parse_or("ASSISTANT_STRATEGY", get("ASSISTANT_STRATEGY"), StrategyKind::AgentLoop)?,
            fan_out: parse_or("ASSISTANT_FAN_OUT", get("ASSISTANT_FAN_OUT"), FanOut::All)?,
            max_rounds: parse_or("ASSISTANT_MAX_ROUNDS", get("ASSISTANT_MAX_ROUNDS"), 8u32)?.max(1),
            history_exchanges,
            api_port,
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AssistantError::Config(format!("{}={:?}: {}", key, raw, e)))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const KEYS: [(&str, &str); 3] = [
        (OPENAI_API_KEY, "sk-test"),
        (ALPHA_VANTAGE_API_KEY, "av-test"),
        (HELICONE_API_KEY, "hc-test"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&KEYS)).unwrap();
        assert_eq!(config.model, "gpt-3.5-turbo");
        assert_eq!(config.max_rounds, 8);
        assert_eq!(config.history_exchanges, 4);
        assert_eq!(config.strategy, StrategyKind::AgentLoop);
        assert_eq!(config.fan_out, FanOut::All);
        assert_eq!(config.api_port, 8080);
    }

    #[test]
    fn test_missing_credential_is_named() {
        let err = Config::from_lookup(lookup(&KEYS[..2])).unwrap_err();
        assert!(matches!(err, AssistantError::MissingCredential(ref k) if k == HELICONE_API_KEY));
        assert_eq!(err.to_string(), "HELICONE_API_KEY not found in environment variables");
    }

    #[test]
    fn test_blank_credential_counts_as_missing() {
        let mut pairs = KEYS.to_vec();
        pairs[0] = (OPENAI_API_KEY, "   ");
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, AssistantError::MissingCredential(ref k) if k == OPENAI_API_KEY));
    }

    #[test]
    fn test_overrides_and_bad_values() {
        let mut pairs = KEYS.to_vec();
        pairs.push(("ASSISTANT_STRATEGY", "routed"));
        pairs.push(("ASSISTANT_FAN_OUT", "first"));
        pairs.push(("ASSISTANT_MAX_ROUNDS", "3"));
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.strategy, StrategyKind::Routed);
        assert_eq!(config.fan_out, FanOut::FirstOnly);
        assert_eq!(config.max_rounds, 3);

        pairs.push(("PORT", "not-a-port"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(AssistantError::Config(_))
        ));
    }

    #[test]
    fn test_history_exchanges_is_bounded() {
        let mut pairs = KEYS.to_vec();
        pairs.push(("ASSISTANT_HISTORY_EXCHANGES", "1000"));
        assert_eq!(Config::from_lookup(lookup(&pairs)).unwrap().history_exchanges, MAX_HISTORY_EXCHANGES);

        let max = usize::MAX.to_string();
        for raw in ["1001", max.as_str()] {
            let mut pairs = KEYS.to_vec();
            pairs.push(("ASSISTANT_HISTORY_EXCHANGES", raw));
            assert!(matches!(
                Config::from_lookup(lookup(&pairs)),
                Err(AssistantError::Config(ref msg)) if msg.contains("at most 1000")
            ));
        }
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = Config::from_lookup(lookup(&KEYS)).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("sk-test"));
    }
}
