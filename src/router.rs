//! Query router
//!
//! Classifies a query into exactly one lane before any capability runs.
//! Classification is delegated to the reasoning engine with a constrained
//! JSON answer; anything unusable falls back to the definition lane.

use crate::llm::ReasoningEngine;
use crate::models::{Message, ModelResponse, RouteDecision};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

const ROUTER_PROMPT: &str = r#"You classify questions for a financial research assistant.

Answer with JSON only, no prose:
{"lane": "data", "ticker": "<SYMBOL>"}  when the question asks for a specific stock's price, performance or news
{"lane": "definition", "ticker": null}   when the question asks what a financial term or concept means

Use the exchange ticker symbol (e.g. AAPL for Apple Inc.)."#;

#[derive(Debug, Deserialize)]
struct RawDecision {
    lane: String,
    #[serde(default)]
    ticker: Option<String>,
}

pub struct QueryRouter {
    engine: Arc<dyn ReasoningEngine>,
}

impl QueryRouter {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self { engine }
    }

    /// Never fails; engine errors and malformed answers route to the definition lane
    pub async fn route(&self, query: &str) -> RouteDecision {
        let messages = [Message::system(ROUTER_PROMPT), Message::user(query)];

        let raw = match self.engine.respond(&messages, &[]).await {
            Ok(ModelResponse::Final(text)) => text,
            Ok(ModelResponse::Invoke { text, .. }) => text.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Router classification failed, using definition lane");
                return RouteDecision::DefinitionLane;
            }
        };

        let decision = parse_decision(&raw).unwrap_or_else(|| {
            warn!(raw = %raw, "Unparsable router answer, using definition lane");
            RouteDecision::DefinitionLane
        });

        info!(lane = %decision, "Query routed");
        decision
    }
}

fn parse_decision(response: &str) -> Option<RouteDecision> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let raw: RawDecision = serde_json::from_str(cleaned).ok()?;

    match raw.lane.trim().to_ascii_lowercase().as_str() {
        "data" => {
            let ticker = raw
                .ticker
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'))?;
            Some(RouteDecision::DataLane { ticker })
        }
        "definition" => Some(RouteDecision::DefinitionLane),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::ScriptedEngine;

    async fn route_with(answer: &str) -> RouteDecision {
        QueryRouter::new(Arc::new(ScriptedEngine::finals([answer])))
            .route("How is Apple doing?")
            .await
    }

    #[tokio::test]
    async fn test_data_lane() {
        assert_eq!(
            route_with(r#"{"lane": "data", "ticker": "aapl"}"#).await,
            RouteDecision::DataLane { ticker: "AAPL".to_string() }
        );
    }

    #[tokio::test]
    async fn test_fenced_answer() {
        let answer = "```json\n{\"lane\": \"definition\", \"ticker\": null}\n```";
        assert_eq!(route_with(answer).await, RouteDecision::DefinitionLane);
    }

    #[tokio::test]
    async fn test_unparsable_falls_back_to_definition() {
        assert_eq!(route_with("I think this is about stocks").await, RouteDecision::DefinitionLane);
        assert_eq!(route_with(r#"{"lane": "portfolio"}"#).await, RouteDecision::DefinitionLane);
        assert_eq!(route_with(r#"{"lane": "data", "ticker": null}"#).await, RouteDecision::DefinitionLane);
        assert_eq!(route_with(r#"{"lane": "data", "ticker": "   "}"#).await, RouteDecision::DefinitionLane);
    }

    #[tokio::test]
    async fn test_engine_error_falls_back_to_definition() {
        let engine = Arc::new(ScriptedEngine::new(vec![Err(AssistantError::Llm("timeout".to_string()))]));
        let router = QueryRouter::new(engine.clone());

        assert_eq!(router.route("What is EPS?").await, RouteDecision::DefinitionLane);
        assert_eq!(engine.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_classification_offers_no_capabilities() {
        let engine = Arc::new(ScriptedEngine::finals([r#"{"lane":"definition"}"#]));
        QueryRouter::new(engine.clone()).route("What is EPS?").await;

        let calls = engine.calls().await;
        assert!(calls[0].capabilities.is_empty());
        assert_eq!(calls[0].messages[1].text(), Some("What is EPS?"));
    }
}
