//! Orchestrator - drives one query from question to answer
//!
//! AWAIT MODEL → DISPATCH → AWAIT MODEL … → DONE
//!
//! The orchestrator is shared across sessions and holds no per-query mutable
//! state. Conversation state is only read here; the session commits the
//! exchange after `run` succeeds.

use crate::audit::InvocationRecord;
use crate::llm::ReasoningEngine;
use crate::memory::ConversationState;
use crate::models::{CapabilityInvocationRequest, CapabilityResult, Message, ModelResponse, RouteDecision};
use crate::router::QueryRouter;
use crate::tools::{CapabilityRegistry, CapabilitySchema, GET_STOCK_DATA, GET_STOCK_NEWS, SEARCH_GLOSSARY};
use crate::Result;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const SYSTEM_PROMPT: &str = "You're a financial assistant. Use tools when needed. \
If you have enough information to answer, reply normally.";

/// Returned when the round cap is hit while the engine still wants capabilities
pub const DEGRADED_ANSWER: &str = "I wasn't able to finish researching your question within the allowed number of steps. \
Please try asking a more specific question.";

/// Returned by the routed strategy when the glossary has nothing relevant
pub const NO_INFORMATION_ANSWER: &str = "I'm sorry, I don't have information about that in my knowledge base.";

pub const DEFAULT_MAX_ROUNDS: u32 = 8;

//
// ================= Policies =================
//

/// Orchestration strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Free multi-round loop; the engine decides when to stop
    AgentLoop,
    /// One capability-enabled call, one dispatch round, one answer call
    SinglePass,
    /// Router picks exactly one lane
    Routed,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "agent" | "agent-loop" => Ok(StrategyKind::AgentLoop),
            "single-pass" | "single" => Ok(StrategyKind::SinglePass),
            "routed" => Ok(StrategyKind::Routed),
            other => Err(format!("unknown strategy '{}' (expected agent, single-pass or routed)", other)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::AgentLoop => "agent",
            StrategyKind::SinglePass => "single-pass",
            StrategyKind::Routed => "routed",
        };
        f.write_str(name)
    }
}

/// What happens when the engine requests several invocations in one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FanOut {
    /// Dispatch every request concurrently, fold results in request order
    All,
    /// Dispatch only the first request; the rest are dropped
    FirstOnly,
}

impl FromStr for FanOut {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(FanOut::All),
            "first" | "first-only" => Ok(FanOut::FirstOnly),
            other => Err(format!("unknown fan-out '{}' (expected all or first)", other)),
        }
    }
}

impl fmt::Display for FanOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FanOut::All => f.write_str("all"),
            FanOut::FirstOnly => f.write_str("first"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LoopConfig {
    /// Upper bound on answer-producing engine calls per query
    pub max_rounds: u32,
    pub fan_out: FanOut,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            fan_out: FanOut::All,
        }
    }
}

//
// ================= Outcome =================
//

#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub answer: String,
    /// Full transcript including system prompt, history and invocation traffic
    pub transcript: Vec<Message>,
    pub invocations: Vec<InvocationRecord>,
    /// Engine calls made to produce the answer (router calls excluded)
    pub rounds: u32,
    /// True when the round cap stopped the loop
    pub degraded: bool,
    pub strategy: StrategyKind,
}

enum LoopState {
    AwaitingModel,
    Dispatching {
        text: Option<String>,
        requests: Vec<CapabilityInvocationRequest>,
    },
    Done { answer: String, degraded: bool },
}

/// Mutable per-query bookkeeping, owned by a single `run`
struct Turn {
    transcript: Vec<Message>,
    invocations: Vec<InvocationRecord>,
    rounds: u32,
}

impl Turn {
    fn new(query: &str, history: &ConversationState) -> Self {
        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(Message::system(SYSTEM_PROMPT));
        transcript.extend(history.iter().cloned());
        transcript.push(Message::user(query));

        Self {
            transcript,
            invocations: Vec::new(),
            rounds: 0,
        }
    }

    fn finish(self, answer: String, degraded: bool, strategy: StrategyKind) -> LoopOutcome {
        LoopOutcome {
            answer,
            transcript: self.transcript,
            invocations: self.invocations,
            rounds: self.rounds,
            degraded,
            strategy,
        }
    }
}

//
// ================= Orchestrator =================
//

pub struct Orchestrator {
    engine: Arc<dyn ReasoningEngine>,
    registry: Arc<CapabilityRegistry>,
    router: QueryRouter,
    schemas: Vec<CapabilitySchema>,
    strategy: StrategyKind,
    config: LoopConfig,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        registry: Arc<CapabilityRegistry>,
        strategy: StrategyKind,
        config: LoopConfig,
    ) -> Self {
        let schemas = registry.schemas();

        Self {
            router: QueryRouter::new(engine.clone()),
            engine,
            registry,
            schemas,
            strategy,
            config: LoopConfig {
                max_rounds: config.max_rounds.max(1),
                ..config
            },
        }
    }

    pub fn strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn config(&self) -> LoopConfig {
        self.config
    }

    /// Answer one query. `history` is read, never written.
    pub async fn run(&self, query: &str, history: &ConversationState) -> Result<LoopOutcome> {
        info!(
            strategy = %self.strategy,
            history = history.len(),
            query = %query,
            "Orchestrator: starting turn"
        );

        let turn = Turn::new(query, history);

        let outcome = match self.strategy {
            StrategyKind::AgentLoop => self.run_agent_loop(turn).await?,
            StrategyKind::SinglePass => self.run_single_pass(turn).await?,
            StrategyKind::Routed => self.run_routed(query, turn).await?,
        };

        info!(
            strategy = %outcome.strategy,
            rounds = outcome.rounds,
            invocations = outcome.invocations.len(),
            degraded = outcome.degraded,
            "Orchestrator: turn complete"
        );

        Ok(outcome)
    }

    // =============================
    // Strategies
    // =============================

    async fn run_agent_loop(&self, mut turn: Turn) -> Result<LoopOutcome> {
        let mut state = LoopState::AwaitingModel;

        loop {
            state = match state {
                LoopState::AwaitingModel => {
                    turn.rounds += 1;
                    debug!(round = turn.rounds, messages = turn.transcript.len(), "Awaiting model");

                    match self.engine.respond(&turn.transcript, &self.schemas).await? {
                        ModelResponse::Final(text) => LoopState::Done {
                            answer: text,
                            degraded: false,
                        },
                        ModelResponse::Invoke { text, requests } if requests.is_empty() => LoopState::Done {
                            answer: text.unwrap_or_default(),
                            degraded: false,
                        },
                        ModelResponse::Invoke { requests, .. } if turn.rounds >= self.config.max_rounds => {
                            warn!(
                                max_rounds = self.config.max_rounds,
                                pending = requests.len(),
                                "Round cap reached, returning degraded answer"
                            );
                            LoopState::Done {
                                answer: DEGRADED_ANSWER.to_string(),
                                degraded: true,
                            }
                        }
                        ModelResponse::Invoke { text, requests } => LoopState::Dispatching { text, requests },
                    }
                }
                LoopState::Dispatching { text, requests } => {
                    let requests = self.apply_fan_out(requests);
                    self.dispatch_round(&mut turn, text, requests).await;
                    LoopState::AwaitingModel
                }
                LoopState::Done { answer, degraded } => {
                    if !degraded {
                        turn.transcript.push(Message::assistant(answer.clone()));
                    }
                    return Ok(turn.finish(answer, degraded, StrategyKind::AgentLoop));
                }
            };
        }
    }

    async fn run_single_pass(&self, mut turn: Turn) -> Result<LoopOutcome> {
        turn.rounds += 1;

        let (text, requests) = match self.engine.respond(&turn.transcript, &self.schemas).await? {
            ModelResponse::Final(text) => {
                turn.transcript.push(Message::assistant(text.clone()));
                return Ok(turn.finish(text, false, StrategyKind::SinglePass));
            }
            ModelResponse::Invoke { text, requests } if requests.is_empty() => {
                let answer = text.unwrap_or_default();
                turn.transcript.push(Message::assistant(answer.clone()));
                return Ok(turn.finish(answer, false, StrategyKind::SinglePass));
            }
            ModelResponse::Invoke { text, requests } => (text, requests),
        };

        let requests = self.apply_fan_out(requests);
        self.dispatch_round(&mut turn, text, requests).await;

        let (answer, degraded) = self.answer_without_capabilities(&mut turn).await?;
        Ok(turn.finish(answer, degraded, StrategyKind::SinglePass))
    }

    async fn run_routed(&self, query: &str, mut turn: Turn) -> Result<LoopOutcome> {
        let decision = self.router.route(query).await;

        let requests = match &decision {
            RouteDecision::DataLane { ticker } => vec![
                synthesized_request(GET_STOCK_DATA, "ticker", ticker),
                synthesized_request(GET_STOCK_NEWS, "ticker", ticker),
            ],
            RouteDecision::DefinitionLane => vec![synthesized_request(SEARCH_GLOSSARY, "query", query)],
        };

        let results = self.dispatch_round(&mut turn, None, requests).await;

        if decision == RouteDecision::DefinitionLane && !results.iter().any(knowledge_found) {
            info!("No glossary match, answering without the engine");
            turn.transcript.push(Message::assistant(NO_INFORMATION_ANSWER));
            return Ok(turn.finish(NO_INFORMATION_ANSWER.to_string(), false, StrategyKind::Routed));
        }

        let (answer, degraded) = self.answer_without_capabilities(&mut turn).await?;
        Ok(turn.finish(answer, degraded, StrategyKind::Routed))
    }

    // =============================
    // Dispatch
    // =============================

    fn apply_fan_out(&self, mut requests: Vec<CapabilityInvocationRequest>) -> Vec<CapabilityInvocationRequest> {
        if self.config.fan_out == FanOut::FirstOnly && requests.len() > 1 {
            let dropped: Vec<String> = requests.drain(1..).map(|r| r.name).collect();
            warn!(
                kept = %requests[0].name,
                dropped = ?dropped,
                "Dropping extra invocation requests"
            );
        }
        requests
    }

    /// Record the request message, run every request concurrently and fold
    /// the results into the transcript in request order
    async fn dispatch_round(
        &self,
        turn: &mut Turn,
        text: Option<String>,
        requests: Vec<CapabilityInvocationRequest>,
    ) -> Vec<CapabilityResult> {
        let text = text.filter(|t| !t.trim().is_empty());
        turn.transcript.push(Message::invocations(text, requests.clone()));

        let timed = join_all(requests.iter().map(|request| async move {
            let arguments = Value::Object(request.arguments.clone());
            info!(capability = %request.name, arguments = %arguments, "Executing capability");
            let started = Instant::now();
            let result = self.registry.invoke(request).await;
            (result, started.elapsed().as_millis() as u64)
        }))
        .await;

        let mut results = Vec::with_capacity(timed.len());

        for (request, (result, elapsed_ms)) in requests.into_iter().zip(timed) {
            debug!(
                capability = %result.name,
                elapsed_ms,
                error = result.is_error(),
                "Capability returned"
            );

            turn.invocations.push(InvocationRecord {
                id: request.id,
                name: request.name,
                arguments: request.arguments,
                payload: result.payload.clone(),
                elapsed_ms,
            });
            turn.transcript.push(Message::tool_result(result.clone()));
            results.push(result);
        }

        results
    }

    /// Final engine call with no capabilities offered
    async fn answer_without_capabilities(&self, turn: &mut Turn) -> Result<(String, bool)> {
        turn.rounds += 1;

        match self.engine.respond(&turn.transcript, &[]).await? {
            ModelResponse::Final(text) | ModelResponse::Invoke { text: Some(text), .. } => {
                turn.transcript.push(Message::assistant(text.clone()));
                Ok((text, false))
            }
            ModelResponse::Invoke { text: None, .. } => {
                warn!("Engine requested capabilities when none were offered");
                Ok((DEGRADED_ANSWER.to_string(), true))
            }
        }
    }
}

fn synthesized_request(name: &str, key: &str, value: &str) -> CapabilityInvocationRequest {
    let mut arguments = Map::new();
    arguments.insert(key.to_string(), json!(value));
    CapabilityInvocationRequest::new(format!("call_{}", Uuid::new_v4().simple()), name, arguments)
}

fn knowledge_found(result: &CapabilityResult) -> bool {
    result.payload.get("found").and_then(Value::as_bool) == Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::llm::ScriptedEngine;
    use crate::models::{MessageContent, RetrievedDocument, Role};
    use crate::tools::{Capability, ParamType, ParametersSchema};
    use crate::tools::{KnowledgeSearchCapability, SEARCH_COMPANY_INFO};
    use crate::retrieval::RetrievalGate;
    use crate::vector::StaticIndex;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Ticker capability that echoes its name and the ticker it saw
    struct EchoTicker {
        schema: CapabilitySchema,
        calls: AtomicUsize,
        delay_ms: u64,
    }

    impl EchoTicker {
        fn new(name: &str, delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                schema: CapabilitySchema::new(
                    name,
                    "Echoes the ticker",
                    ParametersSchema::new().required("ticker", ParamType::String, "Ticker"),
                ),
                calls: AtomicUsize::new(0),
                delay_ms,
            })
        }
    }

    #[async_trait]
    impl Capability for EchoTicker {
        fn schema(&self) -> &CapabilitySchema {
            &self.schema
        }

        async fn invoke(&self, args: &Map<String, Value>) -> Result<Value> {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({"from": self.schema.name, "ticker": args["ticker"]}))
        }
    }

    fn ticker_request(id: &str, name: &str, ticker: &str) -> CapabilityInvocationRequest {
        let mut args = Map::new();
        args.insert("ticker".to_string(), json!(ticker));
        CapabilityInvocationRequest::new(id, name, args)
    }

    fn invoke(requests: Vec<CapabilityInvocationRequest>) -> Result<ModelResponse> {
        Ok(ModelResponse::Invoke { text: None, requests })
    }

    fn orchestrator(
        engine: Arc<ScriptedEngine>,
        registry: CapabilityRegistry,
        strategy: StrategyKind,
        config: LoopConfig,
    ) -> Orchestrator {
        Orchestrator::new(engine, Arc::new(registry), strategy, config)
    }

    fn echo_registry() -> (CapabilityRegistry, Arc<EchoTicker>, Arc<EchoTicker>) {
        let data = EchoTicker::new(GET_STOCK_DATA, 30);
        let news = EchoTicker::new(GET_STOCK_NEWS, 0);
        let mut registry = CapabilityRegistry::new();
        registry.register(data.clone());
        registry.register(news.clone());
        (registry, data, news)
    }

    fn glossary_registry(score: f32) -> CapabilityRegistry {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(KnowledgeSearchCapability::new(
            SEARCH_GLOSSARY,
            "Glossary",
            "Term",
            RetrievalGate::new(2, 0.7).with_subject("glossary entry"),
            Arc::new(StaticIndex::new(vec![
                RetrievedDocument::new("Bull Market: prices rising 20% or more.", score),
                RetrievedDocument::new("Bear Market: prices falling 20% or more.", score / 2.0),
            ])),
        )));
        registry
    }

    #[tokio::test]
    async fn test_direct_answer_is_one_engine_call() {
        let engine = Arc::new(ScriptedEngine::finals(["Hello! How can I help?"]));
        let orch = orchestrator(engine.clone(), echo_registry().0, StrategyKind::AgentLoop, LoopConfig::default());

        let outcome = orch.run("hi", &ConversationState::default()).await.unwrap();

        assert_eq!(outcome.answer, "Hello! How can I help?");
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.invocations.is_empty());
        assert_eq!(engine.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_history_sits_between_system_prompt_and_query() {
        let engine = Arc::new(ScriptedEngine::finals(["ok"]));
        let orch = orchestrator(engine.clone(), CapabilityRegistry::new(), StrategyKind::AgentLoop, LoopConfig::default());

        let mut history = ConversationState::default();
        history.commit_exchange("earlier question", "earlier answer");

        orch.run("new question", &history).await.unwrap();

        let calls = engine.calls().await;
        let texts: Vec<Option<&str>> = calls[0].messages.iter().map(Message::text).collect();
        assert_eq!(
            texts,
            vec![Some(SYSTEM_PROMPT), Some("earlier question"), Some("earlier answer"), Some("new question")]
        );
        // reading history never mutates it
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_stock_request_dispatches_and_folds_result() {
        let (registry, data, _) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![ticker_request("call_1", GET_STOCK_DATA, "AAPL")]),
            Ok(ModelResponse::Final("AAPL trades at 189.50.".to_string())),
        ]));
        let orch = orchestrator(engine.clone(), registry, StrategyKind::AgentLoop, LoopConfig::default());

        let outcome = orch.run("What's Apple's stock price?", &ConversationState::default()).await.unwrap();

        assert_eq!(data.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.invocations[0].arguments["ticker"], json!("AAPL"));

        let calls = engine.calls().await;
        let result = calls[1].messages.last().and_then(Message::as_tool_result).unwrap();
        assert_eq!(result.id, "call_1");
        assert_eq!(result.payload["ticker"], json!("AAPL"));
    }

    #[tokio::test]
    async fn test_commentary_with_requests_stays_in_transcript() {
        let (registry, _, _) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(vec![
            Ok(ModelResponse::Invoke {
                text: Some("Let me look that up.".to_string()),
                requests: vec![ticker_request("call_1", GET_STOCK_DATA, "MSFT")],
            }),
            Ok(ModelResponse::Invoke {
                text: Some("   ".to_string()),
                requests: vec![ticker_request("call_2", GET_STOCK_NEWS, "MSFT")],
            }),
            Ok(ModelResponse::Final("Done.".to_string())),
        ]));
        let orch = orchestrator(engine.clone(), registry, StrategyKind::AgentLoop, LoopConfig::default());

        orch.run("How is Microsoft doing?", &ConversationState::default()).await.unwrap();

        let calls = engine.calls().await;
        let commentary: Vec<Option<String>> = calls[2]
            .messages
            .iter()
            .filter_map(|m| match &m.content {
                MessageContent::Invocations { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(commentary, vec![Some("Let me look that up.".to_string()), None]);
    }

    #[tokio::test]
    async fn test_error_payload_reaches_engine_verbatim() {
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![CapabilityInvocationRequest::new("call_1", "getWeather", Map::new())]),
            Ok(ModelResponse::Final("I can't do that.".to_string())),
        ]));
        let orch = orchestrator(engine.clone(), CapabilityRegistry::new(), StrategyKind::AgentLoop, LoopConfig::default());

        orch.run("weather?", &ConversationState::default()).await.unwrap();

        let calls = engine.calls().await;
        let result = calls[1].messages.last().and_then(Message::as_tool_result).unwrap();
        assert_eq!(result.content(), r#"{"error":"Unknown tool: getWeather"}"#);
    }

    #[tokio::test]
    async fn test_fan_out_all_keeps_request_order() {
        let (registry, data, news) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![
                ticker_request("a", GET_STOCK_DATA, "AAPL"),
                ticker_request("b", GET_STOCK_NEWS, "AAPL"),
            ]),
            Ok(ModelResponse::Final("done".to_string())),
        ]));
        let orch = orchestrator(engine.clone(), registry, StrategyKind::AgentLoop, LoopConfig::default());

        let outcome = orch.run("Apple price and news", &ConversationState::default()).await.unwrap();

        // the slower capability was requested first and must still be folded first
        let ids: Vec<&str> = outcome
            .transcript
            .iter()
            .filter_map(Message::as_tool_result)
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(data.calls.load(Ordering::SeqCst), 1);
        assert_eq!(news.calls.load(Ordering::SeqCst), 1);
        assert_eq!(engine.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_fan_out_first_only_drops_extras_from_transcript() {
        let (registry, data, news) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![
                ticker_request("a", GET_STOCK_DATA, "AAPL"),
                ticker_request("b", GET_STOCK_NEWS, "AAPL"),
            ]),
            Ok(ModelResponse::Final("done".to_string())),
        ]));
        let config = LoopConfig {
            fan_out: FanOut::FirstOnly,
            ..LoopConfig::default()
        };
        let orch = orchestrator(engine, registry, StrategyKind::AgentLoop, config);

        let outcome = orch.run("Apple price and news", &ConversationState::default()).await.unwrap();

        assert_eq!(data.calls.load(Ordering::SeqCst), 1);
        assert_eq!(news.calls.load(Ordering::SeqCst), 0);

        let recorded = outcome
            .transcript
            .iter()
            .find_map(|m| match &m.content {
                MessageContent::Invocations { requests, .. } => Some(requests.len()),
                _ => None,
            })
            .unwrap();
        assert_eq!(recorded, 1);
    }

    #[tokio::test]
    async fn test_round_cap_returns_degraded_answer() {
        let (registry, data, _) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(
            (0..5)
                .map(|i| invoke(vec![ticker_request(&format!("call_{}", i), GET_STOCK_DATA, "AAPL")]))
                .collect(),
        ));
        let config = LoopConfig {
            max_rounds: 3,
            fan_out: FanOut::All,
        };
        let orch = orchestrator(engine.clone(), registry, StrategyKind::AgentLoop, config);

        let history = ConversationState::default();
        let outcome = orch.run("loop forever", &history).await.unwrap();

        assert!(outcome.degraded);
        assert_eq!(outcome.answer, DEGRADED_ANSWER);
        assert_eq!(outcome.rounds, 3);
        assert_eq!(engine.call_count().await, 3);
        assert_eq!(data.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_engine_failure_propagates() {
        let engine = Arc::new(ScriptedEngine::new(vec![Err(AssistantError::Llm("502".to_string()))]));
        let orch = orchestrator(engine, CapabilityRegistry::new(), StrategyKind::AgentLoop, LoopConfig::default());

        assert!(orch.run("q", &ConversationState::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_single_pass_makes_tool_less_answer_call() {
        let (registry, _, _) = echo_registry();
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![ticker_request("a", GET_STOCK_DATA, "MSFT")]),
            Ok(ModelResponse::Final("MSFT is up.".to_string())),
        ]));
        let orch = orchestrator(engine.clone(), registry, StrategyKind::SinglePass, LoopConfig::default());

        let outcome = orch.run("How is Microsoft doing?", &ConversationState::default()).await.unwrap();

        assert_eq!(outcome.answer, "MSFT is up.");
        assert_eq!(outcome.strategy, StrategyKind::SinglePass);

        let calls = engine.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].capabilities, [GET_STOCK_DATA, GET_STOCK_NEWS]);
        assert!(calls[1].capabilities.is_empty());
    }

    #[tokio::test]
    async fn test_routed_data_lane_calls_quote_and_news() {
        let (registry, data, news) = echo_registry();
        let engine = Arc::new(ScriptedEngine::finals([
            r#"{"lane": "data", "ticker": "TSLA"}"#,
            "Tesla summary",
        ]));
        let orch = orchestrator(engine.clone(), registry, StrategyKind::Routed, LoopConfig::default());

        let outcome = orch.run("How is Tesla doing?", &ConversationState::default()).await.unwrap();

        assert_eq!(outcome.answer, "Tesla summary");
        assert_eq!(outcome.rounds, 1);
        assert_eq!(data.calls.load(Ordering::SeqCst), 1);
        assert_eq!(news.calls.load(Ordering::SeqCst), 1);
        assert!(outcome.invocations.iter().all(|i| i.arguments["ticker"] == json!("TSLA")));
    }

    #[tokio::test]
    async fn test_routed_definition_without_match_skips_engine() {
        let engine = Arc::new(ScriptedEngine::finals([r#"{"lane": "definition", "ticker": null}"#]));
        let orch = orchestrator(engine.clone(), glossary_registry(0.4), StrategyKind::Routed, LoopConfig::default());

        let outcome = orch.run("What is a gamma squeeze?", &ConversationState::default()).await.unwrap();

        assert_eq!(outcome.answer, NO_INFORMATION_ANSWER);
        assert_eq!(outcome.rounds, 0);
        // only the router call reached the engine
        assert_eq!(engine.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_routed_definition_with_match_answers_from_context() {
        let engine = Arc::new(ScriptedEngine::finals([
            "not json at all",
            "A bull market is a period of rising prices.",
        ]));
        let orch = orchestrator(engine.clone(), glossary_registry(0.95), StrategyKind::Routed, LoopConfig::default());

        let outcome = orch.run("What is a bull market?", &ConversationState::default()).await.unwrap();

        assert_eq!(outcome.answer, "A bull market is a period of rising prices.");
        assert_eq!(outcome.invocations[0].name, SEARCH_GLOSSARY);
        assert_eq!(outcome.invocations[0].payload["found"], json!(true));

        let calls = engine.calls().await;
        assert!(calls[1].capabilities.is_empty());
        assert_eq!(calls[1].messages.last().map(|m| m.role), Some(Role::Tool));
    }

    #[tokio::test]
    async fn test_unregistered_company_search_is_reported_not_raised() {
        let engine = Arc::new(ScriptedEngine::new(vec![
            invoke(vec![CapabilityInvocationRequest::new("c", SEARCH_COMPANY_INFO, Map::new())]),
            Ok(ModelResponse::Final("sorry".to_string())),
        ]));
        let orch = orchestrator(engine, CapabilityRegistry::new(), StrategyKind::AgentLoop, LoopConfig::default());

        let outcome = orch.run("Tell me about TechVision", &ConversationState::default()).await.unwrap();
        assert!(outcome.invocations[0].is_error());
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("agent".parse::<StrategyKind>().unwrap(), StrategyKind::AgentLoop);
        assert_eq!("Single-Pass".parse::<StrategyKind>().unwrap(), StrategyKind::SinglePass);
        assert_eq!("first".parse::<FanOut>().unwrap(), FanOut::FirstOnly);
        assert!("sometimes".parse::<FanOut>().is_err());
        assert_eq!(StrategyKind::Routed.to_string(), "routed");
    }
}
