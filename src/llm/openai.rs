//! OpenAI-compatible chat-completions client
//!
//! Requests go through the Helicone gateway by default so every engine call is
//! visible in telemetry. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::Config;
use crate::error::AssistantError;
use crate::llm::ReasoningEngine;
use crate::models::{CapabilityInvocationRequest, Message, MessageContent, ModelResponse, Role};
use crate::tools::CapabilitySchema;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Reusable chat-completions engine (connection-pooled)
pub struct OpenAiEngine {
    client: Client,
    api_key: String,
    telemetry_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OpenAiEngine {
    pub fn new(
        api_key: String,
        telemetry_key: Option<String>,
        base_url: &str,
        model: String,
        temperature: f32,
    ) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            api_key,
            telemetry_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.credentials.openai_api_key.clone(),
            Some(config.credentials.helicone_api_key.clone()),
            &config.base_url,
            config.model.clone(),
            config.temperature,
        )
    }
}

#[async_trait]
impl ReasoningEngine for OpenAiEngine {
    async fn respond(
        &self,
        messages: &[Message],
        capabilities: &[CapabilitySchema],
    ) -> Result<ModelResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: to_wire_messages(messages),
            tools: capabilities
                .iter()
                .map(|schema| WireTool {
                    kind: "function",
                    function: schema,
                })
                .collect(),
            temperature: self.temperature,
        };

        info!(
            model = %self.model,
            messages = messages.len(),
            tools = capabilities.len(),
            "Sending transcript to reasoning engine"
        );

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request);

        if let Some(key) = &self.telemetry_key {
            builder = builder.header("Helicone-Auth", format!("Bearer {}", key));
        }

        let response = builder.send().await.map_err(|e| {
            error!("Chat completion request failed: {}", e);
            AssistantError::Llm(format!("Chat completion request failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Chat completion error response ({}): {}", status, error_text);
            return Err(AssistantError::Llm(format!(
                "Chat completion returned {}: {}",
                status, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse chat completion: {}", e);
            AssistantError::Llm(format!("Chat completion parse error: {}", e))
        })?;

        if let Some(usage) = &body.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Engine token usage"
            );
        }

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Llm("No choices in chat completion".to_string()))?;

        Ok(parse_choice(choice.message))
    }
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn to_wire_messages(messages: &[Message]) -> Vec<WireMessage> {
    messages
        .iter()
        .map(|msg| match &msg.content {
            MessageContent::Text(text) => WireMessage {
                role: role_name(msg.role),
                content: Some(text.clone()),
                ..WireMessage::empty(role_name(msg.role))
            },
            MessageContent::Invocations { text, requests } => WireMessage {
                content: text.clone(),
                tool_calls: Some(
                    requests
                        .iter()
                        .map(|r| WireToolCall {
                            id: r.id.clone(),
                            kind: "function".to_string(),
                            function: WireFunction {
                                name: r.name.clone(),
                                arguments: Value::Object(r.arguments.clone()).to_string(),
                            },
                        })
                        .collect(),
                ),
                ..WireMessage::empty("assistant")
            },
            MessageContent::ToolResult(result) => WireMessage {
                content: Some(result.content()),
                tool_call_id: Some(result.id.clone()),
                name: Some(result.name.clone()),
                ..WireMessage::empty("tool")
            },
        })
        .collect()
}

fn parse_arguments(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!("Tool call arguments are not an object: {}", other);
            Map::new()
        }
        Err(e) => {
            warn!("Unparsable tool call arguments ({}): {}", e, raw);
            Map::new()
        }
    }
}

fn parse_choice(message: ResponseMessage) -> ModelResponse {
    let calls = message.tool_calls.unwrap_or_default();

    if calls.is_empty() {
        return ModelResponse::Final(message.content.unwrap_or_default());
    }

    let requests = calls
        .into_iter()
        .map(|call| {
            CapabilityInvocationRequest::new(
                call.id,
                call.function.name,
                parse_arguments(&call.function.arguments),
            )
        })
        .collect();

    ModelResponse::Invoke {
        text: message.content.filter(|c| !c.trim().is_empty()),
        requests,
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: &'a CapabilitySchema,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl WireMessage {
    fn empty(role: &'static str) -> Self {
        Self {
            role,
            content: None,
            tool_calls: None,
            tool_call_id: None,
            name: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
