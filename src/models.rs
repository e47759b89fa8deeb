//! Core data models for the research assistant

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

//
// ================= Transcript =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Message body: plain text, an invocation request batch, or a single result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum MessageContent {
    Text(String),
    Invocations {
        /// Commentary the engine sent alongside its requests
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        requests: Vec<CapabilityInvocationRequest>,
    },
    ToolResult(CapabilityResult),
}

/// A single entry of the transcript presented to the reasoning engine.
///
/// Messages are immutable once appended; the transcript only grows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Assistant turn that requests capability invocations
    pub fn invocations(text: Option<String>, requests: Vec<CapabilityInvocationRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Invocations { text, requests },
        }
    }

    pub fn tool_result(result: CapabilityResult) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::ToolResult(result),
        }
    }

    /// Text body, if this is a plain text message
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&CapabilityResult> {
        match &self.content {
            MessageContent::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

//
// ================= Capability I/O =================
//

/// A capability call requested by the reasoning engine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityInvocationRequest {
    /// Correlation id echoed back on the matching result
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl CapabilityInvocationRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one invocation. `payload` is either the success value
/// or `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilityResult {
    pub id: String,
    pub name: String,
    pub payload: Value,
}

impl CapabilityResult {
    pub fn error(id: impl Into<String>, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            payload: serde_json::json!({ "error": reason.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }

    /// Payload rendered as it is handed to the reasoning engine
    pub fn content(&self) -> String {
        self.payload.to_string()
    }
}

//
// ================= Engine Response =================
//

/// What the reasoning engine produced for one round
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    Final(String),
    Invoke {
        text: Option<String>,
        requests: Vec<CapabilityInvocationRequest>,
    },
}

//
// ================= Retrieval =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedDocument {
    pub content: String,
    pub score: f32,
}

impl RetrievedDocument {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
        }
    }
}

//
// ================= Routing =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "lane", rename_all = "snake_case")]
pub enum RouteDecision {
    DataLane { ticker: String },
    DefinitionLane,
}

impl fmt::Display for RouteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteDecision::DataLane { ticker } => write!(f, "data({})", ticker),
            RouteDecision::DefinitionLane => write!(f, "definition"),
        }
    }
}

//
// ================= Market Data =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: String,
    pub volume: i64,
    pub latest_trading_day: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub source: String,
    pub url: String,
    pub time_published: String,
}
