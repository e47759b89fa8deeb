//! Reasoning engine abstraction
//!
//! The engine is opaque to the rest of the crate: it receives the transcript
//! plus the capability schemas it may call and answers with either final text
//! or a batch of invocation requests.

use crate::error::AssistantError;
use crate::models::{Message, ModelResponse};
use crate::tools::CapabilitySchema;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub mod openai;
pub use openai::OpenAiEngine;

/// Trait for a chat-style reasoning engine with tool calling
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// An empty `capabilities` slice means the engine must answer directly
    async fn respond(
        &self,
        messages: &[Message],
        capabilities: &[CapabilitySchema],
    ) -> Result<ModelResponse>;
}

/// One call observed by [`ScriptedEngine`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub capabilities: Vec<String>,
}

/// Scripted engine for development & testing.
/// Replays queued responses in order and records every transcript it sees.
pub struct ScriptedEngine {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedEngine {
    pub fn new(responses: Vec<Result<ModelResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Engine that answers each call with the next text, never invoking tools
    pub fn finals<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            answers
                .into_iter()
                .map(|a| Ok(ModelResponse::Final(a.into())))
                .collect(),
        )
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait]
impl ReasoningEngine for ScriptedEngine {
    async fn respond(
        &self,
        messages: &[Message],
        capabilities: &[CapabilitySchema],
    ) -> Result<ModelResponse> {
        self.calls.lock().await.push(RecordedCall {
            messages: messages.to_vec(),
            capabilities: capabilities.iter().map(|c| c.name.clone()).collect(),
        });

        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(AssistantError::Llm("scripted engine exhausted".to_string())))
    }
}
