//! Turn audit log
//!
//! Every completed turn is recorded with its invocations and a hash of the
//! full transcript, so a turn can later be inspected and re-verified.

use crate::agent::{LoopOutcome, StrategyKind};
use crate::models::Message;
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One dispatched capability invocation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvocationRecord {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub payload: Value,
    pub elapsed_ms: u64,
}

impl InvocationRecord {
    pub fn is_error(&self) -> bool {
        self.payload.get("error").is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub audit_id: Uuid,
    pub session_id: Uuid,
    pub query: String,
    pub answer: String,
    pub strategy: StrategyKind,
    pub rounds: u32,
    pub degraded: bool,
    pub invocations: Arc<Vec<InvocationRecord>>,
    pub transcript: Arc<Vec<Message>>,
    pub transcript_hash: String,
    pub created_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

impl TurnRecord {
    pub fn from_outcome(session_id: Uuid, query: &str, outcome: &LoopOutcome, elapsed_ms: u64) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            session_id,
            query: query.to_string(),
            answer: outcome.answer.clone(),
            strategy: outcome.strategy,
            rounds: outcome.rounds,
            degraded: outcome.degraded,
            invocations: Arc::new(outcome.invocations.clone()),
            transcript: Arc::new(outcome.transcript.clone()),
            transcript_hash: transcript_digest(&outcome.transcript),
            created_at: Utc::now(),
            elapsed_ms,
        }
    }

    /// Whether the stored transcript still matches its digest
    pub fn is_intact(&self) -> bool {
        transcript_digest(&self.transcript) == self.transcript_hash
    }
}

/// Turn records grouped by session, each list in commit order
#[derive(Default)]
pub struct AuditLog {
    sessions: RwLock<HashMap<Uuid, Vec<TurnRecord>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, turn: TurnRecord) -> Result<Uuid> {
        let audit_id = turn.audit_id;
        self.sessions.write().await.entry(turn.session_id).or_default().push(turn);
        Ok(audit_id)
    }

    pub async fn get(&self, audit_id: Uuid) -> Result<Option<TurnRecord>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.values().flatten().find(|t| t.audit_id == audit_id).cloned())
    }

    /// Turns of one session, oldest first
    pub async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<TurnRecord>> {
        Ok(self.sessions.read().await.get(&session_id).cloned().unwrap_or_default())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.values().map(Vec::len).sum()
    }

    /// False for unknown ids
    pub async fn verify_turn(&self, audit_id: Uuid) -> Result<bool> {
        Ok(self.get(audit_id).await?.is_some_and(|turn| turn.is_intact()))
    }
}

/// Hex SHA-256 over the JSON form of a transcript
pub fn transcript_digest(transcript: &[Message]) -> String {
    serde_json::to_vec(transcript)
        .map(|json| hex::encode(Sha256::digest(&json)))
        .unwrap_or_default()
}
