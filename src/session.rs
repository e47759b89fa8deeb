//! Sessions
//!
//! A session owns its conversation state and commits an exchange only after
//! the orchestrator returns successfully. A failed or cancelled turn leaves the
//! state exactly as it was.

use crate::agent::{LoopOutcome, Orchestrator};
use crate::audit::{AuditLog, TurnRecord};
use crate::error::AssistantError;
use crate::memory::ConversationState;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// User-facing reply when a turn fails
pub const APOLOGY: &str = "Sorry, I encountered an error while researching your question. Please try again.";

pub struct Session {
    id: Uuid,
    state: ConversationState,
    orchestrator: Arc<Orchestrator>,
    audit: Option<Arc<AuditLog>>,
}

impl Session {
    pub fn new(orchestrator: Arc<Orchestrator>, history_exchanges: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConversationState::new(history_exchanges),
            orchestrator,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Run one turn and commit it on success
    pub async fn ask(&mut self, query: &str) -> Result<LoopOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AssistantError::Session("Query must not be empty".to_string()));
        }

        let started = Instant::now();
        let outcome = self.orchestrator.run(query, &self.state).await?;

        self.state.commit_exchange(query, outcome.answer.clone());

        if let Some(audit) = &self.audit {
            let record = TurnRecord::from_outcome(self.id, query, &outcome, started.elapsed().as_millis() as u64);
            if let Err(e) = audit.record(record).await {
                warn!(session_id = %self.id, error = %e, "Failed to record turn");
            }
        }

        Ok(outcome)
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}

/// Concurrent sessions, each with isolated state
pub struct SessionManager {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>,
    orchestrator: Arc<Orchestrator>,
    audit: Arc<AuditLog>,
    history_exchanges: usize,
}

impl SessionManager {
    pub fn new(orchestrator: Arc<Orchestrator>, audit: Arc<AuditLog>, history_exchanges: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            orchestrator,
            audit,
            history_exchanges,
        }
    }

    pub async fn create(&self) -> Uuid {
        let session = Session::new(self.orchestrator.clone(), self.history_exchanges).with_audit(self.audit.clone());
        let id = session.id();

        self.sessions.write().await.insert(id, Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Session created");
        id
    }

    pub async fn get(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| AssistantError::Session(format!("Session {} not found", id)))
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(session_id = %id, "Session closed");
        }
        removed
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }
}
