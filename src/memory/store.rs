//! Conversation history storage
//!
//! Holds the most recent (user, assistant) exchanges as plain text messages.
//! Only completed exchanges are ever committed; invocation traffic stays in
//! the per-query transcript.

use crate::models::{Message, Role};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Exchanges kept when no capacity is configured
pub const DEFAULT_HISTORY_EXCHANGES: usize = 4;

/// FIFO history capped at `2 * capacity` messages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    messages: VecDeque<Message>,
    capacity: usize,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// `capacity` is counted in exchanges
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
            updated_at: Utc::now(),
        }
    }

    /// Append one completed exchange, evicting the oldest ones past capacity
    pub fn commit_exchange(&mut self, query: impl Into<String>, answer: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }

        self.messages.push_back(Message::user(query));
        self.messages.push_back(Message::assistant(answer));

        while self.messages.len() > self.capacity.saturating_mul(2) {
            // drop a whole exchange to keep user/assistant pairs aligned
            self.messages.pop_front();
            self.messages.pop_front();
        }

        self.updated_at = Utc::now();
    }

    // =============================
    // Accessors
    // =============================

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    /// Owned copy, oldest first
    pub fn messages(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    /// Number of messages (two per exchange)
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_answer(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(Message::text)
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.updated_at = Utc::now();
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_EXCHANGES)
    }
}
