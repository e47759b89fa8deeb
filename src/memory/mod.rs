//! Conversation memory
//!
//! Bounded per-session history of completed exchanges.

pub mod store;

pub use store::{ConversationState, DEFAULT_HISTORY_EXCHANGES};
