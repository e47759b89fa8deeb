//! Financial Research Assistant
//!
//! A conversational assistant that answers questions about stocks, companies
//! and financial terms by letting a reasoning engine call a small set of
//! capabilities:
//! - live quotes and news from a market data provider
//! - company profiles and a glossary behind a similarity-threshold gate
//!
//! LOOP:
//! QUERY → ENGINE → DISPATCH → ENGINE … → ANSWER

pub mod agent;
pub mod api;
pub mod audit;
pub mod config;
pub mod corpus;
pub mod error;
pub mod llm;
pub mod market;
pub mod memory;
pub mod models;
pub mod retrieval;
pub mod router;
pub mod session;
pub mod tools;
pub mod vector;

pub use error::{AssistantError, Result};

// Re-export common types
pub use models::*;
pub use agent::{FanOut, LoopConfig, LoopOutcome, Orchestrator, StrategyKind};
pub use config::Config;
pub use session::{Session, SessionManager};

use std::sync::Arc;
use tracing::info;

/// Wire the production adapters from config: embeddings + both indices,
/// market data, capability registry and the reasoning engine.
pub async fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let embedder: Arc<dyn vector::Embedder> = Arc::new(vector::OpenAiEmbedder::from_config(config)?);

    info!("Indexing company profiles and glossary");
    let profiles = vector::MemoryVectorStore::from_documents(embedder.clone(), corpus::COMPANY_PROFILES).await?;
    let glossary = vector::MemoryVectorStore::from_documents(embedder, corpus::GLOSSARY).await?;
    info!(profiles = profiles.len(), glossary = glossary.len(), "Knowledge base ready");

    let market = Arc::new(market::AlphaVantageClient::from_config(config)?);
    let registry = tools::create_default_registry(market, Arc::new(profiles), Arc::new(glossary));
    let engine = Arc::new(llm::OpenAiEngine::from_config(config)?);

    Ok(Orchestrator::new(
        engine,
        Arc::new(registry),
        config.strategy,
        LoopConfig {
            max_rounds: config.max_rounds,
            fan_out: config.fan_out,
        },
    ))
}
