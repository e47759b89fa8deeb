//! Similarity search over static reference corpora
//!
//! A corpus is embedded once at startup; queries are embedded on demand and
//! ranked by cosine similarity.

use crate::error::AssistantError;
use crate::models::RetrievedDocument;
use crate::Result;
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::info;

pub mod embeddings;
pub use embeddings::OpenAiEmbedder;

/// Ranked retrieval over one corpus
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Top `k` documents, highest score first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>>;
}

/// Text → vector
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_documents(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AssistantError::Embedding("Empty embedding response".to_string()))
    }
}

/// Cosine similarity; 0.0 for mismatched or zero-length vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold((0.0f32, 0.0f32, 0.0f32), |(d, na, nb), (x, y)| {
        (d + x * y, na + x * x, nb + y * y)
    });

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn by_score_desc(a: &RetrievedDocument, b: &RetrievedDocument) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

/// In-memory vector store built once from a corpus
pub struct MemoryVectorStore {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(String, Vec<f32>)>,
}

impl MemoryVectorStore {
    pub async fn from_documents(embedder: Arc<dyn Embedder>, documents: &[&str]) -> Result<Self> {
        let texts: Vec<String> = documents.iter().map(|d| d.trim().to_string()).collect();
        let vectors = embedder.embed_documents(&texts).await?;

        if vectors.len() != texts.len() {
            return Err(AssistantError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        info!(documents = texts.len(), "Vector store initialized");

        Ok(Self {
            embedder,
            entries: texts.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl SimilaritySearch for MemoryVectorStore {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        let query_vector = self.embedder.embed_query(query).await?;

        let mut scored: Vec<RetrievedDocument> = self
            .entries
            .iter()
            .map(|(text, vector)| RetrievedDocument::new(text.clone(), cosine_similarity(&query_vector, vector)))
            .collect();

        scored.sort_by(by_score_desc);
        scored.truncate(k);
        Ok(scored)
    }
}

/// Fixed-score index for development & testing.
/// Always returns its documents (best first) regardless of the query.
pub struct StaticIndex {
    documents: Vec<RetrievedDocument>,
}

impl StaticIndex {
    pub fn new(mut documents: Vec<RetrievedDocument>) -> Self {
        documents.sort_by(by_score_desc);
        Self { documents }
    }

    pub fn empty() -> Self {
        Self { documents: Vec::new() }
    }
}

#[async_trait]
impl SimilaritySearch for StaticIndex {
    async fn search(&self, _query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        Ok(self.documents.iter().take(k).cloned().collect())
    }
}
