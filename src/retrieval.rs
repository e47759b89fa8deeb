//! Retrieval gate
//!
//! Decides whether retrieved context is trustworthy enough to show the
//! reasoning engine. Only the best candidate's score is checked: if it clears
//! the corpus threshold, every top-k candidate is accepted.

use crate::models::RetrievedDocument;
use crate::vector::SimilaritySearch;
use crate::Result;
use serde_json::{json, Value};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Candidates requested per lookup
pub const DEFAULT_TOP_K: usize = 2;

/// Minimum best-candidate score for the company profile corpus
pub const COMPANY_PROFILE_THRESHOLD: f32 = 0.9;

/// Minimum best-candidate score for the glossary corpus
pub const GLOSSARY_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub enum GateVerdict {
    NotFound { reason: String },
    Found { documents: Vec<RetrievedDocument> },
}

impl GateVerdict {
    pub fn is_found(&self) -> bool {
        matches!(self, GateVerdict::Found { .. })
    }

    /// Shape handed to the reasoning engine as a capability result
    pub fn to_payload(&self) -> Value {
        match self {
            GateVerdict::NotFound { reason } => json!({
                "found": false,
                "message": reason,
            }),
            GateVerdict::Found { documents } => json!({
                "found": true,
                "documents": documents,
            }),
        }
    }
}

/// Threshold + top-k policy for one corpus
#[derive(Debug, Clone)]
pub struct RetrievalGate {
    k: usize,
    threshold: f32,
    subject: String,
}

impl RetrievalGate {
    pub fn new(k: usize, threshold: f32) -> Self {
        Self {
            k: k.max(1),
            threshold,
            subject: "information".to_string(),
        }
    }

    /// Names what the corpus holds, used in the not-found message
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub async fn gate(&self, query: &str, index: &dyn SimilaritySearch) -> Result<GateVerdict> {
        let mut candidates = index.search(query, self.k).await?;
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        candidates.truncate(self.k);

        let best = candidates.first().map(|d| d.score);
        debug!(
            query,
            candidates = candidates.len(),
            best_score = ?best,
            threshold = self.threshold,
            "Retrieval candidates scored"
        );

        // NaN never clears the threshold
        let accepted = matches!(best, Some(score) if score >= self.threshold);

        if !accepted {
            info!(subject = %self.subject, "No relevant {} found in the knowledge base", self.subject);
            return Ok(GateVerdict::NotFound {
                reason: format!("No relevant {} found in the knowledge base.", self.subject),
            });
        }

        Ok(GateVerdict::Found {
            documents: candidates,
        })
    }
}
