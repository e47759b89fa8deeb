//! Knowledge-base search capability
//!
//! Every retrieval goes through a [`RetrievalGate`] before any text reaches
//! the reasoning engine.

use crate::error::AssistantError;
use crate::retrieval::RetrievalGate;
use crate::tools::{Capability, CapabilitySchema, ParamType, ParametersSchema};
use crate::vector::SimilaritySearch;
use crate::Result;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

pub struct KnowledgeSearchCapability {
    schema: CapabilitySchema,
    gate: RetrievalGate,
    index: Arc<dyn SimilaritySearch>,
}

impl KnowledgeSearchCapability {
    pub fn new(
        name: &str,
        description: &str,
        query_description: &str,
        gate: RetrievalGate,
        index: Arc<dyn SimilaritySearch>,
    ) -> Self {
        Self {
            schema: CapabilitySchema::new(
                name,
                description,
                ParametersSchema::new().required("query", ParamType::String, query_description),
            ),
            gate,
            index,
        }
    }

    pub fn gate(&self) -> &RetrievalGate {
        &self.gate
    }
}

#[async_trait::async_trait]
impl Capability for KnowledgeSearchCapability {
    fn schema(&self) -> &CapabilitySchema {
        &self.schema
    }

    async fn invoke(&self, args: &Map<String, Value>) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AssistantError::InvalidToolInput("Expected a non-empty 'query'".to_string()))?;

        info!(capability = %self.schema.name, "Searching knowledge base");

        let verdict = self
            .gate
            .gate(query, self.index.as_ref())
            .await
            .map_err(|e| AssistantError::Retrieval(e.to_string()))?;

        Ok(verdict.to_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RetrievedDocument;
    use crate::vector::StaticIndex;
    use serde_json::json;

    fn capability(scores: &[(&str, f32)], threshold: f32) -> KnowledgeSearchCapability {
        KnowledgeSearchCapability::new(
            "searchGlossary",
            "Glossary lookup",
            "Term",
            RetrievalGate::new(2, threshold).with_subject("glossary entry"),
            Arc::new(StaticIndex::new(
                scores
                    .iter()
                    .map(|(c, s)| RetrievedDocument::new(*c, *s))
                    .collect(),
            )),
        )
    }

    fn query(q: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("query".to_string(), json!(q));
        map
    }

    #[tokio::test]
    async fn test_found_payload_carries_documents() {
        let cap = capability(&[("Bull Market: ...", 0.95), ("Bear Market: ...", 0.4)], 0.7);
        let payload = cap.invoke(&query("bull market")).await.unwrap();

        assert_eq!(payload["found"], json!(true));
        assert_eq!(payload["documents"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_not_found_payload() {
        let cap = capability(&[("Bull Market: ...", 0.5)], 0.7);
        let payload = cap.invoke(&query("bull market")).await.unwrap();

        assert_eq!(
            payload,
            json!({"found": false, "message": "No relevant glossary entry found in the knowledge base."})
        );
    }
}
