//! Capability trait and registry
//!
//! Capabilities are what the reasoning engine may call. The registry validates
//! arguments against each declared schema and never lets a failure escape:
//! unknown names, bad arguments and handler errors all come back as
//! `{"error": "..."}` payloads the engine can react to.

use crate::error::AssistantError;
use crate::market::MarketDataProvider;
use crate::models::{CapabilityInvocationRequest, CapabilityResult};
use crate::retrieval::{RetrievalGate, COMPANY_PROFILE_THRESHOLD, DEFAULT_TOP_K, GLOSSARY_THRESHOLD};
use crate::vector::SimilaritySearch;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::warn;

pub mod knowledge;
pub mod market;

pub use knowledge::KnowledgeSearchCapability;
pub use market::{StockDataCapability, StockNewsCapability};

pub const GET_STOCK_DATA: &str = "getStockData";
pub const GET_STOCK_NEWS: &str = "getStockNews";
pub const SEARCH_COMPANY_INFO: &str = "searchCompanyInfo";
pub const SEARCH_GLOSSARY: &str = "searchGlossary";

//
// ================= Schemas =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParametersSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub properties: BTreeMap<String, ParameterSpec>,
    pub required: Vec<String>,
}

impl ParametersSchema {
    pub fn new() -> Self {
        Self {
            kind: "object".to_string(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn required(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.required.push(name.to_string());
        self.optional(name, kind, description)
    }

    pub fn optional(mut self, name: &str, kind: ParamType, description: &str) -> Self {
        self.properties.insert(
            name.to_string(),
            ParameterSpec {
                kind,
                description: description.to_string(),
            },
        );
        self
    }
}

impl Default for ParametersSchema {
    fn default() -> Self {
        Self::new()
    }
}

/// Declaration the reasoning engine sees for one capability
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapabilitySchema {
    pub name: String,
    pub description: String,
    pub parameters: ParametersSchema,
}

impl CapabilitySchema {
    pub fn new(name: &str, description: &str, parameters: ParametersSchema) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

//
// ================= Capability =================
//

/// A single invocable capability
#[async_trait::async_trait]
pub trait Capability: Send + Sync {
    fn schema(&self) -> &CapabilitySchema;

    /// `args` has already been validated and coerced against [`Capability::schema`]
    async fn invoke(&self, args: &Map<String, Value>) -> Result<Value>;
}

/// Best-effort conversion of a JSON value to the declared parameter type
fn coerce(value: &Value, kind: ParamType) -> Option<Value> {
    match (kind, value) {
        (ParamType::String, Value::String(_)) => Some(value.clone()),
        (ParamType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

        (ParamType::Number, Value::Number(_)) => Some(value.clone()),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),

        (ParamType::Integer, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(Value::from),
        (ParamType::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

        (ParamType::Boolean, Value::Bool(_)) => Some(value.clone()),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },

        _ => None,
    }
}

/// Check required keys and coerce declared parameters; unknown keys pass through
pub fn validate_arguments(
    schema: &CapabilitySchema,
    args: &Map<String, Value>,
) -> Result<Map<String, Value>> {
    for key in &schema.parameters.required {
        match args.get(key) {
            None | Some(Value::Null) => {
                return Err(AssistantError::InvalidToolInput(format!(
                    "Missing required parameter '{}' for {}",
                    key, schema.name
                )))
            }
            _ => {}
        }
    }

    let mut validated = args.clone();

    for (key, spec) in &schema.parameters.properties {
        let Some(value) = args.get(key) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        let coerced = coerce(value, spec.kind).ok_or_else(|| {
            AssistantError::InvalidToolInput(format!(
                "Parameter '{}' for {} must be of type {:?}, got {}",
                key, schema.name, spec.kind, value
            ))
        })?;
        validated.insert(key.clone(), coerced);
    }

    Ok(validated)
}

//
// ================= Registry =================
//

/// Capability registry for resolving and invoking capabilities by name
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
    order: Vec<String>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            capabilities: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Later registrations under the same name replace earlier ones
    pub fn register(&mut self, capability: Arc<dyn Capability>) {
        let name = capability.schema().name.clone();
        if self.capabilities.insert(name.clone(), capability).is_none() {
            self.order.push(name);
        }
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Capability>> {
        self.capabilities
            .get(name)
            .cloned()
            .ok_or_else(|| AssistantError::ToolNotFound(name.to_string()))
    }

    /// Schemas in registration order
    pub fn schemas(&self) -> Vec<CapabilitySchema> {
        self.order
            .iter()
            .filter_map(|name| self.capabilities.get(name))
            .map(|c| c.schema().clone())
            .collect()
    }

    pub fn list(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolve, validate and execute. Never fails: errors become payloads.
    pub async fn invoke(&self, request: &CapabilityInvocationRequest) -> CapabilityResult {
        let capability = match self.resolve(&request.name) {
            Ok(capability) => capability,
            Err(_) => {
                warn!(capability = %request.name, "Unknown capability requested");
                return CapabilityResult::error(
                    &request.id,
                    &request.name,
                    format!("Unknown tool: {}", request.name),
                );
            }
        };

        let args = match validate_arguments(capability.schema(), &request.arguments) {
            Ok(args) => args,
            Err(e) => {
                warn!(capability = %request.name, error = %e, "Rejected capability arguments");
                return CapabilityResult::error(&request.id, &request.name, e.to_string());
            }
        };

        match capability.invoke(&args).await {
            Ok(payload) => CapabilityResult {
                id: request.id.clone(),
                name: request.name.clone(),
                payload,
            },
            Err(e) => {
                warn!(capability = %request.name, error = %e, "Capability execution failed");
                CapabilityResult::error(&request.id, &request.name, e.to_string())
            }
        }
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the stock data, news and both knowledge-base capabilities
pub fn create_default_registry(
    market: Arc<dyn MarketDataProvider>,
    company_profiles: Arc<dyn SimilaritySearch>,
    glossary: Arc<dyn SimilaritySearch>,
) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    registry.register(Arc::new(StockDataCapability::new(market.clone())));
    registry.register(Arc::new(StockNewsCapability::new(market)));
    registry.register(Arc::new(KnowledgeSearchCapability::new(
        SEARCH_COMPANY_INFO,
        "Search for detailed company information in the knowledge base",
        "The company name or topic to search for",
        RetrievalGate::new(DEFAULT_TOP_K, COMPANY_PROFILE_THRESHOLD).with_subject("company information"),
        company_profiles,
    )));
    registry.register(Arc::new(KnowledgeSearchCapability::new(
        SEARCH_GLOSSARY,
        "Look up the definition of a financial term in the glossary",
        "The financial term or concept to define",
        RetrievalGate::new(DEFAULT_TOP_K, GLOSSARY_THRESHOLD).with_subject("glossary entry"),
        glossary,
    )));

    registry
}
