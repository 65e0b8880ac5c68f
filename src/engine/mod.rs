//! Sentiment engine integration
//!
//! The pipeline only depends on the `analyze(text) -> aspects` contract; the
//! model behind it lives in a separate service. Engines are looked up by
//! model type in a registry that is built once at startup and handed to the
//! dispatcher, so tests can swap in stub engines without touching globals.

pub mod http;

pub use http::HttpSentimentEngine;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::Aspect;

/// Sentiment engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Engine service returned an error response
    #[error("Engine error {0}: {1}")]
    Api(u16, String),

    /// Failed to parse the engine response
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Maps review text to aspect-level sentiment labels.
///
/// Implementations must tolerate their backing model being unavailable; the
/// caller treats any error as "no aspects found", never as a pipeline
/// failure.
#[async_trait]
pub trait SentimentEngine: Send + Sync {
    /// Engine name, for logging
    fn name(&self) -> &str;

    /// Extract (term, category, sentiment) triples from review text
    async fn analyze(&self, text: &str) -> Result<Vec<Aspect>, EngineError>;
}

/// Registry of sentiment engines keyed by model type.
///
/// Constructed once at startup from configuration; a submission whose
/// model type has no registered engine analyzes to zero aspects.
#[derive(Clone, Default)]
pub struct EngineRegistry {
    engines: HashMap<String, Arc<dyn SentimentEngine>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Build the registry from configured model-type → endpoint entries
    pub fn from_endpoints(endpoints: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();
        for (model_type, endpoint) in endpoints {
            let engine = HttpSentimentEngine::new(model_type.clone(), endpoint.clone());
            registry.register(model_type.clone(), Arc::new(engine));
        }
        info!(engines = registry.engines.len(), "Sentiment engine registry initialized");
        registry
    }

    pub fn register(&mut self, model_type: String, engine: Arc<dyn SentimentEngine>) {
        self.engines.insert(model_type, engine);
    }

    pub fn get(&self, model_type: &str) -> Option<Arc<dyn SentimentEngine>> {
        self.engines.get(model_type).cloned()
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
