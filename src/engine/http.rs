//! HTTP sentiment engine client
//!
//! Talks to an external aspect-based sentiment service. The response labels
//! are free-form model output, so they are normalized into the three
//! canonical labels; items that normalize to nothing are skipped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{EngineError, SentimentEngine};
use crate::models::{Aspect, Sentiment};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Analysis request body
#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

/// Analysis response body
#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    analysis: Vec<AnalysisItem>,
}

/// One aspect item as returned by the engine service
#[derive(Debug, Deserialize)]
struct AnalysisItem {
    #[serde(default)]
    term: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    sentiment: Option<String>,
}

/// Sentiment engine backed by an external HTTP service
pub struct HttpSentimentEngine {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl HttpSentimentEngine {
    pub fn new(name: String, endpoint: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            name,
            endpoint,
            client,
        }
    }
}

#[async_trait]
impl SentimentEngine for HttpSentimentEngine {
    fn name(&self) -> &str {
        &self.name
    }

    async fn analyze(&self, text: &str) -> Result<Vec<Aspect>, EngineError> {
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&AnalyzeRequest { text })
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Api(status.as_u16(), body));
        }

        let parsed: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Parse(e.to_string()))?;

        let aspects = parsed
            .analysis
            .into_iter()
            .filter_map(|item| {
                let sentiment = normalize_label(item.sentiment.as_deref()?)?;
                Some(Aspect {
                    term: item.term,
                    category: item.category.unwrap_or_else(|| "general".to_string()),
                    sentiment,
                })
            })
            .collect();

        Ok(aspects)
    }
}

/// Normalize a model-emitted sentiment label.
///
/// Models abbreviate ("pos", "POSITIVE", "neg."); anything starting from the
/// three canonical stems maps to its label, everything else is discarded.
fn normalize_label(raw: &str) -> Option<Sentiment> {
    let lowered = raw.trim().to_lowercase();
    if lowered.contains("pos") {
        Some(Sentiment::Positive)
    } else if lowered.contains("neg") {
        Some(Sentiment::Negative)
    } else if lowered.contains("neu") {
        Some(Sentiment::Neutral)
    } else {
        None
    }
}
