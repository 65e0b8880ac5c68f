//! Live-update event types
//!
//! Events are broadcast through the [`BroadcastHub`](crate::broadcast::BroadcastHub)
//! and serialized as JSON text frames on the per-tenant live channel.

use serde::{Deserialize, Serialize};

use crate::models::Sentiment;

/// Review pipeline events pushed to live subscribers
///
/// Two kinds exist: `new_review` fires at enqueue time, before any analysis
/// has run; `review_analyzed` fires only after the finalized review and its
/// aspect facts are durably written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    /// A submission was accepted into the queue
    NewReview {
        message: String,
        data: NewReviewData,
    },

    /// A submission finished analysis and its review is queryable
    ReviewAnalyzed {
        message: String,
        data: AnalyzedReviewData,
    },
}

/// Payload of a `new_review` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReviewData {
    /// Queue entry id of the raw submission
    pub id: i64,
    pub tenant_id: String,
    pub customer_name: String,
    pub rating: f64,
    /// First 100 characters of the review text
    pub preview: String,
    /// Always "pending" at this point
    pub status: String,
}

/// Payload of a `review_analyzed` event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzedReviewData {
    /// Queue entry id of the raw submission that completed
    pub id: i64,
    pub tenant_id: String,
    pub customer_name: String,
    pub rating: f64,
    /// First 100 characters of the review text
    pub preview: String,
    /// Number of aspect facts stored for the review
    pub aspect_count: usize,
    /// Overall verdict derived by majority vote
    pub sentiment: Sentiment,
}

impl ReviewEvent {
    /// Event type as string, matching the serialized `type` tag
    pub fn event_type(&self) -> &'static str {
        match self {
            ReviewEvent::NewReview { .. } => "new_review",
            ReviewEvent::ReviewAnalyzed { .. } => "review_analyzed",
        }
    }

    /// Tenant this event is scoped to; fan-out never crosses tenants
    pub fn tenant_id(&self) -> &str {
        match self {
            ReviewEvent::NewReview { data, .. } => &data.tenant_id,
            ReviewEvent::ReviewAnalyzed { data, .. } => &data.tenant_id,
        }
    }
}
