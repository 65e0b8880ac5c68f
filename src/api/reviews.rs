//! Review submission and listing handlers
//!
//! Submission is fire-and-forget: the caller gets a queue id back as soon as
//! the row is persisted, and everything downstream (analysis, failure) is
//! observable only through the live channel or follow-up queries.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{reviews, submissions};
use crate::error::{ApiError, ApiResult};
use crate::events::{NewReviewData, ReviewEvent};
use crate::models::{preview, Sentiment, DEFAULT_CUSTOMER_NAME, DEFAULT_RATING};
use crate::AppState;

pub fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/api/reviews", post(submit_review))
        .route("/api/businesses/:tenant_id/reviews", get(list_reviews))
}

/// POST /api/reviews request
#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub tenant_id: String,
    pub text: String,
    pub customer_name: Option<String>,
    pub rating: Option<f64>,
    pub model_type: String,
}

/// POST /api/reviews response
#[derive(Debug, Serialize)]
pub struct SubmitReviewResponse {
    pub success: bool,
    pub message: String,
    pub review_id: i64,
}

/// POST /api/reviews
///
/// Validates, enqueues a pending submission, pushes the `new_review` event
/// to the tenant's live subscribers, and returns without waiting for
/// analysis.
pub async fn submit_review(
    State(state): State<AppState>,
    Json(request): Json<SubmitReviewRequest>,
) -> ApiResult<Json<SubmitReviewResponse>> {
    let customer_name = request
        .customer_name
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_CUSTOMER_NAME)
        .to_string();
    let rating = request.rating.unwrap_or(DEFAULT_RATING);

    let id = submissions::enqueue(
        &state.db,
        &request.tenant_id,
        &request.text,
        Some(customer_name.as_str()),
        Some(rating),
        &request.model_type,
    )
    .await
    .map_err(ApiError::from)?;

    tracing::info!(
        submission_id = id,
        tenant_id = %request.tenant_id,
        "Review submission enqueued"
    );

    // Best-effort; a failed send only drops that subscriber
    state
        .hub
        .broadcast(ReviewEvent::NewReview {
            message: "New review received!".to_string(),
            data: NewReviewData {
                id,
                tenant_id: request.tenant_id.clone(),
                customer_name,
                rating,
                preview: preview(&request.text),
                status: "pending".to_string(),
            },
        })
        .await;

    Ok(Json(SubmitReviewResponse {
        success: true,
        message: "Review received! Analysis in progress...".to_string(),
        review_id: id,
    }))
}

/// Query parameters for the review listing
#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    pub sentiment: Option<String>,
    pub category: Option<String>,
}

/// One aspect pair on a listed review
#[derive(Debug, Serialize)]
pub struct AspectItem {
    pub category: String,
    pub sentiment: Sentiment,
}

/// One listed review with its aspects
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewItem {
    pub id: Uuid,
    pub text: String,
    pub customer_name: String,
    pub rating: f64,
    pub date: DateTime<Utc>,
    pub aspects: Vec<AspectItem>,
    pub overall_sentiment: Sentiment,
}

/// GET /api/businesses/:tenant_id/reviews
///
/// Finalized reviews newest first. `sentiment` and `category` narrow to
/// reviews carrying at least one matching aspect; `sentiment=all` is the
/// same as omitting it.
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<ListReviewsQuery>,
) -> ApiResult<Json<Vec<ReviewItem>>> {
    let sentiment = match query.sentiment.as_deref() {
        None | Some("all") | Some("") => None,
        Some("positive") => Some(Sentiment::Positive),
        Some("negative") => Some(Sentiment::Negative),
        Some("neutral") => Some(Sentiment::Neutral),
        Some(other) => {
            return Err(ApiError::BadRequest(format!(
                "Unknown sentiment filter: {}",
                other
            )))
        }
    };

    let listed = reviews::list_with_aspects(
        &state.db,
        &tenant_id,
        sentiment,
        query.category.as_deref(),
    )
    .await
    .map_err(ApiError::from)?;

    let items = listed
        .into_iter()
        .map(|entry| ReviewItem {
            id: entry.review.id,
            text: entry.review.text,
            customer_name: entry.review.customer_name,
            rating: entry.review.rating,
            date: entry.review.date,
            aspects: entry
                .aspects
                .into_iter()
                .map(|(category, sentiment)| AspectItem {
                    category,
                    sentiment,
                })
                .collect(),
            overall_sentiment: entry.review.overall_sentiment,
        })
        .collect();

    Ok(Json(items))
}
