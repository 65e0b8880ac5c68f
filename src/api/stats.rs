//! Dashboard statistics handler

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::db::reviews;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn stats_routes() -> Router<AppState> {
    Router::new().route("/api/businesses/:tenant_id/stats", get(tenant_stats))
}

/// GET stats response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_reviews: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    /// Daily positive-review counts for the trailing week, oldest day first
    pub trend: Vec<i64>,
}

/// GET /api/businesses/:tenant_id/stats
pub async fn tenant_stats(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Json<StatsResponse>> {
    let stats = reviews::tenant_stats(&state.db, &tenant_id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(StatsResponse {
        total_reviews: stats.total,
        positive: stats.positive,
        negative: stats.negative,
        neutral: stats.neutral,
        trend: stats.trend,
    }))
}
