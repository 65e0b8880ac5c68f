//! Analytics handler

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::models::ReviewPeriod;
use crate::services::analytics::AnalyticsReport;
use crate::AppState;

pub fn analytics_routes() -> Router<AppState> {
    Router::new().route("/api/businesses/:tenant_id/analytics", get(tenant_analytics))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub period: ReviewPeriod,
}

/// GET /api/businesses/:tenant_id/analytics?period=daily|weekly|monthly|all
pub async fn tenant_analytics(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<AnalyticsReport>> {
    let report = state
        .analytics
        .report(&tenant_id, query.period)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(report))
}
