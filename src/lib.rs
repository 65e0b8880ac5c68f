//! reviewd library interface
//!
//! Exposes the pipeline components and HTTP surface for integration testing.

pub mod api;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult, Error, Result};

use axum::Router;
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::broadcast::BroadcastHub;
use crate::services::AnalyticsAggregator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Live-update fan-out registry
    pub hub: BroadcastHub,
    /// Read-side dashboard computation
    pub analytics: AnalyticsAggregator,
}

impl AppState {
    pub fn new(db: SqlitePool, hub: BroadcastHub) -> Self {
        let analytics = AnalyticsAggregator::new(db.clone());
        Self { db, hub, analytics }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::review_routes())
        .merge(api::stats_routes())
        .merge(api::analytics_routes())
        .merge(api::auth_routes())
        .merge(api::health_routes())
        .merge(api::ws_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
