//! HTTP API handlers

pub mod analytics;
pub mod auth;
pub mod health;
pub mod reviews;
pub mod stats;
pub mod ws;

pub use analytics::analytics_routes;
pub use auth::auth_routes;
pub use health::health_routes;
pub use reviews::review_routes;
pub use stats::stats_routes;
pub use ws::ws_routes;
