//! Background pipeline services and read-side aggregation

pub mod analytics;
pub mod analyzer;
pub mod dispatcher;

pub use analytics::AnalyticsAggregator;
pub use analyzer::AnalysisWorker;
pub use dispatcher::Dispatcher;
