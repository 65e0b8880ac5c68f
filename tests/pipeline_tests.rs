//! End-to-end tests for the ingestion pipeline
//!
//! Drives enqueue → claim → analysis → finalized review against a real
//! database, with stub sentiment engines injected through the registry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use reviewd::broadcast::BroadcastHub;
use reviewd::db::{reviews, submissions};
use reviewd::engine::{EngineError, EngineRegistry, SentimentEngine};
use reviewd::models::{Aspect, Sentiment, SubmissionStatus};
use reviewd::services::{AnalysisWorker, AnalyticsAggregator, Dispatcher};

/// Engine stub returning a fixed aspect list
struct StubEngine {
    aspects: Vec<Aspect>,
}

#[async_trait]
impl SentimentEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn analyze(&self, _text: &str) -> Result<Vec<Aspect>, EngineError> {
        Ok(self.aspects.clone())
    }
}

/// Engine stub that is always unreachable
struct UnavailableEngine;

#[async_trait]
impl SentimentEngine for UnavailableEngine {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn analyze(&self, _text: &str) -> Result<Vec<Aspect>, EngineError> {
        Err(EngineError::Network("connection refused".to_string()))
    }
}

fn aspect(term: &str, category: &str, sentiment: Sentiment) -> Aspect {
    Aspect {
        term: term.to_string(),
        category: category.to_string(),
        sentiment,
    }
}

async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let pool = reviewd::db::init_database(&dir.path().join("test.db"))
        .await
        .expect("Should initialize test database");
    (dir, pool)
}

fn registry_with(model_type: &str, engine: Arc<dyn SentimentEngine>) -> Arc<EngineRegistry> {
    let mut registry = EngineRegistry::new();
    registry.register(model_type.to_string(), engine);
    Arc::new(registry)
}

async fn enqueue_default(pool: &SqlitePool, tenant_id: &str, text: &str) -> i64 {
    submissions::enqueue(pool, tenant_id, text, Some("Pat"), Some(5.0), "hotel")
        .await
        .expect("Should enqueue")
}

async fn review_count(pool: &SqlitePool, tenant_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE tenant_id = ?")
        .bind(tenant_id)
        .fetch_one(pool)
        .await
        .expect("Should count reviews")
}

// =============================================================================
// Queue claiming
// =============================================================================

#[tokio::test]
async fn test_claim_batch_oldest_first_without_repeat() {
    let (_dir, db) = setup_test_db().await;

    let first = enqueue_default(&db, "t1", "first").await;
    let second = enqueue_default(&db, "t1", "second").await;
    let third = enqueue_default(&db, "t1", "third").await;

    let claimed = submissions::claim_batch(&db, 2).await.unwrap();
    assert_eq!(claimed, vec![first, second]);

    // Claimed rows are gone from the pending set
    let rest = submissions::claim_batch(&db, 5).await.unwrap();
    assert_eq!(rest, vec![third]);

    assert!(submissions::claim_batch(&db, 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_claims_never_share_a_submission() {
    let (_dir, db) = setup_test_db().await;

    for i in 0..6 {
        enqueue_default(&db, "t1", &format!("review {}", i)).await;
    }

    let (a, b) = tokio::join!(
        submissions::claim_batch(&db, 4),
        submissions::claim_batch(&db, 4)
    );
    let a = a.unwrap();
    let b = b.unwrap();

    for id in &a {
        assert!(!b.contains(id), "submission {} claimed twice", id);
    }
    assert_eq!(a.len() + b.len(), 6);
}

#[tokio::test]
async fn test_requeue_stale_returns_claims_to_pending() {
    let (_dir, db) = setup_test_db().await;

    let id = enqueue_default(&db, "t1", "left behind").await;
    let claimed = submissions::claim_batch(&db, 5).await.unwrap();
    assert_eq!(claimed, vec![id]);

    let requeued = submissions::requeue_stale(&db).await.unwrap();
    assert_eq!(requeued, 1);

    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);

    // And it is claimable again
    assert_eq!(submissions::claim_batch(&db, 5).await.unwrap(), vec![id]);
}

// =============================================================================
// Analysis worker
// =============================================================================

#[tokio::test]
async fn test_worker_finalizes_with_aspects_and_notifies() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine {
            aspects: vec![aspect("spotless", "cleanliness", Sentiment::Positive)],
        }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub.clone());

    let (_conn, mut events) = hub.connect("t1").await;

    let id = enqueue_default(&db, "t1", "Great stay").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Completed);

    let listed = reviews::list_with_aspects(&db, "t1", None, None).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].review.overall_sentiment, Sentiment::Positive);
    assert_eq!(listed[0].aspects.len(), 1);

    let event = events.try_recv().expect("Should receive review_analyzed");
    assert_eq!(event.event_type(), "review_analyzed");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["data"]["aspect_count"], 1);
    assert_eq!(json["data"]["sentiment"], "positive");
}

#[tokio::test]
async fn test_worker_with_unavailable_engine_finalizes_neutral() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with("hotel", Arc::new(UnavailableEngine));
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "Fine I guess").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Completed);

    let listed = reviews::list_with_aspects(&db, "t1", None, None).await.unwrap();
    assert_eq!(listed[0].review.overall_sentiment, Sentiment::Neutral);
    assert!(listed[0].aspects.is_empty());
}

#[tokio::test]
async fn test_worker_with_unregistered_model_finalizes_neutral() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let worker = AnalysisWorker::new(db.clone(), Arc::new(EngineRegistry::new()), hub);

    let id = enqueue_default(&db, "t1", "No engine here").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Completed);
    assert_eq!(review_count(&db, "t1").await, 1);
}

#[tokio::test]
async fn test_worker_deduplicates_repeated_aspect_pairs() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine {
            aspects: vec![
                aspect("spotless", "cleanliness", Sentiment::Positive),
                aspect("tidy", "cleanliness", Sentiment::Positive),
            ],
        }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "Clean clean clean").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let listed = reviews::list_with_aspects(&db, "t1", None, None).await.unwrap();
    assert_eq!(listed[0].aspects.len(), 1);

    let facts = reviews::aspects_for_review(&db, listed[0].review.id).await.unwrap();
    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].term, "spotless");
}

#[tokio::test]
async fn test_persistence_failure_marks_failed_without_partial_rows() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine {
            aspects: vec![aspect("rude", "service", Sentiment::Negative)],
        }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "Terrible service").await;
    submissions::claim_batch(&db, 5).await.unwrap();

    // Break the aspect insert mid-transaction; the review insert succeeds
    // first, so rollback must erase it
    sqlx::query("DROP TABLE aspect_sentiments")
        .execute(&db)
        .await
        .unwrap();

    assert!(worker.process(id).await.is_err());

    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Failed);
    assert_eq!(review_count(&db, "t1").await, 0);
}

#[tokio::test]
async fn test_worker_skips_submission_not_claimed() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine { aspects: vec![] }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "still pending").await;

    // Never claimed: the worker must not touch it
    worker.process(id).await.unwrap();
    let submission = submissions::get(&db, id).await.unwrap().unwrap();
    assert_eq!(submission.status, SubmissionStatus::Pending);
    assert_eq!(review_count(&db, "t1").await, 0);

    // Completed: a second execution is a silent no-op
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();
    worker.process(id).await.unwrap();
    assert_eq!(review_count(&db, "t1").await, 1);
}

#[tokio::test]
async fn test_identical_texts_produce_independent_reviews() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine { aspects: vec![] }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let first = enqueue_default(&db, "t1", "Great stay").await;
    let second = enqueue_default(&db, "t1", "Great stay").await;
    assert_ne!(first, second);

    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(first).await.unwrap();
    worker.process(second).await.unwrap();

    let listed = reviews::list_with_aspects(&db, "t1", None, None).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_ne!(listed[0].review.id, listed[1].review.id);
}

// =============================================================================
// Dispatcher
// =============================================================================

async fn wait_for_terminal(db: &SqlitePool, id: i64) -> SubmissionStatus {
    for _ in 0..100 {
        let submission = submissions::get(db, id).await.unwrap().unwrap();
        if submission.status.is_terminal() {
            return submission.status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("submission {} never reached a terminal status", id);
}

#[tokio::test]
async fn test_dispatcher_drains_queue_end_to_end() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine {
            aspects: vec![aspect("spotless", "cleanliness", Sentiment::Positive)],
        }),
    );

    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        db.clone(),
        engines,
        hub,
        Duration::from_millis(50),
        5,
        cancel.clone(),
    );
    let handle = tokio::spawn(dispatcher.run());

    let first = enqueue_default(&db, "t1", "Great stay").await;
    let second = enqueue_default(&db, "t1", "Lovely breakfast").await;

    assert_eq!(wait_for_terminal(&db, first).await, SubmissionStatus::Completed);
    assert_eq!(wait_for_terminal(&db, second).await, SubmissionStatus::Completed);
    assert_eq!(review_count(&db, "t1").await, 2);

    cancel.cancel();
    handle.await.expect("Dispatcher task should finish");
}

#[tokio::test]
async fn test_dispatcher_stops_promptly_when_cancelled() {
    let (_dir, db) = setup_test_db().await;
    let cancel = CancellationToken::new();
    let dispatcher = Dispatcher::new(
        db,
        Arc::new(EngineRegistry::new()),
        BroadcastHub::new(),
        Duration::from_millis(50),
        5,
        cancel.clone(),
    );
    let handle = tokio::spawn(dispatcher.run());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("Dispatcher should stop after cancellation")
        .expect("Dispatcher task should not panic");
}

// =============================================================================
// Analytics over pipeline output
// =============================================================================

#[tokio::test]
async fn test_analytics_reflects_pipeline_results() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with(
        "hotel",
        Arc::new(StubEngine {
            aspects: vec![
                aspect("rude staff", "service", Sentiment::Negative),
                aspect("spotless", "cleanliness", Sentiment::Positive),
            ],
        }),
    );
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "Rude staff but very clean").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let aggregator = AnalyticsAggregator::new(db);
    let report = aggregator
        .report("t1", reviewd::models::ReviewPeriod::All)
        .await
        .unwrap();

    assert_eq!(report.total_reviews, 1);
    assert_eq!(
        report.positive_count + report.negative_count + report.neutral_count,
        report.total_reviews
    );
    assert_eq!(report.category_breakdown.len(), 2);
    assert_eq!(report.top_issues.len(), 1);
    assert_eq!(report.top_issues[0].category, "service");
    assert_eq!(report.top_issues[0].count, 1);
    assert_eq!(report.recommendations.len(), 1);
}

// =============================================================================
// Uniqueness of finalized review ids
// =============================================================================

#[tokio::test]
async fn test_review_ids_are_opaque_uuids() {
    let (_dir, db) = setup_test_db().await;
    let hub = BroadcastHub::new();
    let engines = registry_with("hotel", Arc::new(StubEngine { aspects: vec![] }));
    let worker = AnalysisWorker::new(db.clone(), engines, hub);

    let id = enqueue_default(&db, "t1", "hello").await;
    submissions::claim_batch(&db, 5).await.unwrap();
    worker.process(id).await.unwrap();

    let listed = reviews::list_with_aspects(&db, "t1", None, None).await.unwrap();
    assert_ne!(listed[0].review.id, Uuid::nil());
}
