//! Per-submission analysis worker
//!
//! One worker execution takes a claimed submission end to end: engine call,
//! overall-sentiment derivation, transactional persistence, and the
//! post-commit live notification. An engine outage degrades to zero aspects;
//! only persistence failures mark the submission failed.

use std::collections::HashSet;
use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broadcast::BroadcastHub;
use crate::db::{reviews, submissions};
use crate::engine::EngineRegistry;
use crate::error::Result;
use crate::events::{AnalyzedReviewData, ReviewEvent};
use crate::models::{preview, Aspect, AspectFact, RawSubmission, Review, Sentiment};

/// Worker context shared by all analysis executions
#[derive(Clone)]
pub struct AnalysisWorker {
    db: SqlitePool,
    engines: Arc<EngineRegistry>,
    hub: BroadcastHub,
}

impl AnalysisWorker {
    pub fn new(db: SqlitePool, engines: Arc<EngineRegistry>, hub: BroadcastHub) -> Self {
        Self { db, engines, hub }
    }

    /// Process one claimed submission.
    ///
    /// Silently skips submissions that are no longer claimed (another
    /// execution already finished them). The `review_analyzed` event is
    /// broadcast only after the transaction commits, so a subscriber that
    /// receives it can immediately query the finalized review.
    pub async fn process(&self, submission_id: i64) -> Result<()> {
        let Some(submission) = submissions::load_claimed(&self.db, submission_id).await? else {
            debug!(submission_id, "Submission no longer claimed, skipping");
            return Ok(());
        };

        let aspects = dedup_aspects(self.analyze_text(&submission).await);
        let overall = dominant_sentiment(&aspects);

        let review = Review {
            id: Uuid::new_v4(),
            tenant_id: submission.tenant_id.clone(),
            text: submission.text.clone(),
            customer_name: submission.customer_name.clone(),
            rating: submission.rating,
            date: submission.submitted_at,
            overall_sentiment: overall,
        };
        let facts: Vec<AspectFact> = aspects
            .into_iter()
            .map(|aspect| AspectFact {
                review_id: review.id,
                term: aspect.term,
                category: aspect.category,
                sentiment: aspect.sentiment,
            })
            .collect();

        if let Err(e) = reviews::insert_analysis(&self.db, &review, &facts, submission.id).await {
            error!(
                submission_id,
                error = %e,
                "Failed to persist analysis, marking submission failed"
            );
            if let Err(mark_err) = submissions::mark_failed(&self.db, submission.id).await {
                error!(submission_id, error = %mark_err, "Failed to mark submission failed");
            }
            return Err(e);
        }

        info!(
            submission_id,
            review_id = %review.id,
            aspect_count = facts.len(),
            sentiment = %overall,
            "Submission analyzed"
        );

        self.hub
            .broadcast(ReviewEvent::ReviewAnalyzed {
                message: "Review analysis completed!".to_string(),
                data: AnalyzedReviewData {
                    id: submission.id,
                    tenant_id: submission.tenant_id.clone(),
                    customer_name: submission.customer_name.clone(),
                    rating: submission.rating,
                    preview: preview(&submission.text),
                    aspect_count: facts.len(),
                    sentiment: overall,
                },
            })
            .await;

        Ok(())
    }

    /// Run the engine for the submission's model type.
    ///
    /// A missing engine or an engine failure both yield an empty aspect
    /// list; the review still finalizes (as neutral).
    async fn analyze_text(&self, submission: &RawSubmission) -> Vec<Aspect> {
        let Some(engine) = self.engines.get(&submission.model_type) else {
            warn!(
                model_type = %submission.model_type,
                "No sentiment engine registered for model type"
            );
            return Vec::new();
        };

        match engine.analyze(&submission.text).await {
            Ok(aspects) => aspects,
            Err(e) => {
                warn!(
                    engine = engine.name(),
                    error = %e,
                    "Sentiment engine unavailable, treating as no aspects"
                );
                Vec::new()
            }
        }
    }
}

/// Majority vote over aspect sentiment labels.
///
/// Ties resolve to the first label in the fixed order positive, negative,
/// neutral; zero aspects vote neutral.
pub fn dominant_sentiment(aspects: &[Aspect]) -> Sentiment {
    if aspects.is_empty() {
        return Sentiment::Neutral;
    }

    let mut positive = 0usize;
    let mut negative = 0usize;
    let mut neutral = 0usize;
    for aspect in aspects {
        match aspect.sentiment {
            Sentiment::Positive => positive += 1,
            Sentiment::Negative => negative += 1,
            Sentiment::Neutral => neutral += 1,
        }
    }

    let mut best = Sentiment::Positive;
    let mut best_count = positive;
    for (sentiment, count) in [(Sentiment::Negative, negative), (Sentiment::Neutral, neutral)] {
        if count > best_count {
            best = sentiment;
            best_count = count;
        }
    }
    best
}

/// Deduplicate aspects by (category, sentiment), keeping the first term seen
pub fn dedup_aspects(aspects: Vec<Aspect>) -> Vec<Aspect> {
    let mut seen: HashSet<(String, Sentiment)> = HashSet::new();
    aspects
        .into_iter()
        .filter(|aspect| seen.insert((aspect.category.clone(), aspect.sentiment)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aspect(term: &str, category: &str, sentiment: Sentiment) -> Aspect {
        Aspect {
            term: term.to_string(),
            category: category.to_string(),
            sentiment,
        }
    }

    #[test]
    fn test_majority_vote_picks_most_common() {
        let aspects = vec![
            aspect("x", "cleanliness", Sentiment::Positive),
            aspect("y", "service", Sentiment::Negative),
            aspect("z", "location", Sentiment::Positive),
        ];
        assert_eq!(dominant_sentiment(&aspects), Sentiment::Positive);
    }

    #[test]
    fn test_zero_aspects_vote_neutral() {
        assert_eq!(dominant_sentiment(&[]), Sentiment::Neutral);
    }

    #[test]
    fn test_three_way_tie_picks_positive() {
        let aspects = vec![
            aspect("a", "c1", Sentiment::Positive),
            aspect("b", "c2", Sentiment::Negative),
            aspect("c", "c3", Sentiment::Neutral),
        ];
        assert_eq!(dominant_sentiment(&aspects), Sentiment::Positive);
    }

    #[test]
    fn test_negative_neutral_tie_picks_negative() {
        let aspects = vec![
            aspect("a", "c1", Sentiment::Negative),
            aspect("b", "c2", Sentiment::Neutral),
        ];
        assert_eq!(dominant_sentiment(&aspects), Sentiment::Negative);
    }

    #[test]
    fn test_dedup_keeps_first_term_per_pair() {
        let aspects = vec![
            aspect("spotless", "cleanliness", Sentiment::Positive),
            aspect("tidy", "cleanliness", Sentiment::Positive),
            aspect("dirty lobby", "cleanliness", Sentiment::Negative),
        ];
        let deduped = dedup_aspects(aspects);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].term, "spotless");
        assert_eq!(deduped[1].term, "dirty lobby");
    }

    #[test]
    fn test_dedup_preserves_distinct_categories() {
        let aspects = vec![
            aspect("a", "service", Sentiment::Positive),
            aspect("b", "food", Sentiment::Positive),
        ];
        assert_eq!(dedup_aspects(aspects).len(), 2);
    }
}
