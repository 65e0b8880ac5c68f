//! On-demand analytics aggregation
//!
//! Recomputes a tenant dashboard from stored facts on every call: overall
//! sentiment tallies come from the finalized reviews (per-review verdicts),
//! the category breakdown from aspect facts (per-aspect detail). Pure reads;
//! safe to run concurrently with the pipeline's writers, tolerating a
//! partially updated snapshot.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::reviews;
use crate::error::Result;
use crate::models::{preview, ReviewPeriod, Sentiment};

/// Number of categories ranked as top issues
const TOP_ISSUE_LIMIT: usize = 5;

/// Number of example reviews attached per issue
const EXAMPLE_LIMIT: i64 = 5;

/// Number of issues that receive a recommendation
const RECOMMENDATION_LIMIT: usize = 3;

/// Issue severity, classified from the distinct-review complaint count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// high for more than 10 complaining reviews, medium for more than 5
    fn classify(distinct_reviews: i64) -> Self {
        if distinct_reviews > 10 {
            Severity::High
        } else if distinct_reviews > 5 {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

/// Aspect mention counts for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub total: i64,
}

/// A truncated review excerpt attached to a top issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueExample {
    pub term: String,
    pub review_text: String,
}

/// One ranked complaint category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopIssue {
    pub category: String,
    /// Distinct reviews carrying a negative aspect in this category
    pub count: i64,
    pub severity: Severity,
    pub examples: Vec<IssueExample>,
}

/// Full analytics output for one tenant and period
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub total_reviews: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub neutral_count: i64,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub top_issues: Vec<TopIssue>,
    pub recommendations: Vec<String>,
}

impl AnalyticsReport {
    fn empty() -> Self {
        Self {
            total_reviews: 0,
            positive_count: 0,
            negative_count: 0,
            neutral_count: 0,
            category_breakdown: Vec::new(),
            top_issues: Vec::new(),
            recommendations: Vec::new(),
        }
    }
}

#[derive(Default, Clone, Copy)]
struct CategoryCounts {
    positive: i64,
    negative: i64,
    neutral: i64,
}

/// Read-side dashboard computation over the store
#[derive(Clone)]
pub struct AnalyticsAggregator {
    db: SqlitePool,
}

impl AnalyticsAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Build the analytics report for a tenant over a trailing window
    pub async fn report(&self, tenant_id: &str, period: ReviewPeriod) -> Result<AnalyticsReport> {
        let cutoff = period.cutoff(Utc::now());

        let (total, positive, negative, neutral) =
            reviews::sentiment_counts(&self.db, tenant_id, cutoff).await?;
        if total == 0 {
            return Ok(AnalyticsReport::empty());
        }

        // Per-category aspect tallies; BTreeMap keeps category order stable
        let mentions = reviews::aspect_mentions(&self.db, tenant_id, cutoff).await?;
        let mut stats: BTreeMap<String, CategoryCounts> = BTreeMap::new();
        for (category, sentiment) in mentions {
            if category.is_empty() {
                continue;
            }
            let counts = stats.entry(category).or_default();
            match sentiment {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Negative => counts.negative += 1,
                Sentiment::Neutral => counts.neutral += 1,
            }
        }

        let mut ranked: Vec<(&String, &CategoryCounts)> = stats.iter().collect();
        ranked.sort_by(|a, b| b.1.negative.cmp(&a.1.negative));

        let mut top_issues = Vec::new();
        for (category, counts) in ranked.into_iter().take(TOP_ISSUE_LIMIT) {
            if counts.negative == 0 {
                continue;
            }

            let count =
                reviews::distinct_negative_reviews(&self.db, tenant_id, category, cutoff).await?;
            let examples =
                reviews::negative_example_reviews(&self.db, tenant_id, category, cutoff, EXAMPLE_LIMIT)
                    .await?
                    .into_iter()
                    .map(|(_id, text)| IssueExample {
                        term: category.clone(),
                        review_text: preview(&text),
                    })
                    .collect();

            top_issues.push(TopIssue {
                category: category.clone(),
                count,
                severity: Severity::classify(count),
                examples,
            });
        }

        let recommendations = top_issues
            .iter()
            .take(RECOMMENDATION_LIMIT)
            .map(|issue| {
                let noun = if issue.count == 1 { "customer" } else { "customers" };
                format!(
                    "Address {} complaints - {} {} reported this issue",
                    issue.category, issue.count, noun
                )
            })
            .collect();

        let category_breakdown = stats
            .into_iter()
            .map(|(name, counts)| CategoryBreakdown {
                name,
                positive: counts.positive,
                negative: counts.negative,
                neutral: counts.neutral,
                total: counts.positive + counts.negative + counts.neutral,
            })
            .collect();

        Ok(AnalyticsReport {
            total_reviews: total,
            positive_count: positive,
            negative_count: negative,
            neutral_count: neutral,
            category_breakdown,
            top_issues,
            recommendations,
        })
    }
}
