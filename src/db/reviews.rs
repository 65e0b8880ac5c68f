//! Finalized review and aspect fact queries
//!
//! Writes happen only through [`insert_analysis`], which commits the review,
//! its aspect facts, and the submission's terminal status as one unit. The
//! read side backs the listing, dashboard stats, and analytics queries; all
//! of it tolerates running concurrently with the pipeline's writers.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{AspectFact, Review, Sentiment};

/// Persist one analysis result: the finalized review, its aspect facts, and
/// the owning submission's completed status, in a single transaction.
///
/// If anything fails the transaction rolls back and no partial rows remain;
/// the caller is expected to mark the submission failed instead.
pub async fn insert_analysis(
    pool: &SqlitePool,
    review: &Review,
    aspects: &[AspectFact],
    submission_id: i64,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO reviews (id, tenant_id, text, customer_name, rating, date, overall_sentiment)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(review.id.to_string())
    .bind(&review.tenant_id)
    .bind(&review.text)
    .bind(&review.customer_name)
    .bind(review.rating)
    .bind(review.date.to_rfc3339())
    .bind(review.overall_sentiment.as_str())
    .execute(&mut *tx)
    .await?;

    for aspect in aspects {
        sqlx::query(
            r#"
            INSERT INTO aspect_sentiments (review_id, term, category, sentiment)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(aspect.review_id.to_string())
        .bind(&aspect.term)
        .bind(&aspect.category)
        .bind(aspect.sentiment.as_str())
        .execute(&mut *tx)
        .await?;
    }

    let updated = sqlx::query(
        "UPDATE raw_submissions SET status = 'completed' WHERE id = ? AND status = 'in_progress'",
    )
    .bind(submission_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() != 1 {
        return Err(Error::Internal(format!(
            "Submission {} was not in_progress at completion time",
            submission_id
        )));
    }

    tx.commit().await?;
    Ok(())
}

/// One finalized review with its deduplicated (category, sentiment) aspects
#[derive(Debug, Clone)]
pub struct ReviewWithAspects {
    pub review: Review,
    pub aspects: Vec<(String, Sentiment)>,
}

/// List a tenant's finalized reviews, newest first, with their aspects.
///
/// Optional filters narrow by aspect sentiment and category; a filtered
/// listing only returns reviews carrying at least one matching aspect.
/// Aspect pairs are deduplicated by (category, sentiment) per review.
pub async fn list_with_aspects(
    pool: &SqlitePool,
    tenant_id: &str,
    sentiment: Option<Sentiment>,
    category: Option<&str>,
) -> Result<Vec<ReviewWithAspects>> {
    let sentiment_filter = sentiment.map(|s| s.as_str().to_string());
    let category_filter = category.map(|c| c.to_string());

    let rows = sqlx::query(
        r#"
        SELECT r.id, r.tenant_id, r.text, r.customer_name, r.rating, r.date,
               r.overall_sentiment, a.category, a.sentiment
        FROM reviews r
        LEFT JOIN aspect_sentiments a ON r.id = a.review_id
        WHERE r.tenant_id = ?
          AND (? IS NULL OR a.sentiment = ?)
          AND (? IS NULL OR a.category = ?)
        ORDER BY r.date DESC, r.id DESC
        "#,
    )
    .bind(tenant_id)
    .bind(&sentiment_filter)
    .bind(&sentiment_filter)
    .bind(&category_filter)
    .bind(&category_filter)
    .fetch_all(pool)
    .await?;

    let mut ordered: Vec<ReviewWithAspects> = Vec::new();
    let mut index_by_id: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for row in rows {
        let id: String = row.get("id");
        let entry_index = match index_by_id.get(&id) {
            Some(&i) => i,
            None => {
                let review = Review {
                    id: parse_uuid(&id)?,
                    tenant_id: row.get("tenant_id"),
                    text: row.get("text"),
                    customer_name: row.get("customer_name"),
                    rating: row.get("rating"),
                    date: parse_timestamp(row.get("date"))?,
                    overall_sentiment: Sentiment::from_label(row.get("overall_sentiment")),
                };
                ordered.push(ReviewWithAspects {
                    review,
                    aspects: Vec::new(),
                });
                index_by_id.insert(id, ordered.len() - 1);
                ordered.len() - 1
            }
        };

        let aspect_category: Option<String> = row.get("category");
        let aspect_sentiment: Option<String> = row.get("sentiment");
        if let (Some(cat), Some(sent)) = (aspect_category, aspect_sentiment) {
            let sent = Sentiment::from_label(&sent);
            let entry = &mut ordered[entry_index];
            if !entry.aspects.iter().any(|(c, s)| *c == cat && *s == sent) {
                entry.aspects.push((cat, sent));
            }
        }
    }

    Ok(ordered)
}

/// Dashboard stats: totals plus a 7-point daily positive-review trend
#[derive(Debug, Clone)]
pub struct TenantStats {
    pub total: i64,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    /// Daily positive-review counts for the trailing week, oldest day first
    pub trend: Vec<i64>,
}

pub async fn tenant_stats(pool: &SqlitePool, tenant_id: &str) -> Result<TenantStats> {
    let (total, positive, negative, neutral) =
        sentiment_counts(pool, tenant_id, None).await?;

    let today = Utc::now().date_naive();
    let mut trend = Vec::with_capacity(7);
    for days_back in (0..7).rev() {
        let day = today - chrono::Duration::days(days_back);
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reviews
            WHERE tenant_id = ? AND overall_sentiment = 'positive' AND date(date) = ?
            "#,
        )
        .bind(tenant_id)
        .bind(day.format("%Y-%m-%d").to_string())
        .fetch_one(pool)
        .await?;
        trend.push(count);
    }

    Ok(TenantStats {
        total,
        positive,
        negative,
        neutral,
        trend,
    })
}

/// Tally overall sentiments for a tenant within an optional trailing window.
///
/// Returns (total, positive, negative, neutral); the three labels always sum
/// to the total.
pub async fn sentiment_counts(
    pool: &SqlitePool,
    tenant_id: &str,
    cutoff: Option<DateTime<Utc>>,
) -> Result<(i64, i64, i64, i64)> {
    let cutoff = cutoff.map(|c| c.to_rfc3339());

    let labels: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT overall_sentiment FROM reviews
        WHERE tenant_id = ? AND (? IS NULL OR date >= ?)
        "#,
    )
    .bind(tenant_id)
    .bind(&cutoff)
    .bind(&cutoff)
    .fetch_all(pool)
    .await?;

    let mut positive = 0i64;
    let mut negative = 0i64;
    let mut neutral = 0i64;
    for label in &labels {
        match Sentiment::from_label(label) {
            Sentiment::Positive => positive += 1,
            Sentiment::Negative => negative += 1,
            Sentiment::Neutral => neutral += 1,
        }
    }

    Ok((labels.len() as i64, positive, negative, neutral))
}

/// All (category, sentiment) aspect mentions for a tenant within a window,
/// joined through their owning reviews
pub async fn aspect_mentions(
    pool: &SqlitePool,
    tenant_id: &str,
    cutoff: Option<DateTime<Utc>>,
) -> Result<Vec<(String, Sentiment)>> {
    let cutoff = cutoff.map(|c| c.to_rfc3339());

    let rows = sqlx::query(
        r#"
        SELECT a.category, a.sentiment
        FROM aspect_sentiments a
        JOIN reviews r ON a.review_id = r.id
        WHERE r.tenant_id = ? AND (? IS NULL OR r.date >= ?)
        "#,
    )
    .bind(tenant_id)
    .bind(&cutoff)
    .bind(&cutoff)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let category: String = row.get("category");
            let sentiment: String = row.get("sentiment");
            (category, Sentiment::from_label(&sentiment))
        })
        .collect())
}

/// Count distinct reviews carrying a negative aspect in a category
pub async fn distinct_negative_reviews(
    pool: &SqlitePool,
    tenant_id: &str,
    category: &str,
    cutoff: Option<DateTime<Utc>>,
) -> Result<i64> {
    let cutoff = cutoff.map(|c| c.to_rfc3339());

    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(DISTINCT r.id)
        FROM reviews r
        JOIN aspect_sentiments a ON r.id = a.review_id
        WHERE r.tenant_id = ? AND a.category = ? AND a.sentiment = 'negative'
          AND (? IS NULL OR r.date >= ?)
        "#,
    )
    .bind(tenant_id)
    .bind(category)
    .bind(&cutoff)
    .bind(&cutoff)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Most recent reviews carrying a negative aspect in a category, for use as
/// analytics examples. Each review appears once.
pub async fn negative_example_reviews(
    pool: &SqlitePool,
    tenant_id: &str,
    category: &str,
    cutoff: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<Vec<(Uuid, String)>> {
    let cutoff = cutoff.map(|c| c.to_rfc3339());

    let rows = sqlx::query(
        r#"
        SELECT r.id, r.text
        FROM reviews r
        WHERE r.tenant_id = ? AND (? IS NULL OR r.date >= ?)
          AND r.id IN (
              SELECT DISTINCT a.review_id
              FROM aspect_sentiments a
              WHERE a.category = ? AND a.sentiment = 'negative'
          )
        ORDER BY r.date DESC
        LIMIT ?
        "#,
    )
    .bind(tenant_id)
    .bind(&cutoff)
    .bind(&cutoff)
    .bind(category)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let id: String = row.get("id");
            let text: String = row.get("text");
            Ok((parse_uuid(&id)?, text))
        })
        .collect()
}

/// Fetch the aspect facts stored for one review
pub async fn aspects_for_review(pool: &SqlitePool, review_id: Uuid) -> Result<Vec<AspectFact>> {
    let rows = sqlx::query(
        "SELECT review_id, term, category, sentiment FROM aspect_sentiments WHERE review_id = ?",
    )
    .bind(review_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let review_id: String = row.get("review_id");
            let sentiment: String = row.get("sentiment");
            Ok(AspectFact {
                review_id: parse_uuid(&review_id)?,
                term: row.get("term"),
                category: row.get("category"),
                sentiment: Sentiment::from_label(&sentiment),
            })
        })
        .collect()
}

fn parse_uuid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Failed to parse review id '{}': {}", raw, e)))
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}
