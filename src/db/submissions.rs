//! Ingestion queue operations over the raw submissions table
//!
//! The queue is the raw_submissions table viewed through its status column.
//! Claiming is a conditional update that flips `pending` rows to
//! `in_progress` and returns the winners, so two concurrent dispatcher
//! cycles can never claim the same submission.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::{
    RawSubmission, SubmissionStatus, DEFAULT_CUSTOMER_NAME, DEFAULT_RATING,
};

/// Insert a new pending submission and return its queue id.
///
/// Absent optional fields are stored with their explicit defaults, so every
/// row read back is fully populated.
pub async fn enqueue(
    pool: &SqlitePool,
    tenant_id: &str,
    text: &str,
    customer_name: Option<&str>,
    rating: Option<f64>,
    model_type: &str,
) -> Result<i64> {
    if tenant_id.trim().is_empty() {
        return Err(Error::InvalidInput("tenant_id must not be empty".to_string()));
    }
    if text.trim().is_empty() {
        return Err(Error::InvalidInput("text must not be empty".to_string()));
    }

    let customer_name = customer_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or(DEFAULT_CUSTOMER_NAME);
    let rating = rating.unwrap_or(DEFAULT_RATING);
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        INSERT INTO raw_submissions
            (tenant_id, text, customer_name, rating, submitted_at, status, model_type, created_at)
        VALUES (?, ?, ?, ?, ?, 'pending', ?, ?)
        "#,
    )
    .bind(tenant_id)
    .bind(text)
    .bind(customer_name)
    .bind(rating)
    .bind(&now)
    .bind(model_type)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Atomically claim up to `limit` pending submissions, oldest first.
///
/// The status flip and the selection happen in one statement; each returned
/// id belongs to exactly one claimant.
pub async fn claim_batch(pool: &SqlitePool, limit: i64) -> Result<Vec<i64>> {
    let mut ids: Vec<i64> = sqlx::query_scalar(
        r#"
        UPDATE raw_submissions
        SET status = 'in_progress'
        WHERE id IN (
            SELECT id FROM raw_submissions
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT ?
        )
        RETURNING id
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    // RETURNING does not promise an order; queue ids are monotonic
    ids.sort_unstable();
    Ok(ids)
}

/// Re-read a claimed submission.
///
/// Returns None when the row is gone or its status has moved on, which tells
/// a worker another execution already handled it.
pub async fn load_claimed(pool: &SqlitePool, id: i64) -> Result<Option<RawSubmission>> {
    let row = sqlx::query(
        r#"
        SELECT id, tenant_id, text, customer_name, rating, submitted_at, status, model_type, created_at
        FROM raw_submissions
        WHERE id = ? AND status = 'in_progress'
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_submission).transpose()
}

/// Fetch a submission regardless of status
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<RawSubmission>> {
    let row = sqlx::query(
        r#"
        SELECT id, tenant_id, text, customer_name, rating, submitted_at, status, model_type, created_at
        FROM raw_submissions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(row_to_submission).transpose()
}

/// Mark a claimed submission failed. Terminal, written at most once.
pub async fn mark_failed(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE raw_submissions SET status = 'failed' WHERE id = ? AND status = 'in_progress'")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Requeue submissions stuck in_progress from a previous run.
///
/// A worker dies with its process; any claim it held will never complete.
/// Flipping those rows back to pending at startup lets the dispatcher pick
/// them up again.
pub async fn requeue_stale(pool: &SqlitePool) -> Result<usize> {
    let result = sqlx::query(
        "UPDATE raw_submissions SET status = 'pending' WHERE status = 'in_progress'",
    )
    .execute(pool)
    .await?;

    let requeued = result.rows_affected() as usize;
    if requeued > 0 {
        info!(requeued, "Requeued stale in-progress submissions");
    }
    Ok(requeued)
}

fn row_to_submission(row: sqlx::sqlite::SqliteRow) -> Result<RawSubmission> {
    let status: String = row.get("status");
    let status = SubmissionStatus::from_str(&status)
        .ok_or_else(|| Error::Internal(format!("Unknown submission status: {}", status)))?;

    Ok(RawSubmission {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        text: row.get("text"),
        customer_name: row.get("customer_name"),
        rating: row.get("rating"),
        submitted_at: parse_timestamp(row.get("submitted_at"))?,
        status,
        model_type: row.get("model_type"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse timestamp '{}': {}", raw, e)))
}
