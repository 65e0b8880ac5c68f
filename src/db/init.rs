//! Database initialization
//!
//! Creates the database on first run, applies the schema idempotently, and
//! seeds the demo tenants and accounts. Safe to call on every startup.

use crate::error::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers alongside the single writer; the
    // dispatcher-spawned workers all write through this pool.
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    // Migrations (idempotent - safe to call multiple times)
    create_tenants_table(&pool).await?;
    create_accounts_table(&pool).await?;
    create_raw_submissions_table(&pool).await?;
    create_reviews_table(&pool).await?;
    create_aspect_sentiments_table(&pool).await?;

    seed_demo_tenants(&pool).await?;

    Ok(pool)
}

async fn create_tenants_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tenants (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT,
            description TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            email TEXT PRIMARY KEY,
            password TEXT NOT NULL,
            tenant_id TEXT NOT NULL REFERENCES tenants(id),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the raw submissions table (the ingestion queue)
async fn create_raw_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS raw_submissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tenant_id TEXT NOT NULL,
            text TEXT NOT NULL,
            customer_name TEXT NOT NULL,
            rating REAL NOT NULL,
            submitted_at TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'in_progress', 'completed', 'failed')),
            model_type TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // The dispatcher scans by status, oldest first
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_raw_submissions_status ON raw_submissions(status, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the finalized reviews table
async fn create_reviews_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            text TEXT NOT NULL,
            customer_name TEXT NOT NULL,
            rating REAL NOT NULL,
            date TEXT NOT NULL,
            overall_sentiment TEXT NOT NULL
                CHECK (overall_sentiment IN ('positive', 'negative', 'neutral'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_tenant_date ON reviews(tenant_id, date)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the per-aspect sentiment facts table
async fn create_aspect_sentiments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS aspect_sentiments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id TEXT NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
            term TEXT NOT NULL,
            category TEXT NOT NULL,
            sentiment TEXT NOT NULL
                CHECK (sentiment IN ('positive', 'negative', 'neutral'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_aspect_sentiments_review ON aspect_sentiments(review_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_aspect_sentiments_category ON aspect_sentiments(category, sentiment)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Seed demo tenants and login accounts on first run
async fn seed_demo_tenants(pool: &SqlitePool) -> Result<()> {
    let tenants = [
        ("food_demo", "Food Restaurant", "food", "Local food restaurant"),
        ("hotel_demo", "Luxury Hotel", "hotel", "Premium hotel with excellent service"),
        ("course_demo", "Online Course Platform", "education", "Top-rated online education platform"),
    ];

    for (id, name, kind, description) in tenants {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO tenants (id, name, kind, description)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(description)
        .execute(pool)
        .await?;
    }

    let accounts = [
        ("food@demo.com", "password123", "food_demo"),
        ("hotel@demo.com", "password123", "hotel_demo"),
        ("course@demo.com", "password123", "course_demo"),
    ];

    for (email, password, tenant_id) in accounts {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO accounts (email, password, tenant_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(password)
        .bind(tenant_id)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Demo tenant descriptor for the login screen
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TenantAccount {
    pub email: String,
    pub password: String,
    pub tenant_id: String,
    pub tenant_name: String,
    pub tenant_kind: Option<String>,
}

/// Look up an account by email, joined with its tenant
pub async fn find_account(pool: &SqlitePool, email: &str) -> Result<Option<TenantAccount>> {
    let account = sqlx::query_as::<_, TenantAccount>(
        r#"
        SELECT a.email, a.password, a.tenant_id, t.name AS tenant_name, t.kind AS tenant_kind
        FROM accounts a
        JOIN tenants t ON t.id = a.tenant_id
        WHERE a.email = ?
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

/// List all seeded accounts for the demo login screen
pub async fn list_accounts(pool: &SqlitePool) -> Result<Vec<TenantAccount>> {
    let accounts = sqlx::query_as::<_, TenantAccount>(
        r#"
        SELECT a.email, a.password, a.tenant_id, t.name AS tenant_name, t.kind AS tenant_kind
        FROM accounts a
        JOIN tenants t ON t.id = a.tenant_id
        ORDER BY a.email
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}
