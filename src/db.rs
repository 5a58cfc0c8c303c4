//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create tables if not exist
    sqlx::query(SCHEMA_SQL)
        .execute(pool)
        .await?;

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Cached lookup records, one row per indicator identity
CREATE TABLE IF NOT EXISTS lookups (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    indicator VARCHAR(2048) NOT NULL,
    indicator_type VARCHAR(10) NOT NULL,
    verdict VARCHAR(20) NOT NULL,
    malicious INT NOT NULL DEFAULT 0,
    suspicious INT NOT NULL DEFAULT 0,
    harmless INT NOT NULL DEFAULT 0,
    undetected INT NOT NULL DEFAULT 0,
    timeout INT NOT NULL DEFAULT 0,
    engine_results JSONB,
    label VARCHAR(255),
    fetched_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    ttl_seconds INT NOT NULL,
    CONSTRAINT uq_lookups_identity UNIQUE (indicator, indicator_type)
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_lookups_verdict ON lookups(verdict);
CREATE INDEX IF NOT EXISTS idx_lookups_type ON lookups(indicator_type);
CREATE INDEX IF NOT EXISTS idx_lookups_fetched ON lookups(fetched_at);
"#;
