//! Lookup record model - the cached resolution for an indicator

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use super::indicator::{DetectionStats, EngineResult, Indicator, Verdict};

/// One row of `lookups`. `(indicator, indicator_type)` is unique at the
/// storage layer; rows are refreshed in place, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LookupRecord {
    pub id: Uuid,
    pub indicator: String,
    pub indicator_type: String,
    pub verdict: String,
    pub malicious: i32,
    pub suspicious: i32,
    pub harmless: i32,
    pub undetected: i32,
    pub timeout: i32,
    pub engine_results: Option<serde_json::Value>,
    pub label: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ttl_seconds: i32,
}

/// Fields for a record about to be persisted
#[derive(Debug, Clone)]
pub struct NewLookupRecord {
    pub indicator: Indicator,
    pub verdict: Verdict,
    pub stats: DetectionStats,
    pub engine_results: Vec<EngineResult>,
    pub label: Option<String>,
    pub ttl_seconds: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecordFilter {
    pub verdict: Option<String>,
    pub indicator_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl LookupRecord {
    /// Stale when `now > fetched_at + ttl_seconds`
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now > self.fetched_at + Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::parse(&self.verdict).unwrap_or(Verdict::Unknown)
    }

    pub fn stats(&self) -> DetectionStats {
        DetectionStats {
            malicious: self.malicious.max(0) as u32,
            suspicious: self.suspicious.max(0) as u32,
            harmless: self.harmless.max(0) as u32,
            undetected: self.undetected.max(0) as u32,
            timeout: self.timeout.max(0) as u32,
        }
    }

    pub async fn find_by_identity(
        pool: &PgPool,
        indicator: &Indicator,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LookupRecord>(
            "SELECT * FROM lookups WHERE indicator = $1 AND indicator_type = $2",
        )
        .bind(&indicator.value)
        .bind(indicator.kind.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Insert respecting the identity constraint. Returns `None` when a
    /// concurrently-inserted row already holds the identity.
    pub async fn insert_unique(
        pool: &PgPool,
        data: &NewLookupRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LookupRecord>(
            r#"
            INSERT INTO lookups
                (indicator, indicator_type, verdict, malicious, suspicious, harmless, undetected, timeout, engine_results, label, ttl_seconds)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (indicator, indicator_type) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&data.indicator.value)
        .bind(data.indicator.kind.as_str())
        .bind(data.verdict.as_str())
        .bind(data.stats.malicious as i32)
        .bind(data.stats.suspicious as i32)
        .bind(data.stats.harmless as i32)
        .bind(data.stats.undetected as i32)
        .bind(data.stats.timeout as i32)
        .bind(engine_results_json(&data.engine_results))
        .bind(&data.label)
        .bind(data.ttl_seconds)
        .fetch_optional(pool)
        .await
    }

    /// Refresh an existing row in place, preserving its id.
    pub async fn refresh_by_identity(
        pool: &PgPool,
        data: &NewLookupRecord,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, LookupRecord>(
            r#"
            UPDATE lookups
            SET verdict = $3, malicious = $4, suspicious = $5, harmless = $6,
                undetected = $7, timeout = $8, engine_results = $9,
                label = COALESCE($10, label),
                fetched_at = NOW(), updated_at = NOW(), ttl_seconds = $11
            WHERE indicator = $1 AND indicator_type = $2
            RETURNING *
            "#,
        )
        .bind(&data.indicator.value)
        .bind(data.indicator.kind.as_str())
        .bind(data.verdict.as_str())
        .bind(data.stats.malicious as i32)
        .bind(data.stats.suspicious as i32)
        .bind(data.stats.harmless as i32)
        .bind(data.stats.undetected as i32)
        .bind(data.stats.timeout as i32)
        .bind(engine_results_json(&data.engine_results))
        .bind(&data.label)
        .bind(data.ttl_seconds)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool, filter: RecordFilter) -> Result<Vec<Self>, sqlx::Error> {
        let limit = filter.limit.unwrap_or(50);
        let offset = filter.offset.unwrap_or(0);

        sqlx::query_as::<_, LookupRecord>(
            r#"
            SELECT * FROM lookups
            WHERE ($1::text IS NULL OR verdict = $1)
              AND ($2::text IS NULL OR indicator_type = $2)
            ORDER BY fetched_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(&filter.verdict)
        .bind(&filter.indicator_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }
}

fn engine_results_json(engines: &[EngineResult]) -> Option<serde_json::Value> {
    if engines.is_empty() {
        None
    } else {
        serde_json::to_value(engines).ok()
    }
}
