//! Scan handlers - batch resolution and cached-record queries

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::intel::{classify, ScanSummary};
use crate::models::{IndicatorType, LookupRecord, RecordFilter, Verdict};
use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub indicators: Vec<String>,
    /// Opaque case metadata attached to persisted records
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub q: String,
}

/// Resolve a batch of raw indicator strings
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<ScanRequest>,
) -> AppResult<Json<ScanSummary>> {
    if req.indicators.is_empty() {
        return Err(AppError::ValidationError("indicators must not be empty".to_string()));
    }

    let summary = state
        .orchestrator
        .resolve_raw_batch(&req.indicators, req.label.as_deref())
        .await;

    Ok(Json(summary))
}

/// List cached lookup records, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> AppResult<Json<Vec<LookupRecord>>> {
    if let Some(verdict) = &filter.verdict {
        if Verdict::parse(verdict).is_none() {
            return Err(AppError::ValidationError(format!("unknown verdict: {}", verdict)));
        }
    }
    if let Some(kind) = &filter.indicator_type {
        if IndicatorType::parse(kind).is_none() {
            return Err(AppError::ValidationError(format!("unknown indicator type: {}", kind)));
        }
    }

    let records = LookupRecord::list(&state.pool, filter).await?;
    Ok(Json(records))
}

/// Classify a raw string and return its cached record, if any
pub async fn find(
    State(state): State<AppState>,
    Query(query): Query<FindQuery>,
) -> AppResult<Json<LookupRecord>> {
    let indicator = classify(&query.q)?;

    let record = LookupRecord::find_by_identity(&state.pool, &indicator)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no cached record for {}", indicator)))?;

    Ok(Json(record))
}
