//! Persistence contract for lookup records
//!
//! The store - not the orchestrator - enforces the
//! `(indicator, indicator_type)` uniqueness invariant; a lost insert
//! race surfaces as an explicit [`InsertOutcome::DuplicateIdentity`],
//! never as a storage exception.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use crate::models::{Indicator, LookupRecord, NewLookupRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(LookupRecord),
    DuplicateIdentity,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn find_by_identity(
        &self,
        indicator: &Indicator,
    ) -> Result<Option<LookupRecord>, StoreError>;

    async fn insert_unique(&self, record: NewLookupRecord) -> Result<InsertOutcome, StoreError>;

    /// Refresh the stored record in place, preserving row identity.
    async fn refresh(&self, record: NewLookupRecord) -> Result<LookupRecord, StoreError>;
}

/// Production store backed by the `lookups` table
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn find_by_identity(
        &self,
        indicator: &Indicator,
    ) -> Result<Option<LookupRecord>, StoreError> {
        Ok(LookupRecord::find_by_identity(&self.pool, indicator).await?)
    }

    async fn insert_unique(&self, record: NewLookupRecord) -> Result<InsertOutcome, StoreError> {
        match LookupRecord::insert_unique(&self.pool, &record).await? {
            Some(created) => Ok(InsertOutcome::Created(created)),
            None => Ok(InsertOutcome::DuplicateIdentity),
        }
    }

    async fn refresh(&self, record: NewLookupRecord) -> Result<LookupRecord, StoreError> {
        if let Some(updated) = LookupRecord::refresh_by_identity(&self.pool, &record).await? {
            return Ok(updated);
        }
        // Records are never deleted, so a missing row means the caller
        // raced an identity that was never persisted: insert instead.
        match LookupRecord::insert_unique(&self.pool, &record).await? {
            Some(created) => Ok(created),
            None => LookupRecord::find_by_identity(&self.pool, &record.indicator)
                .await?
                .ok_or(StoreError::Database(sqlx::Error::RowNotFound)),
        }
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory store for orchestrator tests

    use std::collections::HashMap;

    use chrono::Utc;
    use parking_lot::Mutex;
    use uuid::Uuid;

    use super::*;

    #[derive(Default)]
    pub struct MemoryRecordStore {
        records: Mutex<HashMap<Indicator, LookupRecord>>,
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.records.lock().len()
        }

        pub fn get(&self, indicator: &Indicator) -> Option<LookupRecord> {
            self.records.lock().get(indicator).cloned()
        }

        pub fn seed(&self, record: LookupRecord) {
            let indicator = Indicator::new(
                record.indicator.clone(),
                crate::models::IndicatorType::parse(&record.indicator_type).unwrap(),
            );
            self.records.lock().insert(indicator, record);
        }
    }

    pub fn materialize(record: &NewLookupRecord) -> LookupRecord {
        let now = Utc::now();
        LookupRecord {
            id: Uuid::new_v4(),
            indicator: record.indicator.value.clone(),
            indicator_type: record.indicator.kind.as_str().to_string(),
            verdict: record.verdict.as_str().to_string(),
            malicious: record.stats.malicious as i32,
            suspicious: record.stats.suspicious as i32,
            harmless: record.stats.harmless as i32,
            undetected: record.stats.undetected as i32,
            timeout: record.stats.timeout as i32,
            engine_results: if record.engine_results.is_empty() {
                None
            } else {
                serde_json::to_value(&record.engine_results).ok()
            },
            label: record.label.clone(),
            fetched_at: now,
            updated_at: now,
            ttl_seconds: record.ttl_seconds,
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn find_by_identity(
            &self,
            indicator: &Indicator,
        ) -> Result<Option<LookupRecord>, StoreError> {
            Ok(self.records.lock().get(indicator).cloned())
        }

        async fn insert_unique(
            &self,
            record: NewLookupRecord,
        ) -> Result<InsertOutcome, StoreError> {
            let mut records = self.records.lock();
            if records.contains_key(&record.indicator) {
                return Ok(InsertOutcome::DuplicateIdentity);
            }
            let created = materialize(&record);
            records.insert(record.indicator.clone(), created.clone());
            Ok(InsertOutcome::Created(created))
        }

        async fn refresh(&self, record: NewLookupRecord) -> Result<LookupRecord, StoreError> {
            let mut records = self.records.lock();
            let fresh = materialize(&record);
            let updated = match records.get(&record.indicator) {
                Some(existing) => LookupRecord { id: existing.id, ..fresh },
                None => fresh,
            };
            records.insert(record.indicator.clone(), updated.clone());
            Ok(updated)
        }
    }
}
