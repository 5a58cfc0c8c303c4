//! Lookup orchestration - cache-first dispatch with in-flight
//! deduplication, credential rotation and bounded retry
//!
//! Per indicator: check the record store, dedup against in-flight work,
//! acquire a credential, dispatch, normalize, persist. Batches tolerate
//! partial failure; one bad indicator never aborts the rest.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::intel::classifier::{self, ClassificationError};
use crate::intel::keypool::{AcquiredCredential, DispatchOutcome, KeyPool};
use crate::intel::normalizer::{self, NormalizedVerdict};
use crate::intel::provider::{IntelProvider, ProviderError, ProviderReport};
use crate::intel::store::{InsertOutcome, RecordStore, StoreError};
use crate::models::{Indicator, IndicatorType, LookupRecord, NewLookupRecord, Verdict};

const DEFAULT_RATE_LIMIT_BACKOFF_SECS: i64 = 60;

#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("no provider credential available")]
    QuotaExhausted,
    #[error("provider lookup failed: {message}")]
    Provider { message: String },
    #[error("record store failure: {message}")]
    Store { message: String },
}

impl From<StoreError> for LookupError {
    fn from(err: StoreError) -> Self {
        LookupError::Store { message: err.to_string() }
    }
}

/// One resolved indicator, with how the answer was obtained
#[derive(Debug, Clone)]
pub struct Resolution {
    pub record: LookupRecord,
    /// Served without an outbound call of its own (fresh store hit, a
    /// shared in-flight result, or a lost cross-process insert race)
    pub from_cache: bool,
    /// A new record was persisted for this resolution
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct LookupPolicy {
    pub cache_ttl_seconds: i32,
}

impl Default for LookupPolicy {
    fn default() -> Self {
        Self { cache_ttl_seconds: 3600 }
    }
}

/// Batch summary returned to callers of the raw-string ingress
#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub total: usize,
    pub created: usize,
    pub from_cache: usize,
    pub errors: Vec<String>,
    pub items: Vec<ScanItem>,
}

#[derive(Debug, Serialize)]
pub struct ScanItem {
    pub indicator: String,
    pub indicator_type: IndicatorType,
    pub verdict: Verdict,
}

type InFlightCell = Arc<OnceCell<Result<Resolution, LookupError>>>;

pub struct LookupOrchestrator {
    store: Arc<dyn RecordStore>,
    provider: Arc<dyn IntelProvider>,
    keys: Arc<KeyPool>,
    policy: LookupPolicy,
    /// At most one outbound call per identity is active at any instant;
    /// entries live only while their lookup is in flight
    in_flight: Mutex<HashMap<Indicator, InFlightCell>>,
}

impl LookupOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        provider: Arc<dyn IntelProvider>,
        keys: Arc<KeyPool>,
        policy: LookupPolicy,
    ) -> Self {
        Self {
            store,
            provider,
            keys,
            policy,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one normalized indicator: fresh cached record, or a
    /// deduplicated external lookup. Stale records are refreshed in
    /// place on the way through.
    pub async fn resolve(
        &self,
        indicator: &Indicator,
        label: Option<&str>,
    ) -> Result<Resolution, LookupError> {
        if let Some(existing) = self.store.find_by_identity(indicator).await? {
            if !existing.is_stale(Utc::now()) {
                return Ok(Resolution { record: existing, from_cache: true, created: false });
            }
            // Stale: fall through and refresh via the provider
        }

        let cell = {
            let mut in_flight = self.in_flight.lock();
            in_flight
                .entry(indicator.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        let ran = AtomicBool::new(false);
        let result = cell
            .get_or_init(|| {
                ran.store(true, Ordering::Relaxed);
                self.fetch_and_persist(indicator.clone(), label.map(str::to_owned))
            })
            .await
            .clone();

        if ran.load(Ordering::Relaxed) {
            self.in_flight.lock().remove(indicator);
            result
        } else {
            // Shared the winner's dispatch; no call of our own was made
            result.map(|shared| Resolution { from_cache: true, created: false, ..shared })
        }
    }

    /// Resolve a batch of normalized indicators concurrently. Output
    /// order matches input order; failures stay item-scoped.
    pub async fn resolve_batch(
        &self,
        indicators: &[Indicator],
        label: Option<&str>,
    ) -> Vec<(Indicator, Result<Resolution, LookupError>)> {
        let lookups: Vec<_> = indicators
            .iter()
            .map(|indicator| async move {
                (indicator.clone(), self.resolve(indicator, label).await)
            })
            .collect();

        join_all(lookups).await
    }

    /// Raw-string ingress: classify, resolve, summarize. Malformed items
    /// are skipped per-item with the original input in the error string.
    pub async fn resolve_raw_batch(&self, raw: &[String], label: Option<&str>) -> ScanSummary {
        let mut summary = ScanSummary {
            total: raw.len(),
            created: 0,
            from_cache: 0,
            errors: Vec::new(),
            items: Vec::new(),
        };

        let mut indicators = Vec::new();
        for raw_value in raw {
            match classifier::classify(raw_value) {
                Ok(indicator) => indicators.push(indicator),
                Err(ClassificationError::Empty) => {
                    summary.errors.push(format!("{:?}: empty indicator", raw_value));
                }
                Err(err) => summary.errors.push(err.to_string()),
            }
        }

        let mut quota_exhausted = 0usize;
        for (indicator, result) in self.resolve_batch(&indicators, label).await {
            match result {
                Ok(resolution) => {
                    if resolution.created {
                        summary.created += 1;
                    }
                    if resolution.from_cache {
                        summary.from_cache += 1;
                    }
                    summary.items.push(ScanItem {
                        indicator: indicator.value,
                        indicator_type: indicator.kind,
                        verdict: resolution.record.verdict(),
                    });
                }
                Err(err) => {
                    if matches!(err, LookupError::QuotaExhausted) {
                        quota_exhausted += 1;
                    }
                    summary.errors.push(format!("{}: {}", indicator.value, err));
                }
            }
        }

        if !indicators.is_empty() && quota_exhausted == indicators.len() {
            tracing::warn!(
                indicators = indicators.len(),
                "credential pool exhausted: no lookup in this batch could acquire a key"
            );
        }

        summary
    }

    async fn fetch_and_persist(
        &self,
        indicator: Indicator,
        label: Option<String>,
    ) -> Result<Resolution, LookupError> {
        // Re-check after winning the flight: another batch or process may
        // have persisted this identity in the meantime
        let refresh = match self.store.find_by_identity(&indicator).await? {
            Some(existing) if !existing.is_stale(Utc::now()) => {
                return Ok(Resolution { record: existing, from_cache: true, created: false });
            }
            Some(_) => true,
            None => false,
        };

        match self.fetch_with_retry(&indicator).await {
            Ok(normalized) => self.persist(&indicator, normalized, label, refresh).await,
            Err(err) => {
                // Degrade to a cached fallback so the indicator is not
                // re-queried on every batch, then report the failure
                if !matches!(err, LookupError::QuotaExhausted) {
                    if let Err(store_err) = self
                        .persist(&indicator, normalizer::unknown_fallback(), label, refresh)
                        .await
                    {
                        tracing::warn!(
                            indicator = %indicator,
                            error = %store_err,
                            "failed to persist unknown-verdict fallback"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    /// One dispatch, retried once on a different credential when the
    /// first attempt leaves the answer unknown.
    async fn fetch_with_retry(
        &self,
        indicator: &Indicator,
    ) -> Result<NormalizedVerdict, LookupError> {
        let first = self
            .keys
            .acquire(indicator.kind)
            .ok_or(LookupError::QuotaExhausted)?;

        let err = match self.fetch_once(indicator, &first).await {
            Ok(normalized) => return Ok(normalized),
            Err(err) => err,
        };

        tracing::debug!(indicator = %indicator, key = %first.id, error = %err, "lookup attempt failed, retrying on another credential");

        let Some(second) = self
            .keys
            .acquire_excluding(indicator.kind, &[first.id.as_str()])
        else {
            return Err(LookupError::Provider { message: err.to_string() });
        };

        self.fetch_once(indicator, &second)
            .await
            .map_err(|retry_err| LookupError::Provider { message: retry_err.to_string() })
    }

    async fn fetch_once(
        &self,
        indicator: &Indicator,
        credential: &AcquiredCredential,
    ) -> Result<NormalizedVerdict, ProviderError> {
        match self.provider.lookup(indicator, &credential.secret).await {
            Ok(report) => {
                self.report_success(&credential.id, &report);
                Ok(normalizer::normalize(&report))
            }
            // "Never seen" is an answer, not a failure: zero counts
            Err(ProviderError::NotFound) => {
                self.report_success(&credential.id, &ProviderReport::default());
                Ok(normalizer::normalize(&ProviderReport::default()))
            }
            Err(ProviderError::RateLimited { retry_after_seconds }) => {
                let backoff = retry_after_seconds
                    .map(|s| s as i64)
                    .unwrap_or(DEFAULT_RATE_LIMIT_BACKOFF_SECS);
                self.keys.report(
                    &credential.id,
                    DispatchOutcome::RateLimited { reset_at: Utc::now() + Duration::seconds(backoff) },
                );
                Err(ProviderError::RateLimited { retry_after_seconds })
            }
            Err(ProviderError::InvalidKey) => {
                self.keys.report(&credential.id, DispatchOutcome::Invalid);
                Err(ProviderError::InvalidKey)
            }
            // Quota is not assumed consumed for an ambiguous timeout
            Err(ProviderError::Timeout) => {
                self.keys.report(&credential.id, DispatchOutcome::Undetermined);
                Err(ProviderError::Timeout)
            }
            Err(err) => Err(err),
        }
    }

    fn report_success(&self, credential_id: &str, report: &ProviderReport) {
        let (remaining, reset_at) = report
            .quota
            .map(|q| (q.remaining, q.reset_at))
            .unwrap_or((None, None));
        self.keys
            .report(credential_id, DispatchOutcome::Success { remaining, reset_at });
    }

    async fn persist(
        &self,
        indicator: &Indicator,
        normalized: NormalizedVerdict,
        label: Option<String>,
        refresh: bool,
    ) -> Result<Resolution, LookupError> {
        let record = NewLookupRecord {
            indicator: indicator.clone(),
            verdict: normalized.verdict,
            stats: normalized.stats,
            engine_results: normalized.engines,
            label,
            ttl_seconds: self.policy.cache_ttl_seconds,
        };

        if refresh {
            let updated = self.store.refresh(record).await?;
            return Ok(Resolution { record: updated, from_cache: false, created: false });
        }

        match self.store.insert_unique(record).await? {
            InsertOutcome::Created(created) => {
                Ok(Resolution { record: created, from_cache: false, created: true })
            }
            InsertOutcome::DuplicateIdentity => {
                // Lost the race to a concurrent writer: the stored row wins
                let existing = self
                    .store
                    .find_by_identity(indicator)
                    .await?
                    .ok_or_else(|| LookupError::Store {
                        message: format!("record for {} vanished after duplicate insert", indicator),
                    })?;
                Ok(Resolution { record: existing, from_cache: true, created: false })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;

    use super::*;
    use crate::intel::keypool::RateLimits;
    use crate::intel::provider::VendorStats;
    use crate::intel::store::memory::{materialize, MemoryRecordStore};

    /// Scripted provider: pops queued responses, falls back to a
    /// harmless default, counts every call.
    struct MockProvider {
        calls: AtomicUsize,
        script: Mutex<VecDeque<Result<ProviderReport, ProviderError>>>,
        delay_ms: u64,
    }

    impl MockProvider {
        fn new() -> Self {
            Self { calls: AtomicUsize::new(0), script: Mutex::new(VecDeque::new()), delay_ms: 0 }
        }

        fn with_delay(delay_ms: u64) -> Self {
            Self { delay_ms, ..Self::new() }
        }

        fn with_script(
            script: impl IntoIterator<Item = Result<ProviderReport, ProviderError>>,
        ) -> Self {
            let provider = Self::new();
            provider.script.lock().extend(script);
            provider
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn harmless_report() -> ProviderReport {
            ProviderReport {
                stats: Some(VendorStats { harmless: 5, undetected: 2, ..VendorStats::default() }),
                engines: None,
                quota: None,
            }
        }
    }

    #[async_trait]
    impl IntelProvider for MockProvider {
        async fn lookup(
            &self,
            _indicator: &Indicator,
            _api_key: &str,
        ) -> Result<ProviderReport, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            self.script
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(Self::harmless_report()))
        }
    }

    struct Fixture {
        store: Arc<MemoryRecordStore>,
        provider: Arc<MockProvider>,
        keys: Arc<KeyPool>,
        orchestrator: LookupOrchestrator,
    }

    fn fixture_with(provider: MockProvider, keys: KeyPool) -> Fixture {
        let store = Arc::new(MemoryRecordStore::new());
        let provider = Arc::new(provider);
        let keys = Arc::new(keys);
        let orchestrator = LookupOrchestrator::new(
            store.clone(),
            provider.clone(),
            keys.clone(),
            LookupPolicy::default(),
        );
        Fixture { store, provider, keys, orchestrator }
    }

    fn fixture() -> Fixture {
        fixture_with(
            MockProvider::new(),
            KeyPool::new(vec!["secret-a".into(), "secret-b".into()], RateLimits::default()),
        )
    }

    fn ip(value: &str) -> Indicator {
        Indicator::new(value, IndicatorType::Ip)
    }

    #[tokio::test]
    async fn test_second_resolve_is_a_cache_hit() {
        let fx = fixture();
        let indicator = ip("8.8.8.8");

        let first = fx.orchestrator.resolve(&indicator, None).await.unwrap();
        assert!(first.created);
        assert!(!first.from_cache);

        let second = fx.orchestrator.resolve(&indicator, None).await.unwrap();
        assert!(second.from_cache);
        assert!(!second.created);
        assert_eq!(second.record.id, first.record.id);

        // Idempotence: no second external call inside the TTL window
        assert_eq!(fx.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_indicator_single_flight() {
        // The provider stalls long enough that both lookups are in
        // flight together and must converge on one call
        let fx = fixture_with(
            MockProvider::with_delay(20),
            KeyPool::new(vec!["a".into(), "b".into()], RateLimits::default()),
        );
        let indicator = ip("1.1.1.1");

        let (a, b) = tokio::join!(
            fx.orchestrator.resolve(&indicator, None),
            fx.orchestrator.resolve(&indicator, None),
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_eq!(fx.provider.calls(), 1);
        assert_eq!(fx.store.len(), 1);
        assert_eq!(a.record.id, b.record.id);
        // Exactly one side created the record, the other shared it
        assert_eq!(a.created as usize + b.created as usize, 1);
    }

    #[tokio::test]
    async fn test_overlapping_batches_share_one_call() {
        let fx = fixture_with(
            MockProvider::with_delay(20),
            KeyPool::new(vec!["a".into(), "b".into()], RateLimits::default()),
        );
        let raw = vec!["1.0.0.1".to_string()];

        let (first, second) = tokio::join!(
            fx.orchestrator.resolve_raw_batch(&raw, None),
            fx.orchestrator.resolve_raw_batch(&raw, None),
        );

        // Exactly one persisted record and one external call across both
        assert_eq!(fx.provider.calls(), 1);
        assert_eq!(fx.store.len(), 1);
        assert_eq!(first.created + second.created, 1);
        assert!(first.errors.is_empty() && second.errors.is_empty());
    }

    #[tokio::test]
    async fn test_scenario_batch_with_duplicate_and_garbage() {
        let fx = fixture_with(
            MockProvider::new(),
            KeyPool::new(vec!["only".into()], RateLimits::default()),
        );
        let raw = vec![
            "8.8.8.8".to_string(),
            "not-an-ioc!!".to_string(),
            "8.8.8.8".to_string(),
        ];

        let summary = fx.orchestrator.resolve_raw_batch(&raw, Some("case-7")).await;

        assert_eq!(summary.total, 3);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.from_cache, 1);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].contains("not-an-ioc!!"));
        assert_eq!(summary.items.len(), 2);
        assert_eq!(fx.provider.calls(), 1);
        assert_eq!(fx.store.len(), 1);
        assert_eq!(fx.store.get(&ip("8.8.8.8")).unwrap().label.as_deref(), Some("case-7"));
    }

    #[tokio::test]
    async fn test_quota_exhausted_fails_item_without_record() {
        let fx = fixture_with(MockProvider::new(), KeyPool::new(vec![], RateLimits::default()));
        let indicator = ip("9.9.9.9");

        let err = fx.orchestrator.resolve(&indicator, None).await.unwrap_err();
        assert!(matches!(err, LookupError::QuotaExhausted));
        assert_eq!(fx.provider.calls(), 0);
        assert_eq!(fx.store.len(), 0);
    }

    #[tokio::test]
    async fn test_transient_failure_retries_once_then_persists_fallback() {
        let provider = MockProvider::with_script([
            Err(ProviderError::Network("connection reset".into())),
            Err(ProviderError::Timeout),
        ]);
        let fx = fixture_with(
            provider,
            KeyPool::new(vec!["a".into(), "b".into()], RateLimits::default()),
        );
        let indicator = ip("6.6.6.6");

        let err = fx.orchestrator.resolve(&indicator, None).await.unwrap_err();
        assert!(matches!(err, LookupError::Provider { .. }));

        // Both credentials were tried, then the unknown fallback cached
        assert_eq!(fx.provider.calls(), 2);
        let fallback = fx.store.get(&indicator).unwrap();
        assert_eq!(fallback.verdict(), Verdict::Unknown);
        assert_eq!(fallback.stats(), crate::models::DetectionStats::default());

        // The fallback suppresses re-querying on the next batch
        let again = fx.orchestrator.resolve(&indicator, None).await.unwrap();
        assert!(again.from_cache);
        assert_eq!(fx.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_retry_succeeds_on_second_credential() {
        let provider = MockProvider::with_script([
            Err(ProviderError::Timeout),
            Ok(MockProvider::harmless_report()),
        ]);
        let fx = fixture_with(
            provider,
            KeyPool::new(vec!["a".into(), "b".into()], RateLimits::default()),
        );
        let indicator = ip("5.5.5.5");

        let resolution = fx.orchestrator.resolve(&indicator, None).await.unwrap();
        assert!(resolution.created);
        assert_eq!(resolution.record.verdict(), Verdict::Harmless);
        assert_eq!(fx.provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_credential_failure_degrades_without_retry() {
        let provider = MockProvider::with_script([Err(ProviderError::Network("boom".into()))]);
        let fx = fixture_with(provider, KeyPool::new(vec!["solo".into()], RateLimits::default()));
        let indicator = ip("4.4.4.4");

        let err = fx.orchestrator.resolve(&indicator, None).await.unwrap_err();
        assert!(matches!(err, LookupError::Provider { .. }));
        // No second credential to retry on
        assert_eq!(fx.provider.calls(), 1);
        assert_eq!(fx.store.get(&indicator).unwrap().verdict(), Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_not_found_caches_undetected() {
        let provider = MockProvider::with_script([Err(ProviderError::NotFound)]);
        let fx = fixture_with(provider, KeyPool::new(vec!["k".into()], RateLimits::default()));
        let indicator = ip("3.3.3.3");

        let resolution = fx.orchestrator.resolve(&indicator, None).await.unwrap();
        assert!(resolution.created);
        assert_eq!(resolution.record.verdict(), Verdict::Undetected);
        assert_eq!(fx.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_key_benches_credential() {
        let provider = MockProvider::with_script([
            Err(ProviderError::InvalidKey),
            Ok(MockProvider::harmless_report()),
        ]);
        let fx = fixture_with(
            provider,
            KeyPool::new(vec!["bad".into(), "good".into()], RateLimits::default()),
        );

        let resolution = fx.orchestrator.resolve(&ip("2.2.2.2"), None).await.unwrap();
        assert!(resolution.created);
        assert_eq!(fx.keys.usable_len(), 1);
    }

    #[tokio::test]
    async fn test_stale_record_refreshed_in_place() {
        let fx = fixture();
        let indicator = ip("8.8.4.4");

        // Seed an already-stale harmless record
        let mut stale = materialize(&NewLookupRecord {
            indicator: indicator.clone(),
            verdict: Verdict::Harmless,
            stats: crate::models::DetectionStats { harmless: 3, ..Default::default() },
            engine_results: Vec::new(),
            label: None,
            ttl_seconds: 3600,
        });
        stale.fetched_at = Utc::now() - Duration::seconds(7200);
        let stale_id = stale.id;
        fx.store.seed(stale);

        let resolution = fx.orchestrator.resolve(&indicator, None).await.unwrap();

        assert_eq!(fx.provider.calls(), 1);
        assert!(!resolution.from_cache);
        assert!(!resolution.created);
        // Same row, refreshed fetch time
        assert_eq!(resolution.record.id, stale_id);
        assert!(!resolution.record.is_stale(Utc::now()));
        assert_eq!(fx.store.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_insert_resolved_by_reread() {
        // Store that always reports a duplicate, as if another process
        // inserted the identity between dispatch and persist
        struct DuplicateStore {
            inner: MemoryRecordStore,
        }

        #[async_trait]
        impl RecordStore for DuplicateStore {
            async fn find_by_identity(
                &self,
                indicator: &Indicator,
            ) -> Result<Option<LookupRecord>, StoreError> {
                self.inner.find_by_identity(indicator).await
            }

            async fn insert_unique(
                &self,
                record: NewLookupRecord,
            ) -> Result<InsertOutcome, StoreError> {
                let foreign = materialize(&NewLookupRecord {
                    verdict: Verdict::Malicious,
                    ..record.clone()
                });
                self.inner.seed(foreign);
                Ok(InsertOutcome::DuplicateIdentity)
            }

            async fn refresh(&self, record: NewLookupRecord) -> Result<LookupRecord, StoreError> {
                self.inner.refresh(record).await
            }
        }

        let store = Arc::new(DuplicateStore { inner: MemoryRecordStore::new() });
        let provider = Arc::new(MockProvider::new());
        let keys = Arc::new(KeyPool::new(vec!["k".into()], RateLimits::default()));
        let orchestrator = LookupOrchestrator::new(
            store,
            provider.clone(),
            keys,
            LookupPolicy::default(),
        );

        let resolution = orchestrator.resolve(&ip("7.7.7.7"), None).await.unwrap();

        // The concurrently-inserted row wins and counts as a cache hit
        assert!(resolution.from_cache);
        assert!(!resolution.created);
        assert_eq!(resolution.record.verdict(), Verdict::Malicious);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_batch_order_matches_input_order() {
        let fx = fixture_with(
            MockProvider::new(),
            KeyPool::new(vec!["k".into()], RateLimits { default_per_window: 100, ..Default::default() }),
        );
        let indicators: Vec<Indicator> =
            ["10.0.0.1", "10.0.0.2", "10.0.0.3"].iter().map(|v| ip(v)).collect();

        let results = fx.orchestrator.resolve_batch(&indicators, None).await;

        let returned: Vec<&str> = results.iter().map(|(i, _)| i.value.as_str()).collect();
        assert_eq!(returned, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[tokio::test]
    async fn test_raw_batch_empty_strings_are_item_errors() {
        let fx = fixture();
        let raw = vec!["".to_string(), "example.com".to_string()];

        let summary = fx.orchestrator.resolve_raw_batch(&raw, None).await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.items[0].indicator, "example.com");
    }
}
