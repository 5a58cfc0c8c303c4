//! API credential pool - rotation, quota windows, lazy reactivation
//!
//! The pool exclusively owns all mutable credential state. Selection and
//! quota reservation happen under one lock so no two concurrent
//! dispatches can spend the same unit of quota.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::models::IndicatorType;

/// Requests-per-window caps, with optional per-type overrides.
#[derive(Debug, Clone)]
pub struct RateLimits {
    pub default_per_window: u32,
    pub window_seconds: i64,
    pub hash_per_window: Option<u32>,
    pub ip_per_window: Option<u32>,
    pub domain_per_window: Option<u32>,
    pub url_per_window: Option<u32>,
}

impl RateLimits {
    pub fn cap(&self, kind: IndicatorType) -> u32 {
        let override_cap = match kind {
            IndicatorType::Hash => self.hash_per_window,
            IndicatorType::Ip => self.ip_per_window,
            IndicatorType::Domain => self.domain_per_window,
            IndicatorType::Url => self.url_per_window,
        };
        override_cap.unwrap_or(self.default_per_window)
    }

    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_seconds)
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        // Provider free tier: 4 requests per minute per key
        Self {
            default_per_window: 4,
            window_seconds: 60,
            hash_per_window: None,
            ip_per_window: None,
            domain_per_window: None,
            url_per_window: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Ok,
    Limited,
    Invalid,
}

#[derive(Debug)]
struct CredentialState {
    /// Synthetic id for logging; never the raw secret
    id: String,
    secret: String,
    status: CredentialStatus,
    used_in_window: u32,
    reset_at: DateTime<Utc>,
}

/// Transient handle returned by [`KeyPool::acquire`]
#[derive(Debug, Clone)]
pub struct AcquiredCredential {
    pub id: String,
    pub secret: String,
}

/// What happened with a dispatched request, reported back per credential
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Request went through; quota numbers sync from the provider when
    /// it exposes them
    Success {
        remaining: Option<u32>,
        reset_at: Option<DateTime<Utc>>,
    },
    /// Provider rejected on quota; excluded until `reset_at`
    RateLimited { reset_at: DateTime<Utc> },
    /// Authentication rejected; benched for the process lifetime
    Invalid,
    /// Ambiguous outcome (timed out before any response): the reserved
    /// unit is refunded, quota not assumed consumed
    Undetermined,
}

pub struct KeyPool {
    limits: RateLimits,
    creds: Mutex<Vec<CredentialState>>,
}

impl KeyPool {
    /// Build the pool from the configured secret list (already
    /// deduplicated). Loaded once at process start.
    pub fn new(secrets: Vec<String>, limits: RateLimits) -> Self {
        let now = Utc::now();
        let creds = secrets
            .into_iter()
            .enumerate()
            .map(|(i, secret)| CredentialState {
                id: format!("key-{}", i + 1),
                secret,
                status: CredentialStatus::Ok,
                used_in_window: 0,
                reset_at: now,
            })
            .collect();

        Self { limits, creds: Mutex::new(creds) }
    }

    pub fn acquire(&self, kind: IndicatorType) -> Option<AcquiredCredential> {
        self.acquire_at(kind, Utc::now())
    }

    /// Acquire skipping specific credential ids (retry on a different key)
    pub fn acquire_excluding(
        &self,
        kind: IndicatorType,
        exclude: &[&str],
    ) -> Option<AcquiredCredential> {
        self.acquire_excluding_at(kind, exclude, Utc::now())
    }

    pub fn acquire_at(&self, kind: IndicatorType, now: DateTime<Utc>) -> Option<AcquiredCredential> {
        self.acquire_excluding_at(kind, &[], now)
    }

    /// Selection: among eligible credentials, greatest remaining quota
    /// wins; ties break on earliest `reset_at`. Reserves one unit before
    /// releasing the lock.
    pub fn acquire_excluding_at(
        &self,
        kind: IndicatorType,
        exclude: &[&str],
        now: DateTime<Utc>,
    ) -> Option<AcquiredCredential> {
        let cap = self.limits.cap(kind);
        let mut creds = self.creds.lock();

        // Roll expired windows first; a limited key whose reset passed
        // becomes eligible again here (lazy reactivation, no timer)
        for cred in creds.iter_mut() {
            if cred.status != CredentialStatus::Invalid && now >= cred.reset_at {
                cred.used_in_window = 0;
                cred.reset_at = now + self.limits.window();
                if cred.status == CredentialStatus::Limited {
                    cred.status = CredentialStatus::Ok;
                    tracing::debug!(key = %cred.id, "credential window reset, reactivated");
                }
            }
        }

        let mut best: Option<usize> = None;
        for (i, cred) in creds.iter().enumerate() {
            if cred.status != CredentialStatus::Ok {
                continue;
            }
            if exclude.contains(&cred.id.as_str()) {
                continue;
            }
            if cred.used_in_window >= cap {
                continue;
            }
            best = match best {
                None => Some(i),
                Some(b) => {
                    let (cand, cur) = (&creds[i], &creds[b]);
                    let cand_remaining = cap - cand.used_in_window;
                    let cur_remaining = cap - cur.used_in_window;
                    if cand_remaining > cur_remaining
                        || (cand_remaining == cur_remaining && cand.reset_at < cur.reset_at)
                    {
                        Some(i)
                    } else {
                        Some(b)
                    }
                }
            };
        }

        let idx = best?;
        creds[idx].used_in_window += 1;
        Some(AcquiredCredential {
            id: creds[idx].id.clone(),
            secret: creds[idx].secret.clone(),
        })
    }

    /// Report the outcome of a dispatch attempt for a credential.
    pub fn report(&self, id: &str, outcome: DispatchOutcome) {
        let mut creds = self.creds.lock();
        let Some(cred) = creds.iter_mut().find(|c| c.id == id) else {
            return;
        };

        match outcome {
            DispatchOutcome::Success { remaining, reset_at } => {
                if let Some(remaining) = remaining {
                    cred.used_in_window = self.limits.default_per_window.saturating_sub(remaining);
                }
                if let Some(reset_at) = reset_at {
                    cred.reset_at = reset_at;
                }
            }
            DispatchOutcome::RateLimited { reset_at } => {
                cred.status = CredentialStatus::Limited;
                cred.reset_at = reset_at;
                tracing::warn!(key = %cred.id, until = %reset_at, "credential rate limited");
            }
            DispatchOutcome::Invalid => {
                cred.status = CredentialStatus::Invalid;
                tracing::error!(key = %cred.id, "credential rejected by provider, benched for process lifetime");
            }
            DispatchOutcome::Undetermined => {
                cred.used_in_window = cred.used_in_window.saturating_sub(1);
            }
        }
    }

    /// Credentials not permanently benched
    pub fn usable_len(&self) -> usize {
        self.creds
            .lock()
            .iter()
            .filter(|c| c.status != CredentialStatus::Invalid)
            .count()
    }
}
