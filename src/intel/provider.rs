//! Threat-intel provider client (VirusTotal API v3 wire shape)
//!
//! One outbound call per unresolved indicator, keyed by indicator type:
//! hashes, IPs, domains and URLs each have their own endpoint shape.
//! Every call authenticates with the credential selected by the pool.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{Indicator, IndicatorType};

pub const DEFAULT_BASE_URL: &str = "https://www.virustotal.com/api/v3";

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("invalid API key")]
    InvalidKey,
    #[error("rate limited by provider")]
    RateLimited { retry_after_seconds: Option<u64> },
    #[error("indicator not known to provider")]
    NotFound,
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected provider status {0}")]
    Status(u16),
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Detection counts as the vendor reports them. Every field defaults so
/// a sparse response still deserializes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct VendorStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub undetected: u32,
    #[serde(default)]
    pub timeout: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorEngineResult {
    pub engine_name: String,
    pub category: String,
    pub result: Option<String>,
}

/// Quota numbers surfaced by response headers, when present
#[derive(Debug, Clone, Copy)]
pub struct QuotaSnapshot {
    pub remaining: Option<u32>,
    pub reset_at: Option<DateTime<Utc>>,
}

/// Intermediate vendor schema handed to the normalizer. Both fields are
/// optional on the wire; defaulting happens downstream.
#[derive(Debug, Clone, Default)]
pub struct ProviderReport {
    pub stats: Option<VendorStats>,
    pub engines: Option<HashMap<String, VendorEngineResult>>,
    pub quota: Option<QuotaSnapshot>,
}

#[async_trait]
pub trait IntelProvider: Send + Sync {
    async fn lookup(
        &self,
        indicator: &Indicator,
        api_key: &str,
    ) -> Result<ProviderReport, ProviderError>;
}

// ---- wire types ------------------------------------------------------

#[derive(Debug, Deserialize)]
struct VtApiResponse {
    data: VtApiData,
}

#[derive(Debug, Deserialize)]
struct VtApiData {
    #[serde(default)]
    attributes: VtApiAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct VtApiAttributes {
    last_analysis_stats: Option<VendorStats>,
    last_analysis_results: Option<HashMap<String, VendorEngineResult>>,
}

// ---- client ----------------------------------------------------------

pub struct VirusTotalProvider {
    http: reqwest::Client,
    base_url: String,
}

impl VirusTotalProvider {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url: DEFAULT_BASE_URL.to_string() })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, indicator: &Indicator) -> String {
        match indicator.kind {
            IndicatorType::Hash => format!("{}/files/{}", self.base_url, indicator.value),
            IndicatorType::Ip => format!("{}/ip_addresses/{}", self.base_url, indicator.value),
            IndicatorType::Domain => format!("{}/domains/{}", self.base_url, indicator.value),
            // URLs are addressed by their unpadded base64url identifier
            IndicatorType::Url => format!(
                "{}/urls/{}",
                self.base_url,
                URL_SAFE_NO_PAD.encode(indicator.value.as_bytes())
            ),
        }
    }
}

#[async_trait]
impl IntelProvider for VirusTotalProvider {
    async fn lookup(
        &self,
        indicator: &Indicator,
        api_key: &str,
    ) -> Result<ProviderReport, ProviderError> {
        let url = self.endpoint(indicator);

        let response = self
            .http
            .get(&url)
            .header("x-apikey", api_key)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let quota = quota_from_headers(response.headers());

        match status {
            200..=299 => {
                let body: VtApiResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Malformed(e.to_string()))?;

                Ok(ProviderReport {
                    stats: body.data.attributes.last_analysis_stats,
                    engines: body.data.attributes.last_analysis_results,
                    quota,
                })
            }
            401 => Err(ProviderError::InvalidKey),
            404 => Err(ProviderError::NotFound),
            429 => Err(ProviderError::RateLimited {
                retry_after_seconds: retry_after(response.headers()),
            }),
            other => Err(ProviderError::Status(other)),
        }
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

fn quota_from_headers(headers: &reqwest::header::HeaderMap) -> Option<QuotaSnapshot> {
    let remaining = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok());
    let reset_at = headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<i64>().ok())
        .and_then(|epoch| DateTime::from_timestamp(epoch, 0));

    if remaining.is_none() && reset_at.is_none() {
        None
    } else {
        Some(QuotaSnapshot { remaining, reset_at })
    }
}
