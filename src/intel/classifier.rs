//! Indicator classification and normalization
//!
//! Detection order is significant: fixed-length hex hashes carry the
//! lowest false-positive risk and go first, then IPv4 literals, then
//! URLs (scheme required), with bare domains as the fallback shape.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::models::{Indicator, IndicatorType};

// MD5 / SHA1 / SHA256
static HASH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[0-9a-fA-F]{32}|[0-9a-fA-F]{40}|[0-9a-fA-F]{64})$").unwrap()
});

// LDH labels, alphabetic TLD, at least one separator
static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("empty indicator")]
    Empty,
    #[error("unrecognized indicator: {raw}")]
    Unrecognized { raw: String },
}

/// Classify a raw string into a normalized indicator.
///
/// Callers processing batches treat an error as a per-item skip, never a
/// batch-level failure.
pub fn classify(raw: &str) -> Result<Indicator, ClassificationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClassificationError::Empty);
    }

    if HASH_RE.is_match(trimmed) {
        return Ok(Indicator::new(trimmed.to_ascii_lowercase(), IndicatorType::Hash));
    }

    // Strict dotted-decimal; out-of-range octets fail the parse
    if let Ok(ip) = trimmed.parse::<Ipv4Addr>() {
        return Ok(Indicator::new(ip.to_string(), IndicatorType::Ip));
    }

    if trimmed.contains("://") {
        return classify_url(trimmed);
    }

    let lowered = trimmed.to_ascii_lowercase();
    if DOMAIN_RE.is_match(&lowered) {
        return Ok(Indicator::new(lowered, IndicatorType::Domain));
    }

    Err(ClassificationError::Unrecognized { raw: trimmed.to_string() })
}

fn classify_url(trimmed: &str) -> Result<Indicator, ClassificationError> {
    let unrecognized = || ClassificationError::Unrecognized { raw: trimmed.to_string() };

    let mut parsed = Url::parse(trimmed).map_err(|_| unrecognized())?;
    if !parsed.has_host() {
        return Err(unrecognized());
    }

    // Canonical form: no fragment, lower-cased host, default port dropped
    // (the parser already strips a port matching the scheme default)
    parsed.set_fragment(None);

    Ok(Indicator::new(parsed.to_string(), IndicatorType::Url))
}
