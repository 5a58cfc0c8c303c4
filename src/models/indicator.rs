//! Indicator vocabulary - typed, normalized identifiers and verdicts

use serde::{Deserialize, Serialize};

/// Kind of threat indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorType {
    Ip,
    Domain,
    Url,
    Hash,
}

impl IndicatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorType::Ip => "ip",
            IndicatorType::Domain => "domain",
            IndicatorType::Url => "url",
            IndicatorType::Hash => "hash",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ip" => Some(IndicatorType::Ip),
            "domain" => Some(IndicatorType::Domain),
            "url" => Some(IndicatorType::Url),
            "hash" => Some(IndicatorType::Hash),
            _ => None,
        }
    }
}

/// A normalized indicator. The `(value, kind)` pair is the indicator's
/// identity: at most one stored record exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Indicator {
    /// Canonical form: lower-cased domain/hash, defragmented URL,
    /// dotted-decimal IP
    pub value: String,
    pub kind: IndicatorType,
}

impl Indicator {
    pub fn new(value: impl Into<String>, kind: IndicatorType) -> Self {
        Self { value: value.into(), kind }
    }
}

impl std::fmt::Display for Indicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.value, self.kind.as_str())
    }
}

/// Canonical five-valued lookup outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Malicious,
    Suspicious,
    Harmless,
    Undetected,
    Unknown,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Malicious => "malicious",
            Verdict::Suspicious => "suspicious",
            Verdict::Harmless => "harmless",
            Verdict::Undetected => "undetected",
            Verdict::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "malicious" => Some(Verdict::Malicious),
            "suspicious" => Some(Verdict::Suspicious),
            "harmless" => Some(Verdict::Harmless),
            "undetected" => Some(Verdict::Undetected),
            "unknown" => Some(Verdict::Unknown),
            _ => None,
        }
    }
}

/// Per-engine detection counts. Absent vendor fields stay zero so
/// downstream aggregation never sees a null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    pub malicious: u32,
    pub suspicious: u32,
    pub harmless: u32,
    pub undetected: u32,
    pub timeout: u32,
}

/// Raw per-engine detail from the vendor response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineResult {
    pub engine_name: String,
    pub category: String,
    pub result: Option<String>,
}
