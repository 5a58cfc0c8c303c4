//! Vendor response -> canonical verdict model

use crate::intel::provider::{ProviderReport, VendorStats};
use crate::models::{DetectionStats, EngineResult, Verdict};

/// Normalized fields ready for persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedVerdict {
    pub verdict: Verdict,
    pub stats: DetectionStats,
    pub engines: Vec<EngineResult>,
}

/// Map the intermediate vendor schema onto the canonical model. Missing
/// fields become zero counts; per-engine detail is ordered by engine
/// name so persisted records are deterministic.
pub fn normalize(report: &ProviderReport) -> NormalizedVerdict {
    let stats = report.stats.map(DetectionStats::from).unwrap_or_default();

    let mut engines: Vec<EngineResult> = report
        .engines
        .as_ref()
        .map(|results| {
            results
                .values()
                .map(|engine| EngineResult {
                    engine_name: engine.engine_name.clone(),
                    category: engine.category.clone(),
                    result: engine.result.clone(),
                })
                .collect()
        })
        .unwrap_or_default();
    engines.sort_by(|a, b| a.engine_name.cmp(&b.engine_name));

    NormalizedVerdict { verdict: derive_verdict(&stats), stats, engines }
}

/// Strict priority order: one malicious detection dominates any number
/// of harmless engines.
pub fn derive_verdict(stats: &DetectionStats) -> Verdict {
    if stats.malicious > 0 {
        Verdict::Malicious
    } else if stats.suspicious > 0 {
        Verdict::Suspicious
    } else if stats.harmless > 0 {
        Verdict::Harmless
    } else {
        Verdict::Undetected
    }
}

/// Shape persisted when the external call failed outright: `unknown`
/// verdict, empty stats, so the indicator is not re-queried every batch.
pub fn unknown_fallback() -> NormalizedVerdict {
    NormalizedVerdict {
        verdict: Verdict::Unknown,
        stats: DetectionStats::default(),
        engines: Vec::new(),
    }
}

impl From<VendorStats> for DetectionStats {
    fn from(stats: VendorStats) -> Self {
        DetectionStats {
            malicious: stats.malicious,
            suspicious: stats.suspicious,
            harmless: stats.harmless,
            undetected: stats.undetected,
            timeout: stats.timeout,
        }
    }
}
