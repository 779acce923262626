//! Connectivity scoring.
//!
//! - [`ConnectivityScorer`]: weighted, staleness-based score per host for
//!   template-classified items, plus the master-item check.
//! - [`TagConnectivityScorer`]: success-rate score per item for
//!   tag-detected items.

mod tagged;
mod types;
mod weighted;

pub use tagged::{
    calculate_connectivity_score, ExpectedValue, TagConnectivityScorer, DEFAULT_HISTORY_LIMIT,
    DEFAULT_THRESHOLD_PERCENTAGE,
};
pub use types::{
    AnalyzedItem, ConnectivityAnalysis, ConnectivityScore, ConnectivitySummary,
    HostConnectivityResult, HostTagAnalysis, Issue, IssueSeverity, ItemScore, MasterItemResult,
    MasterItemsAnalysis, MasterItemsSummary, ProblematicItem, ScoreStatus, TagAnalysisSummary,
    TagBasedAnalysis,
};
pub use weighted::{stale_message, ConnectivityScorer, NO_DATA_MESSAGE};

/// Lowest percentage rated healthy.
pub const HEALTHY_PERCENTAGE: f64 = 70.0;

/// Lowest percentage rated warning.
pub const WARNING_PERCENTAGE: f64 = 50.0;

/// Round to `places` decimals.
///
/// Rounds the exact binary value, halves to even, so `0.03125` becomes
/// `0.0312` and `2.675` (stored just below) becomes `2.67`.
#[must_use]
pub fn round_to(value: f64, places: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.places$}").parse().unwrap_or(value)
}
