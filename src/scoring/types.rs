//! Scoring output records.
//!
//! Field names are part of the persisted report contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{HostRef, ItemStatus};
use crate::rules::Priority;

// ============================================================================
// Weighted mode
// ============================================================================

/// Severity of a connectivity issue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Optional item is stale or missing.
    Warning,
    /// Required item is stale or missing.
    Error,
}

impl IssueSeverity {
    /// Severity for an item with the given required flag.
    #[must_use]
    pub const fn for_required(required: bool) -> Self {
        if required {
            Self::Error
        } else {
            Self::Warning
        }
    }
}

/// A stale or missing connectivity item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    /// Item identifier.
    pub itemid: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Description.
    pub issue: String,
    /// Severity.
    pub severity: IssueSeverity,
    /// Age of the latest sample, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_age_seconds: Option<i64>,
}

/// Per-item record in a host result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalyzedItem {
    /// Item identifier.
    pub itemid: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Template whose rule matched.
    pub template: String,
    /// Collection status.
    pub status: ItemStatus,
    /// Rule's required flag.
    pub required: bool,
    /// Rule's priority.
    pub priority: Priority,
    /// Latest value: from history when available, else from the item.
    pub lastvalue: Option<String>,
    /// Latest timestamp: from history when available, else from the item.
    pub lastclock: Option<i64>,
    /// Whether any history was found.
    pub data_available: bool,
    /// Whether the latest sample is within the inactive threshold.
    pub is_active: bool,
    /// Age of the latest sample.
    pub data_age_seconds: Option<i64>,
}

/// Weighted connectivity result for one host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConnectivityResult {
    /// Host identifier; absent when the host had no items.
    pub hostid: Option<String>,
    /// Technical host name; absent when the host had no items.
    pub hostname: Option<String>,
    /// Weighted score in `[0.0, 1.0]`, three decimals.
    pub connectivity_score: f64,
    /// Items scored.
    pub total_items: usize,
    /// Items with recent data.
    pub active_items: usize,
    /// Items stale or without data.
    pub inactive_items: usize,
    /// Per-item records.
    pub connectivity_items: Vec<AnalyzedItem>,
    /// Problems found.
    pub issues: Vec<Issue>,
}

impl HostConnectivityResult {
    /// Result for a host with nothing to score.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            hostid: None,
            hostname: None,
            connectivity_score: 0.0,
            total_items: 0,
            active_items: 0,
            inactive_items: 0,
            connectivity_items: Vec::new(),
            issues: Vec::new(),
        }
    }
}

/// Aggregate over all hosts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConnectivitySummary {
    /// Hosts scored.
    pub total_hosts: usize,
    /// Hosts at or above the minimum score.
    pub hosts_with_connectivity: usize,
    /// Hosts below the minimum score.
    pub hosts_without_connectivity: usize,
    /// Mean host score, three decimals.
    pub average_connectivity_score: f64,
    /// Items scored across all hosts.
    pub total_connectivity_items: usize,
    /// Active items across all hosts.
    pub active_items: usize,
    /// Inactive items across all hosts.
    pub inactive_items: usize,
}

/// Weighted connectivity analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectivityAnalysis {
    /// Aggregate.
    pub summary: ConnectivitySummary,
    /// Per-host results, in order of first appearance.
    pub hosts: Vec<HostConnectivityResult>,
    /// Configured maximum acceptable data age, for report readers.
    pub max_data_age: i64,
    /// When the analysis ran.
    pub analysis_timestamp: DateTime<Utc>,
}

/// Staleness check of one master item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterItemResult {
    /// Item identifier.
    pub itemid: String,
    /// Host identifier.
    pub hostid: String,
    /// Technical host name.
    pub hostname: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Template whose rule matched.
    pub template: String,
    /// Collection status.
    pub status: ItemStatus,
    /// Latest value.
    pub lastvalue: Option<String>,
    /// Latest timestamp.
    pub lastclock: Option<i64>,
    /// Whether any history was found.
    pub data_available: bool,
    /// Whether the latest sample is within the master-item threshold.
    pub is_active: bool,
    /// Age of the latest sample.
    pub data_age_seconds: Option<i64>,
    /// Description when inactive.
    pub issue: Option<String>,
}

/// Master item tallies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterItemsSummary {
    /// Items checked.
    pub total_master_items: usize,
    /// Items with recent data.
    pub active_items: usize,
    /// Items stale or without data.
    pub inactive_items: usize,
    /// Items with any history.
    pub items_with_data: usize,
    /// Items with no history.
    pub items_without_data: usize,
}

/// Master item analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MasterItemsAnalysis {
    /// Tallies.
    pub summary: MasterItemsSummary,
    /// Per-item results, in input order.
    pub items: Vec<MasterItemResult>,
    /// When the analysis ran.
    pub analysis_timestamp: DateTime<Utc>,
}

// ============================================================================
// Tag / percentage mode
// ============================================================================

/// Health band of a success percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreStatus {
    /// At least 70%.
    Healthy,
    /// At least 50%.
    Warning,
    /// Below 50%.
    Critical,
    /// No samples.
    NoData,
}

impl ScoreStatus {
    /// Band for a percentage computed from at least one sample.
    #[must_use]
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= super::HEALTHY_PERCENTAGE {
            Self::Healthy
        } else if percentage >= super::WARNING_PERCENTAGE {
            Self::Warning
        } else {
            Self::Critical
        }
    }

    /// Report spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::NoData => "no_data",
        }
    }
}

impl std::fmt::Display for ScoreStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success rate over recent samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConnectivityScore {
    /// `100 * successful / total`, two decimals.
    pub percentage: f64,
    /// `successful / total`, four decimals.
    pub score: f64,
    /// Samples equal to the expected value.
    pub successful_count: usize,
    /// Samples considered.
    pub total_count: usize,
    /// Health band.
    pub status: ScoreStatus,
}

impl ConnectivityScore {
    /// Score of an item without samples.
    #[must_use]
    pub const fn no_data() -> Self {
        Self {
            percentage: 0.0,
            score: 0.0,
            successful_count: 0,
            total_count: 0,
            status: ScoreStatus::NoData,
        }
    }
}

/// Score of one tagged item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemScore {
    /// Item identifier.
    pub itemid: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Success rate.
    #[serde(flatten)]
    pub score: ConnectivityScore,
}

/// Tag-mode result for one host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostTagAnalysis {
    /// Host identity.
    #[serde(flatten)]
    pub host: HostRef,
    /// Tagged items scored.
    pub total_items: usize,
    /// Items below the threshold percentage.
    pub items_below_threshold: usize,
    /// Whether any item is below the threshold.
    pub has_issues: bool,
    /// Per-item scores.
    pub items: Vec<ItemScore>,
}

/// An item below the threshold percentage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProblematicItem {
    /// Owning host.
    #[serde(flatten)]
    pub host: HostRef,
    /// Item identifier.
    pub itemid: String,
    /// Item name.
    pub item_name: String,
    /// Item key.
    pub key: String,
    /// Success percentage.
    pub percentage: f64,
    /// Health band.
    pub status: ScoreStatus,
    /// Samples equal to the expected value.
    pub successful_count: usize,
    /// Samples considered.
    pub total_count: usize,
    /// Human-readable description.
    pub message: String,
}

/// Tag-mode aggregate.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TagAnalysisSummary {
    /// Hosts with tagged items.
    pub total_hosts_analyzed: usize,
    /// Hosts with at least one item below threshold.
    pub hosts_with_issues: usize,
    /// Hosts with every item at or above threshold.
    pub hosts_without_issues: usize,
    /// Hosts with no tagged items.
    pub hosts_without_connection_items: usize,
    /// Tagged items scored.
    pub total_items_analyzed: usize,
    /// Items below threshold.
    pub items_below_threshold: usize,
    /// Threshold applied.
    pub threshold_percentage: f64,
}

/// Tag-mode analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagBasedAnalysis {
    /// Aggregate.
    pub summary: TagAnalysisSummary,
    /// Per-host results.
    pub hosts: Vec<HostTagAnalysis>,
    /// Every item below threshold.
    pub problematic_items: Vec<ProblematicItem>,
    /// Hosts with no tagged items, never scored.
    pub hosts_without_connection_items: Vec<HostRef>,
    /// When the analysis ran.
    pub analysis_timestamp: DateTime<Utc>,
}
