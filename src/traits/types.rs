//! Request types for the [`MonitoringSource`](super::MonitoringSource) seam.
//!
//! - [`HostFilter`]: which hosts to collect
//! - [`HistoryTarget`]: one item whose history is wanted
//! - [`HistoryRequest`]: a history query over many items
//! - [`BatchFailurePolicy`]: what a failed history batch does to the run

use crate::model::ValueType;

/// Host selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFilter {
    /// Host group names. Empty means all enabled hosts.
    pub host_groups: Vec<String>,
}

impl HostFilter {
    /// Filter by host group names.
    #[must_use]
    pub fn groups(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            host_groups: names.into_iter().map(Into::into).collect(),
        }
    }
}

/// One item whose history is wanted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTarget {
    /// Item identifier.
    pub itemid: String,
    /// Value kind, selecting the history table.
    pub value_type: ValueType,
}

impl HistoryTarget {
    /// Create a target.
    #[must_use]
    pub fn new(itemid: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            itemid: itemid.into(),
            value_type,
        }
    }
}

/// What happens when a history batch fails after retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchFailurePolicy {
    /// Abort the whole request.
    #[default]
    Abort,
    /// Log, contribute no history for the batch, continue.
    Skip,
}

/// History query over many items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Items to query.
    pub targets: Vec<HistoryTarget>,
    /// Most recent samples wanted per item.
    pub limit_per_item: usize,
    /// Window start (Unix seconds).
    pub time_from: i64,
    /// Window end (Unix seconds).
    pub time_till: i64,
    /// Behaviour on batch failure.
    pub failure_policy: BatchFailurePolicy,
}

impl HistoryRequest {
    /// Query the window `[time_till - window_secs, time_till]`.
    #[must_use]
    pub fn window(targets: Vec<HistoryTarget>, time_till: i64, window_secs: i64) -> Self {
        Self {
            targets,
            limit_per_item: 1,
            time_from: time_till - window_secs,
            time_till,
            failure_policy: BatchFailurePolicy::default(),
        }
    }

    /// Set the per-item sample limit.
    #[must_use]
    pub const fn with_limit(mut self, limit_per_item: usize) -> Self {
        self.limit_per_item = limit_per_item;
        self
    }

    /// Set the batch failure policy.
    #[must_use]
    pub const fn with_policy(mut self, failure_policy: BatchFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }
}
