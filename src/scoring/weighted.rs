//! Staleness-based weighted scoring.
//!
//! Each classified item weighs `1 / priority_level`. An item is active when
//! its latest sample is no older than the inactive threshold. The host score
//! is the active weight over the total weight, rounded to three decimals.

use chrono::{DateTime, Utc};

use super::round_to;
use super::types::{
    AnalyzedItem, ConnectivityAnalysis, ConnectivitySummary, HostConnectivityResult, Issue,
    IssueSeverity, MasterItemResult, MasterItemsAnalysis, MasterItemsSummary,
};
use crate::classify::{group_ordered, ClassifiedItem};
use crate::model::{latest_record, HistoryMap, HistoryRecord};
use crate::rules::Thresholds;
use crate::traits::TimeProvider;

/// Issue text for an item without history.
pub const NO_DATA_MESSAGE: &str = "No data available";

/// Issue text for a stale item.
#[must_use]
pub fn stale_message(data_age_seconds: i64) -> String {
    format!(
        "No recent data for {} minutes",
        data_age_seconds.div_euclid(60)
    )
}

/// Weighted connectivity scorer.
#[derive(Debug, Clone)]
pub struct ConnectivityScorer<T: TimeProvider> {
    thresholds: Thresholds,
    time: T,
}

impl<T: TimeProvider> ConnectivityScorer<T> {
    /// Create a scorer with fully merged thresholds.
    #[must_use]
    pub const fn new(thresholds: Thresholds, time: T) -> Self {
        Self { thresholds, time }
    }

    /// Thresholds in use.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Score every host that has classified items.
    #[must_use]
    pub fn analyze_connectivity(
        &self,
        items: &[ClassifiedItem],
        history: &HistoryMap,
    ) -> ConnectivityAnalysis {
        tracing::info!(item_count = items.len(), "Analyzing connectivity items");
        let now = self.time.now();

        let hosts: Vec<HostConnectivityResult> = group_ordered(items, |i| i.hostid.as_str())
            .into_iter()
            .map(|(_, host_items)| self.score_host(&host_items, history, now))
            .collect();
        let summary = self.summary(&hosts);

        tracing::info!(
            total_hosts = summary.total_hosts,
            hosts_with_connectivity = summary.hosts_with_connectivity,
            average_score = summary.average_connectivity_score,
            "Connectivity analysis completed"
        );

        ConnectivityAnalysis {
            summary,
            hosts,
            max_data_age: self.thresholds.max_data_age,
            analysis_timestamp: now,
        }
    }

    /// Score one host's items. An empty slice gives score 0.0 with
    /// `total_items == 0`.
    #[must_use]
    pub fn analyze_host(
        &self,
        items: &[&ClassifiedItem],
        history: &HistoryMap,
    ) -> HostConnectivityResult {
        self.score_host(items, history, self.time.now())
    }

    fn score_host(
        &self,
        items: &[&ClassifiedItem],
        history: &HistoryMap,
        now: DateTime<Utc>,
    ) -> HostConnectivityResult {
        let Some(first) = items.first() else {
            return HostConnectivityResult::empty();
        };

        let mut analyzed = Vec::with_capacity(items.len());
        let mut issues = Vec::new();
        let mut active_items = 0;
        let mut total_weight = 0.0;
        let mut weighted_score = 0.0;

        for item in items {
            let weight = item.priority.weight();
            let latest = latest_sample(history, &item.itemid);
            let mut record = AnalyzedItem {
                itemid: item.itemid.clone(),
                key: item.key.clone(),
                name: item.name.clone(),
                template: item.template.clone(),
                status: item.status,
                required: item.required,
                priority: item.priority,
                lastvalue: item.lastvalue.clone(),
                lastclock: item.lastclock,
                data_available: false,
                is_active: false,
                data_age_seconds: None,
            };

            let issue_text = match latest {
                Some(sample) => {
                    let age = now.timestamp() - sample.clock;
                    record.lastvalue = Some(sample.value.clone());
                    record.lastclock = Some(sample.clock);
                    record.data_available = true;
                    record.data_age_seconds = Some(age);
                    if age <= self.thresholds.inactive_threshold {
                        record.is_active = true;
                        active_items += 1;
                        weighted_score += weight;
                        None
                    } else {
                        Some(stale_message(age))
                    }
                }
                None => Some(NO_DATA_MESSAGE.to_string()),
            };

            if let Some(text) = issue_text {
                issues.push(Issue {
                    itemid: item.itemid.clone(),
                    key: item.key.clone(),
                    name: item.name.clone(),
                    issue: text,
                    severity: IssueSeverity::for_required(item.required),
                    data_age_seconds: record.data_age_seconds,
                });
            }

            total_weight += weight;
            analyzed.push(record);
        }

        let score = if total_weight > 0.0 {
            weighted_score / total_weight
        } else {
            0.0
        };

        tracing::debug!(
            hostid = %first.hostid,
            score,
            issue_count = issues.len(),
            "Host scored"
        );

        HostConnectivityResult {
            hostid: Some(first.hostid.clone()),
            hostname: Some(first.hostname.clone()),
            connectivity_score: round_to(score, 3),
            total_items: items.len(),
            active_items,
            inactive_items: items.len() - active_items,
            connectivity_items: analyzed,
            issues,
        }
    }

    /// Aggregate host results.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn summary(&self, hosts: &[HostConnectivityResult]) -> ConnectivitySummary {
        let total_hosts = hosts.len();
        let hosts_with_connectivity = hosts
            .iter()
            .filter(|h| h.connectivity_score >= self.thresholds.min_connectivity_score)
            .count();
        let average = if total_hosts > 0 {
            hosts.iter().map(|h| h.connectivity_score).sum::<f64>() / total_hosts as f64
        } else {
            0.0
        };

        ConnectivitySummary {
            total_hosts,
            hosts_with_connectivity,
            hosts_without_connectivity: total_hosts - hosts_with_connectivity,
            average_connectivity_score: round_to(average, 3),
            total_connectivity_items: hosts.iter().map(|h| h.total_items).sum(),
            active_items: hosts.iter().map(|h| h.active_items).sum(),
            inactive_items: hosts.iter().map(|h| h.inactive_items).sum(),
        }
    }

    /// Check every master item against the master-item threshold. No
    /// weighting and no per-host grouping.
    #[must_use]
    pub fn analyze_master_items(
        &self,
        items: &[ClassifiedItem],
        history: &HistoryMap,
    ) -> MasterItemsAnalysis {
        tracing::info!(item_count = items.len(), "Analyzing master items");
        let now = self.time.now();
        let mut summary = MasterItemsSummary {
            total_master_items: items.len(),
            ..MasterItemsSummary::default()
        };

        let results = items
            .iter()
            .map(|item| {
                let mut result = MasterItemResult {
                    itemid: item.itemid.clone(),
                    hostid: item.hostid.clone(),
                    hostname: item.hostname.clone(),
                    key: item.key.clone(),
                    name: item.name.clone(),
                    template: item.template.clone(),
                    status: item.status,
                    lastvalue: item.lastvalue.clone(),
                    lastclock: item.lastclock,
                    data_available: false,
                    is_active: false,
                    data_age_seconds: None,
                    issue: None,
                };

                match latest_sample(history, &item.itemid) {
                    Some(sample) => {
                        let age = now.timestamp() - sample.clock;
                        result.lastvalue = Some(sample.value.clone());
                        result.lastclock = Some(sample.clock);
                        result.data_available = true;
                        result.data_age_seconds = Some(age);
                        summary.items_with_data += 1;
                        if age <= self.thresholds.master_item_threshold {
                            result.is_active = true;
                            summary.active_items += 1;
                        } else {
                            result.issue = Some(stale_message(age));
                            summary.inactive_items += 1;
                        }
                    }
                    None => {
                        result.issue = Some(NO_DATA_MESSAGE.to_string());
                        summary.items_without_data += 1;
                        summary.inactive_items += 1;
                    }
                }
                result
            })
            .collect();

        tracing::info!(
            active = summary.active_items,
            inactive = summary.inactive_items,
            "Master item analysis completed"
        );

        MasterItemsAnalysis {
            summary,
            items: results,
            analysis_timestamp: now,
        }
    }
}

fn latest_sample<'h>(history: &'h HistoryMap, itemid: &str) -> Option<&'h HistoryRecord> {
    history
        .get(itemid)
        .and_then(|records| latest_record(records))
}
