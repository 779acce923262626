//! Success-rate scoring for tag-detected items.
//!
//! Each item is scored on its most recent samples: the share of samples
//! equal to the expected success value. A host has issues when any of its
//! items falls below one global threshold percentage.

use std::fmt;

use super::round_to;
use super::types::{
    ConnectivityScore, HostTagAnalysis, ItemScore, ProblematicItem, ScoreStatus,
    TagAnalysisSummary, TagBasedAnalysis,
};
use crate::classify::TagDetectionResult;
use crate::model::{most_recent, HistoryMap, HistoryRecord};
use crate::traits::TimeProvider;

/// Default number of recent samples scored per item.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Default threshold percentage.
pub const DEFAULT_THRESHOLD_PERCENTAGE: f64 = 70.0;

/// The sample value that counts as a success.
///
/// Samples are converted to the expected value's type before comparing.
/// A sample that does not convert is a non-match.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    /// Integer comparison.
    Int(i64),
    /// Float comparison.
    Float(f64),
    /// String equality.
    Text(String),
}

impl Default for ExpectedValue {
    fn default() -> Self {
        Self::Int(1)
    }
}

impl ExpectedValue {
    /// Parse a configured value: integer, else float, else text.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(v) = trimmed.parse::<i64>() {
            Self::Int(v)
        } else if let Ok(v) = trimmed.parse::<f64>() {
            Self::Float(v)
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Whether a raw sample value equals the expected value.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn matches(&self, sample: &str) -> bool {
        match self {
            Self::Int(expected) => sample.trim().parse::<i64>().is_ok_and(|v| v == *expected),
            Self::Float(expected) => sample.trim().parse::<f64>().is_ok_and(|v| v == *expected),
            Self::Text(expected) => sample == expected,
        }
    }
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// Score samples against the expected value.
///
/// `percentage = round(100 * successful / total, 2)` and
/// `score = round(successful / total, 4)`. No samples gives
/// [`ScoreStatus::NoData`] with zero counts.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_connectivity_score<'a>(
    samples: impl IntoIterator<Item = &'a HistoryRecord>,
    expected: &ExpectedValue,
) -> ConnectivityScore {
    let mut total_count = 0;
    let mut successful_count = 0;
    for sample in samples {
        total_count += 1;
        if expected.matches(&sample.value) {
            successful_count += 1;
        }
    }

    if total_count == 0 {
        return ConnectivityScore::no_data();
    }

    let successful = successful_count as f64;
    let total = total_count as f64;
    let percentage = round_to(successful * 100.0 / total, 2);
    ConnectivityScore {
        percentage,
        score: round_to(successful / total, 4),
        successful_count,
        total_count,
        status: ScoreStatus::from_percentage(percentage),
    }
}

/// Tag-mode scorer.
#[derive(Debug, Clone)]
pub struct TagConnectivityScorer<T: TimeProvider> {
    expected: ExpectedValue,
    history_limit: usize,
    threshold_percentage: f64,
    time: T,
}

impl<T: TimeProvider> TagConnectivityScorer<T> {
    /// Create a scorer with default expected value, history limit and
    /// threshold.
    #[must_use]
    pub fn new(time: T) -> Self {
        Self {
            expected: ExpectedValue::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            threshold_percentage: DEFAULT_THRESHOLD_PERCENTAGE,
            time,
        }
    }

    /// Set the expected success value.
    #[must_use]
    pub fn with_expected(mut self, expected: ExpectedValue) -> Self {
        self.expected = expected;
        self
    }

    /// Set how many recent samples are scored per item.
    #[must_use]
    pub const fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    /// Set the threshold percentage.
    #[must_use]
    pub const fn with_threshold(mut self, threshold_percentage: f64) -> Self {
        self.threshold_percentage = threshold_percentage;
        self
    }

    /// Score one item's history.
    #[must_use]
    pub fn score_item(&self, records: &[HistoryRecord]) -> ConnectivityScore {
        calculate_connectivity_score(
            most_recent(records, self.history_limit),
            &self.expected,
        )
    }

    /// Score every host with tagged items. Hosts without tagged items are
    /// passed through unscored.
    #[must_use]
    pub fn analyze_tag_based_connectivity(
        &self,
        detection: &TagDetectionResult,
        history: &HistoryMap,
    ) -> TagBasedAnalysis {
        tracing::info!(
            host_count = detection.hosts_with_items.len(),
            threshold = self.threshold_percentage,
            "Analyzing tag-based connectivity"
        );

        let mut hosts = Vec::with_capacity(detection.hosts_with_items.len());
        let mut problematic_items = Vec::new();
        let mut summary = TagAnalysisSummary {
            hosts_without_connection_items: detection.hosts_without_items.len(),
            threshold_percentage: self.threshold_percentage,
            ..TagAnalysisSummary::default()
        };

        for tagged_host in &detection.hosts_with_items {
            let mut items = Vec::with_capacity(tagged_host.items.len());
            let mut below = 0;

            for item in &tagged_host.items {
                let records = history.get(&item.itemid).map_or(&[][..], Vec::as_slice);
                let score = self.score_item(records);

                if score.percentage < self.threshold_percentage {
                    below += 1;
                    problematic_items.push(ProblematicItem {
                        host: tagged_host.host.clone(),
                        itemid: item.itemid.clone(),
                        item_name: item.name.clone(),
                        key: item.key.clone(),
                        percentage: score.percentage,
                        status: score.status,
                        successful_count: score.successful_count,
                        total_count: score.total_count,
                        message: format!(
                            "{} on {}: {:.2}% success ({}/{}), below {}% threshold",
                            item.name,
                            tagged_host.host.hostname,
                            score.percentage,
                            score.successful_count,
                            score.total_count,
                            self.threshold_percentage
                        ),
                    });
                }

                items.push(ItemScore {
                    itemid: item.itemid.clone(),
                    key: item.key.clone(),
                    name: item.name.clone(),
                    score,
                });
            }

            let has_issues = below > 0;
            summary.total_items_analyzed += items.len();
            summary.items_below_threshold += below;
            if has_issues {
                summary.hosts_with_issues += 1;
            } else {
                summary.hosts_without_issues += 1;
            }

            hosts.push(HostTagAnalysis {
                host: tagged_host.host.clone(),
                total_items: items.len(),
                items_below_threshold: below,
                has_issues,
                items,
            });
        }
        summary.total_hosts_analyzed = hosts.len();

        tracing::info!(
            total_hosts_analyzed = summary.total_hosts_analyzed,
            hosts_with_issues = summary.hosts_with_issues,
            items_below_threshold = summary.items_below_threshold,
            "Tag-based analysis completed"
        );

        TagBasedAnalysis {
            summary,
            hosts,
            problematic_items,
            hosts_without_connection_items: detection.hosts_without_items.clone(),
            analysis_timestamp: self.time.now(),
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
mod tests {
    use super::*;
    use crate::classify::{TaggedHost, TaggedItem};
    use crate::model::{HostRef, ValueType};
    use crate::traits::RealTimeProvider;
    use proptest::prelude::*;

    fn samples(itemid: &str, values: &[&str]) -> Vec<HistoryRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| HistoryRecord::new(itemid, 1000 - i as i64, *v))
            .collect()
    }

    fn tagged_item(itemid: &str, key: &str, name: &str) -> TaggedItem {
        TaggedItem {
            itemid: itemid.into(),
            key: key.into(),
            name: name.into(),
            value_type: ValueType::Unsigned,
            lastvalue: None,
            lastclock: None,
        }
    }

    #[test]
    fn test_all_successful() {
        let history = samples("1001", &["1"; 10]);
        let score = calculate_connectivity_score(&history, &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 100.0);
        assert_eq!(score.score, 1.0);
        assert_eq!(score.successful_count, 10);
        assert_eq!(score.total_count, 10);
        assert_eq!(score.status, ScoreStatus::Healthy);
    }

    #[test]
    fn test_partial_success() {
        let history = samples("1001", &["1", "0", "1", "1", "0", "1", "1", "1", "1", "1"]);
        let score = calculate_connectivity_score(&history, &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 80.0);
        assert_eq!(score.score, 0.8);
        assert_eq!(score.status, ScoreStatus::Healthy);
    }

    fn ones_in(k: usize, n: usize) -> Vec<HistoryRecord> {
        let values: Vec<&str> = (0..n).map(|i| if i < k { "1" } else { "0" }).collect();
        samples("1", &values)
    }

    #[test]
    fn test_exact_halves_round_to_even() {
        let score = calculate_connectivity_score(&ones_in(1, 32), &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 3.12);
        assert_eq!(score.score, 0.0312);

        let score = calculate_connectivity_score(&ones_in(3, 32), &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 9.38);
        assert_eq!(score.score, 0.0938);

        let score = calculate_connectivity_score(&ones_in(5, 32), &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 15.62);
        assert_eq!(score.score, 0.1562);

        let score = calculate_connectivity_score(&ones_in(1, 160), &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 0.62);
    }

    #[test]
    fn test_warning_and_critical_bands() {
        let warning = samples("1", &["1", "1", "1", "1", "1", "1", "0", "0", "0", "0"]);
        let score = calculate_connectivity_score(&warning, &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 60.0);
        assert_eq!(score.status, ScoreStatus::Warning);

        let critical = samples("1", &["1", "1", "1", "0", "0", "0", "0", "0", "0", "0"]);
        let score = calculate_connectivity_score(&critical, &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 30.0);
        assert_eq!(score.status, ScoreStatus::Critical);
    }

    #[test]
    fn test_no_data() {
        let score = calculate_connectivity_score(&[], &ExpectedValue::Int(1));
        assert_eq!(score, ConnectivityScore::no_data());
    }

    #[test]
    fn test_rounding() {
        let history = samples("1", &["1", "0", "0"]);
        let score = calculate_connectivity_score(&history, &ExpectedValue::Int(1));
        assert_eq!(score.percentage, 33.33);
        assert_eq!(score.score, 0.3333);
    }

    #[test]
    fn test_conversion_failure_is_non_match() {
        let history = samples("1", &["1", "up", "1.0", " 1 "]);
        let score = calculate_connectivity_score(&history, &ExpectedValue::Int(1));
        assert_eq!(score.successful_count, 2);
        assert_eq!(score.total_count, 4);
    }

    #[test]
    fn test_expected_value_parsing_and_coercion() {
        assert_eq!(ExpectedValue::parse("1"), ExpectedValue::Int(1));
        assert_eq!(ExpectedValue::parse("0.5"), ExpectedValue::Float(0.5));
        assert_eq!(ExpectedValue::parse("up"), ExpectedValue::Text("up".into()));

        assert!(ExpectedValue::Float(1.0).matches("1"));
        assert!(ExpectedValue::Float(1.0).matches("1.0"));
        assert!(!ExpectedValue::Float(1.0).matches("yes"));
        assert!(ExpectedValue::Text("up".into()).matches("up"));
        assert!(!ExpectedValue::Text("up".into()).matches("UP"));
        assert_eq!(ExpectedValue::default().to_string(), "1");
    }

    #[test]
    fn test_score_item_uses_most_recent_samples() {
        let scorer = TagConnectivityScorer::new(RealTimeProvider).with_history_limit(2);
        // newest two are failures
        let records = vec![
            HistoryRecord::new("1", 10, "1"),
            HistoryRecord::new("1", 30, "0"),
            HistoryRecord::new("1", 20, "0"),
        ];
        let score = scorer.score_item(&records);
        assert_eq!(score.total_count, 2);
        assert_eq!(score.successful_count, 0);
    }

    #[test]
    fn test_analysis_flags_item_below_threshold() {
        let detection = TagDetectionResult {
            total_hosts: 1,
            total_connection_items: 2,
            hosts_with_items: vec![TaggedHost {
                host: HostRef::new("100", "host1", "Host 1"),
                items: vec![
                    tagged_item("1001", "icmpping", "ICMP Ping"),
                    tagged_item("1002", "agent.ping", "Agent Status"),
                ],
            }],
            hosts_without_items: Vec::new(),
        };
        let mut history = HistoryMap::new();
        history.insert("1001".into(), samples("1001", &["1"; 10]));
        history.insert(
            "1002".into(),
            samples("1002", &["1", "1", "1", "1", "1", "0", "0", "0", "0", "0"]),
        );

        let analysis = TagConnectivityScorer::new(RealTimeProvider)
            .with_threshold(70.0)
            .analyze_tag_based_connectivity(&detection, &history);

        assert_eq!(analysis.summary.total_hosts_analyzed, 1);
        assert_eq!(analysis.summary.hosts_with_issues, 1);
        assert_eq!(analysis.summary.hosts_without_issues, 0);
        assert_eq!(analysis.summary.items_below_threshold, 1);
        assert_eq!(analysis.summary.total_items_analyzed, 2);
        assert_eq!(analysis.problematic_items.len(), 1);
        let problem = &analysis.problematic_items[0];
        assert_eq!(problem.itemid, "1002");
        assert_eq!(problem.percentage, 50.0);
        assert_eq!(problem.status, ScoreStatus::Warning);
        assert!(problem.message.contains("Agent Status"));
        assert!(analysis.hosts[0].has_issues);
    }

    #[test]
    fn test_item_without_history_is_below_threshold() {
        let detection = TagDetectionResult {
            total_hosts: 1,
            total_connection_items: 1,
            hosts_with_items: vec![TaggedHost {
                host: HostRef::new("100", "host1", "Host 1"),
                items: vec![tagged_item("1001", "icmpping", "ICMP Ping")],
            }],
            hosts_without_items: Vec::new(),
        };
        let analysis = TagConnectivityScorer::new(RealTimeProvider)
            .analyze_tag_based_connectivity(&detection, &HistoryMap::new());
        assert_eq!(analysis.hosts[0].items[0].score.status, ScoreStatus::NoData);
        assert!(analysis.hosts[0].has_issues);
        assert_eq!(analysis.problematic_items[0].status, ScoreStatus::NoData);
    }

    #[test]
    fn test_hosts_without_items_pass_through() {
        let detection = TagDetectionResult {
            total_hosts: 3,
            total_connection_items: 1,
            hosts_with_items: vec![TaggedHost {
                host: HostRef::new("100", "host1", "Host 1"),
                items: vec![tagged_item("1001", "icmpping", "ICMP Ping")],
            }],
            hosts_without_items: vec![
                HostRef::new("200", "host2", "Host 2"),
                HostRef::new("300", "host3", "Host 3"),
            ],
        };
        let mut history = HistoryMap::new();
        history.insert("1001".into(), samples("1001", &["1"; 10]));

        let analysis = TagConnectivityScorer::new(RealTimeProvider)
            .analyze_tag_based_connectivity(&detection, &history);

        assert_eq!(analysis.summary.hosts_without_connection_items, 2);
        assert_eq!(analysis.hosts_without_connection_items[0].hostid, "200");
        assert_eq!(analysis.hosts_without_connection_items[1].hostid, "300");
        assert_eq!(analysis.hosts.len(), 1);
        assert!(!analysis.hosts[0].has_issues);
    }

    proptest! {
        #[test]
        fn prop_percentage_formula(k in 0usize..=50, extra in 0usize..=50) {
            let n = k + extra;
            prop_assume!(n > 0);
            let values: Vec<&str> = (0..n).map(|i| if i < k { "1" } else { "0" }).collect();
            let history = samples("1", &values);
            let score = calculate_connectivity_score(&history, &ExpectedValue::Int(1));

            let exact = k as f64 * 100.0 / n as f64;
            prop_assert!((score.percentage - exact).abs() <= 0.005 + 1e-9);
            let hundredths = score.percentage * 100.0;
            prop_assert!((hundredths - hundredths.round()).abs() < 1e-6);
            prop_assert_eq!(score.successful_count, k);
            prop_assert_eq!(score.total_count, n);
            let band = if score.percentage >= 70.0 {
                ScoreStatus::Healthy
            } else if score.percentage >= 50.0 {
                ScoreStatus::Warning
            } else {
                ScoreStatus::Critical
            };
            prop_assert_eq!(score.status, band);
        }
    }
}
