//! Scoring thresholds with built-in defaults.

use serde::{Deserialize, Serialize};

/// Default maximum acceptable data age in seconds.
pub const DEFAULT_MAX_DATA_AGE: i64 = 3600;
/// Default age in seconds after which a connectivity item is inactive.
pub const DEFAULT_INACTIVE_THRESHOLD: i64 = 7200;
/// Default age in seconds after which a master item is inactive.
pub const DEFAULT_MASTER_ITEM_THRESHOLD: i64 = 1800;
/// Default minimum acceptable weighted connectivity score.
pub const DEFAULT_MIN_CONNECTIVITY_SCORE: f64 = 0.8;

/// Fully populated scoring thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Thresholds {
    /// Maximum acceptable data age in seconds.
    pub max_data_age: i64,
    /// Age in seconds after which a connectivity item is inactive.
    pub inactive_threshold: i64,
    /// Age in seconds after which a master item is inactive.
    pub master_item_threshold: i64,
    /// Minimum acceptable weighted connectivity score (0.0-1.0).
    pub min_connectivity_score: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_data_age: DEFAULT_MAX_DATA_AGE,
            inactive_threshold: DEFAULT_INACTIVE_THRESHOLD,
            master_item_threshold: DEFAULT_MASTER_ITEM_THRESHOLD,
            min_connectivity_score: DEFAULT_MIN_CONNECTIVITY_SCORE,
        }
    }
}

impl Thresholds {
    /// Apply every override that is set.
    #[must_use]
    pub fn with_overrides(self, overrides: &ThresholdOverrides) -> Self {
        Self {
            max_data_age: overrides.max_data_age.unwrap_or(self.max_data_age),
            inactive_threshold: overrides
                .inactive_threshold
                .unwrap_or(self.inactive_threshold),
            master_item_threshold: overrides
                .master_item_threshold
                .unwrap_or(self.master_item_threshold),
            min_connectivity_score: overrides
                .min_connectivity_score
                .unwrap_or(self.min_connectivity_score),
        }
    }
}

/// Partial thresholds, as found in the rules file or the environment.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ThresholdOverrides {
    /// Override for [`Thresholds::max_data_age`].
    #[serde(default)]
    pub max_data_age: Option<i64>,
    /// Override for [`Thresholds::inactive_threshold`].
    #[serde(default)]
    pub inactive_threshold: Option<i64>,
    /// Override for [`Thresholds::master_item_threshold`].
    #[serde(default)]
    pub master_item_threshold: Option<i64>,
    /// Override for [`Thresholds::min_connectivity_score`].
    #[serde(default)]
    pub min_connectivity_score: Option<f64>,
}

impl ThresholdOverrides {
    /// Whether no override is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max_data_age.is_none()
            && self.inactive_threshold.is_none()
            && self.master_item_threshold.is_none()
            && self.min_connectivity_score.is_none()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.max_data_age, 3600);
        assert_eq!(t.inactive_threshold, 7200);
        assert_eq!(t.master_item_threshold, 1800);
        assert_eq!(t.min_connectivity_score, 0.8);
    }

    #[test]
    fn test_partial_overrides_keep_other_values() {
        let overrides = ThresholdOverrides {
            inactive_threshold: Some(600),
            ..ThresholdOverrides::default()
        };
        let t = Thresholds::default().with_overrides(&overrides);
        assert_eq!(t.inactive_threshold, 600);
        assert_eq!(t.master_item_threshold, DEFAULT_MASTER_ITEM_THRESHOLD);
        assert_eq!(t.min_connectivity_score, DEFAULT_MIN_CONNECTIVITY_SCORE);
    }

    #[test]
    fn test_layered_overrides_last_wins() {
        let file = ThresholdOverrides {
            inactive_threshold: Some(600),
            min_connectivity_score: Some(0.5),
            ..ThresholdOverrides::default()
        };
        let env = ThresholdOverrides {
            inactive_threshold: Some(900),
            ..ThresholdOverrides::default()
        };
        let t = Thresholds::default()
            .with_overrides(&file)
            .with_overrides(&env);
        assert_eq!(t.inactive_threshold, 900);
        assert_eq!(t.min_connectivity_score, 0.5);
    }

    #[test]
    fn test_overrides_deserialize_subset() {
        let o: ThresholdOverrides = serde_yaml::from_str("master_item_threshold: 60\n").unwrap();
        assert_eq!(o.master_item_threshold, Some(60));
        assert!(o.inactive_threshold.is_none());
        assert!(!o.is_empty());
        assert!(ThresholdOverrides::default().is_empty());
    }
}
