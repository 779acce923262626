//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use super::{Config, DataSource};
use crate::error::ConfigError;

/// Minimum allowed timeout in milliseconds (1 second).
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Maximum allowed timeout in milliseconds (5 minutes).
pub const MAX_TIMEOUT_MS: u64 = 300_000;

/// Maximum allowed retry count.
pub const MAX_RETRIES: u32 = 10;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `ZABBIX_TIMEOUT_MS` must be between 1000 and 300000
/// - `MAX_RETRIES` must be between 0 and 10
/// - `THRESHOLD_PERCENTAGE` must be between 0 and 100
/// - `HISTORY_LIMIT`, `API_BATCH_SIZE`, `HISTORY_BATCH_SIZE` and
///   `HISTORY_WINDOW_SECS` must be positive
///
/// Returns [`ConfigError::MissingRequired`] if the API data source has
/// no URL or no credentials.
#[must_use = "validation result should be checked"]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.timeout_ms < MIN_TIMEOUT_MS || config.timeout_ms > MAX_TIMEOUT_MS {
        return Err(invalid(
            "ZABBIX_TIMEOUT_MS",
            format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms"),
        ));
    }

    if config.max_retries > MAX_RETRIES {
        return Err(invalid(
            "MAX_RETRIES",
            format!("must be between 0 and {MAX_RETRIES}"),
        ));
    }

    if !(0.0..=100.0).contains(&config.threshold_percentage) {
        return Err(invalid("THRESHOLD_PERCENTAGE", "must be between 0 and 100"));
    }

    for (var, value) in [
        ("HISTORY_LIMIT", config.history_limit),
        ("API_BATCH_SIZE", config.api_batch_size),
        ("HISTORY_BATCH_SIZE", config.history_batch_size),
    ] {
        if value == 0 {
            return Err(invalid(var, "must be greater than 0"));
        }
    }

    if config.history_window_secs <= 0 {
        return Err(invalid("HISTORY_WINDOW_SECS", "must be greater than 0"));
    }

    if config.data_source == DataSource::Api {
        if config.zabbix_url.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "ZABBIX_URL".into(),
            });
        }
        config.credentials()?;
    }

    Ok(())
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SecretString;

    fn create_valid_config() -> Config {
        Config {
            zabbix_user: Some("Admin".to_string()),
            zabbix_password: Some(SecretString::new("zabbix")),
            ..Config::default()
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_snapshot_needs_no_credentials() {
        let config = Config {
            data_source: DataSource::Snapshot,
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_api_without_url() {
        let mut config = create_valid_config();
        config.zabbix_url = "  ".into();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { var } if var == "ZABBIX_URL"));
    }

    #[test]
    fn test_timeout_too_low() {
        let mut config = create_valid_config();
        config.timeout_ms = 999;
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == "ZABBIX_TIMEOUT_MS")
        );
    }

    #[test]
    fn test_timeout_too_high() {
        let mut config = create_valid_config();
        config.timeout_ms = 300_001;
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == "ZABBIX_TIMEOUT_MS")
        );
    }

    #[test]
    fn test_retries_too_high() {
        let mut config = create_valid_config();
        config.max_retries = 11;
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "MAX_RETRIES"));
    }

    #[test]
    fn test_negative_threshold() {
        let mut config = create_valid_config();
        config.threshold_percentage = -0.5;
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == "THRESHOLD_PERCENTAGE")
        );
    }

    #[test]
    fn test_zero_batch_size() {
        let mut config = create_valid_config();
        config.history_batch_size = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == "HISTORY_BATCH_SIZE")
        );
    }

    #[test]
    fn test_zero_window() {
        let mut config = create_valid_config();
        config.history_window_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { var, .. } if var == "HISTORY_WINDOW_SECS")
        );
    }

    #[test]
    fn test_boundaries() {
        let mut config = create_valid_config();
        config.timeout_ms = MIN_TIMEOUT_MS;
        config.max_retries = 0;
        config.threshold_percentage = 0.0;
        assert!(validate_config(&config).is_ok());

        config.timeout_ms = MAX_TIMEOUT_MS;
        config.max_retries = MAX_RETRIES;
        config.threshold_percentage = 100.0;
        assert!(validate_config(&config).is_ok());
    }
}
