//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading
//! - Configuration validation
//! - Default value handling
//! - Secure credential storage via [`SecretString`]
//!
//! # Example
//!
//! ```
//! use zabbix_monitoring::config::{Config, SecretString};
//!
//! // Use Config::from_env() in production
//! let config = Config {
//!     zabbix_user: Some("Admin".to_string()),
//!     zabbix_password: Some(SecretString::new("zabbix")),
//!     ..Config::default()
//! };
//!
//! assert!(config.credentials().is_ok());
//! // Passwords are protected from accidental logging
//! let debug = format!("{:?}", config);
//! assert!(debug.contains("<REDACTED>"));
//! assert!(!debug.contains("\"zabbix\""));
//! ```

mod secret;
mod validation;

pub use secret::SecretString;
pub use validation::{validate_config, MAX_RETRIES, MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::classify::DEFAULT_CONNECTION_TAG;
use crate::error::ConfigError;
use crate::pipeline::{PipelineSettings, DEFAULT_HISTORY_WINDOW_SECS};
use crate::rules::ThresholdOverrides;
use crate::scoring::{ExpectedValue, DEFAULT_HISTORY_LIMIT, DEFAULT_THRESHOLD_PERCENTAGE};
use crate::traits::HostFilter;
use crate::zabbix::{
    ClientConfig, Credentials, DEFAULT_API_BATCH_SIZE, DEFAULT_HISTORY_BATCH_SIZE,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS, DEFAULT_URL,
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default template rule file.
pub const DEFAULT_TEMPLATE_MAPPING: &str = "./mappings/templates.yml";

/// Default snapshot directory for offline runs.
pub const DEFAULT_INPUT_DIR: &str = "./debug_output";

/// Default report directory.
pub const DEFAULT_OUTPUT_DIR: &str = "./reports";

/// Where monitoring data comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DataSource {
    /// Live Zabbix JSON-RPC API.
    #[default]
    Api,
    /// Snapshot files written by an earlier `collect` run.
    Snapshot,
}

impl DataSource {
    /// Name as used in `DATA_SOURCE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Snapshot => "snapshot",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(ConfigError::InvalidValue {
                var: "DATA_SOURCE".into(),
                reason: format!("'{s}' is not one of: api, snapshot"),
            }),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::InvalidValue {
                var: "LOG_FORMAT".into(),
                reason: format!("'{s}' is not one of: text, json"),
            }),
        }
    }
}

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
/// Password and token use [`SecretString`] to prevent accidental logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Live API or snapshot replay.
    pub data_source: DataSource,
    /// Zabbix server URL.
    pub zabbix_url: String,
    /// Login user name.
    pub zabbix_user: Option<String>,
    /// Login password.
    pub zabbix_password: Option<SecretString>,
    /// API token. Replaces login when set.
    pub zabbix_api_token: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
    /// Maximum retry attempts.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub retry_delay_ms: u64,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Template rule file.
    pub template_mapping: PathBuf,
    /// Snapshot directory read in snapshot mode.
    pub input_dir: PathBuf,
    /// Report directory.
    pub output_dir: PathBuf,
    /// Host group names; empty means all enabled hosts.
    pub host_groups: Vec<String>,
    /// Tag name marking connectivity items.
    pub connection_tag: String,
    /// Recent samples scored per tagged item.
    pub history_limit: usize,
    /// Tag-mode threshold percentage.
    pub threshold_percentage: f64,
    /// Sample value that counts as a success.
    pub expected_value: ExpectedValue,
    /// Host ids per `item.get` request.
    pub api_batch_size: usize,
    /// Item ids per `history.get` request.
    pub history_batch_size: usize,
    /// History window in seconds.
    pub history_window_secs: i64,
    /// Threshold overrides applied over the rule file.
    pub threshold_overrides: ThresholdOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source: DataSource::Api,
            zabbix_url: DEFAULT_URL.into(),
            zabbix_user: None,
            zabbix_password: None,
            zabbix_api_token: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            verify_ssl: true,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            log_level: DEFAULT_LOG_LEVEL.into(),
            log_format: LogFormat::Text,
            template_mapping: DEFAULT_TEMPLATE_MAPPING.into(),
            input_dir: DEFAULT_INPUT_DIR.into(),
            output_dir: DEFAULT_OUTPUT_DIR.into(),
            host_groups: Vec::new(),
            connection_tag: DEFAULT_CONNECTION_TAG.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            threshold_percentage: DEFAULT_THRESHOLD_PERCENTAGE,
            expected_value: ExpectedValue::default(),
            api_batch_size: DEFAULT_API_BATCH_SIZE,
            history_batch_size: DEFAULT_HISTORY_BATCH_SIZE,
            history_window_secs: DEFAULT_HISTORY_WINDOW_SECS,
            threshold_overrides: ThresholdOverrides::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    /// Every variable is optional:
    /// - `DATA_SOURCE`: `api` or `snapshot` (default: `api`)
    /// - `ZABBIX_URL`: server URL (default: `http://localhost/zabbix`)
    /// - `ZABBIX_USER` / `ZABBIX_PASSWORD`: login credentials
    /// - `ZABBIX_API_TOKEN`: API token, replaces login
    /// - `ZABBIX_TIMEOUT_MS`: request timeout (default: `30000`)
    /// - `ZABBIX_VERIFY_SSL`: certificate verification (default: `true`)
    /// - `MAX_RETRIES` (default: `3`), `RETRY_DELAY_MS` (default: `1000`)
    /// - `LOG_LEVEL` (default: `info`), `LOG_FORMAT`: `text` or `json`
    /// - `TEMPLATE_MAPPING`, `INPUT_DIR`, `OUTPUT_DIR`: file locations
    /// - `HOST_GROUPS`: comma separated group names
    /// - `CONNECTION_TAG` (default: `connection status`)
    /// - `HISTORY_LIMIT` (default: `10`), `HISTORY_WINDOW_SECS` (default: `86400`)
    /// - `THRESHOLD_PERCENTAGE` (default: `70`), `EXPECTED_VALUE` (default: `1`)
    /// - `API_BATCH_SIZE` (default: `100`), `HISTORY_BATCH_SIZE` (default: `50`)
    /// - `MAX_DATA_AGE`, `INACTIVE_THRESHOLD`, `MASTER_ITEM_THRESHOLD`,
    ///   `MIN_CONNECTIVITY_SCORE`: threshold overrides
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value does not parse or fails
    /// validation (see [`validate_config`]).
    #[must_use = "configuration should be used"]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let data_source = env_opt("DATA_SOURCE")
            .map(|v| v.parse::<DataSource>())
            .transpose()?
            .unwrap_or_default();
        let log_format = env_opt("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        let threshold_overrides = ThresholdOverrides {
            max_data_age: parse_env_opt("MAX_DATA_AGE")?,
            inactive_threshold: parse_env_opt("INACTIVE_THRESHOLD")?,
            master_item_threshold: parse_env_opt("MASTER_ITEM_THRESHOLD")?,
            min_connectivity_score: parse_env_opt("MIN_CONNECTIVITY_SCORE")?,
        };

        let config = Self {
            data_source,
            zabbix_url: env_opt("ZABBIX_URL").unwrap_or_else(|| DEFAULT_URL.into()),
            zabbix_user: env_opt("ZABBIX_USER"),
            zabbix_password: env_opt("ZABBIX_PASSWORD").map(SecretString::new),
            zabbix_api_token: env_opt("ZABBIX_API_TOKEN").map(SecretString::new),
            timeout_ms: parse_env_u64("ZABBIX_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            verify_ssl: parse_env_bool("ZABBIX_VERIFY_SSL", true)?,
            max_retries: parse_env_u32("MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_delay_ms: parse_env_u64("RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?,
            log_level: env_opt("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.into()),
            log_format,
            template_mapping: env_opt("TEMPLATE_MAPPING")
                .unwrap_or_else(|| DEFAULT_TEMPLATE_MAPPING.into())
                .into(),
            input_dir: env_opt("INPUT_DIR")
                .unwrap_or_else(|| DEFAULT_INPUT_DIR.into())
                .into(),
            output_dir: env_opt("OUTPUT_DIR")
                .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into())
                .into(),
            host_groups: env_opt("HOST_GROUPS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            connection_tag: env_opt("CONNECTION_TAG")
                .unwrap_or_else(|| DEFAULT_CONNECTION_TAG.into()),
            history_limit: parse_env_usize("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            threshold_percentage: parse_env_opt("THRESHOLD_PERCENTAGE")?
                .unwrap_or(DEFAULT_THRESHOLD_PERCENTAGE),
            expected_value: env_opt("EXPECTED_VALUE")
                .map(|v| ExpectedValue::parse(&v))
                .unwrap_or_default(),
            api_batch_size: parse_env_usize("API_BATCH_SIZE", DEFAULT_API_BATCH_SIZE)?,
            history_batch_size: parse_env_usize("HISTORY_BATCH_SIZE", DEFAULT_HISTORY_BATCH_SIZE)?,
            history_window_secs: parse_env_opt("HISTORY_WINDOW_SECS")?
                .unwrap_or(DEFAULT_HISTORY_WINDOW_SECS),
            threshold_overrides,
        };

        validate_config(&config)?;
        Ok(config)
    }

    /// Credentials for the live API. A token wins over a login.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequired`] when neither a token nor a
    /// complete user/password pair is configured.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        if let Some(token) = &self.zabbix_api_token {
            return Ok(Credentials::Token(token.clone()));
        }
        match (&self.zabbix_user, &self.zabbix_password) {
            (Some(user), Some(password)) => Ok(Credentials::login(user, password.clone())),
            (None, _) => Err(ConfigError::MissingRequired {
                var: "ZABBIX_USER".into(),
            }),
            (Some(_), None) => Err(ConfigError::MissingRequired {
                var: "ZABBIX_PASSWORD".into(),
            }),
        }
    }

    /// Client settings for [`ZabbixClient`](crate::zabbix::ZabbixClient).
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_url(&self.zabbix_url)
            .with_timeout_ms(self.timeout_ms)
            .with_max_retries(self.max_retries)
            .with_retry_delay_ms(self.retry_delay_ms)
            .with_verify_ssl(self.verify_ssl)
            .with_api_batch_size(self.api_batch_size)
            .with_history_batch_size(self.history_batch_size)
    }

    /// Run settings for [`Pipeline`](crate::pipeline::Pipeline).
    #[must_use]
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            host_filter: HostFilter::groups(self.host_groups.iter().cloned()),
            connection_tag: self.connection_tag.clone(),
            history_limit: self.history_limit,
            history_window_secs: self.history_window_secs,
            threshold_percentage: self.threshold_percentage,
            expected_value: self.expected_value.clone(),
        }
    }
}

/// Read a variable, treating an empty value as unset.
fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Split a comma separated list, dropping blanks.
fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Parse an optional environment variable.
fn parse_env_opt<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    env_opt(name)
        .map(|val| {
            val.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: name.into(),
                reason: format!("'{val}' is not a valid number"),
            })
        })
        .transpose()
}

/// Parse an environment variable as u64, using a default if not set.
fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    env_opt(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as u32, using a default if not set.
fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    env_opt(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as usize, using a default if not set.
fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    env_opt(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a positive integer".into(),
        })
    })
}

/// Parse an environment variable as a boolean, using a default if not set.
fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    env_opt(name).map_or(Ok(default), |val| {
        match val.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var: name.into(),
                reason: "must be true or false".into(),
            }),
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "DATA_SOURCE",
        "ZABBIX_URL",
        "ZABBIX_USER",
        "ZABBIX_PASSWORD",
        "ZABBIX_API_TOKEN",
        "ZABBIX_TIMEOUT_MS",
        "ZABBIX_VERIFY_SSL",
        "MAX_RETRIES",
        "RETRY_DELAY_MS",
        "LOG_LEVEL",
        "LOG_FORMAT",
        "TEMPLATE_MAPPING",
        "INPUT_DIR",
        "OUTPUT_DIR",
        "HOST_GROUPS",
        "CONNECTION_TAG",
        "HISTORY_LIMIT",
        "THRESHOLD_PERCENTAGE",
        "EXPECTED_VALUE",
        "API_BATCH_SIZE",
        "HISTORY_BATCH_SIZE",
        "HISTORY_WINDOW_SECS",
        "MAX_DATA_AGE",
        "INACTIVE_THRESHOLD",
        "MASTER_ITEM_THRESHOLD",
        "MIN_CONNECTIVITY_SCORE",
    ];

    /// Helper to set up a clean test environment.
    fn setup_test_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "snapshot");

        let config = Config::from_env().expect("should load config");

        assert_eq!(config.data_source, DataSource::Snapshot);
        assert_eq!(config.zabbix_url, DEFAULT_URL);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.verify_ssl);
        assert_eq!(config.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.input_dir, PathBuf::from(DEFAULT_INPUT_DIR));
        assert_eq!(config.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
        assert!(config.host_groups.is_empty());
        assert_eq!(config.connection_tag, "connection status");
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.threshold_percentage, 70.0);
        assert_eq!(config.expected_value, ExpectedValue::Int(1));
        assert_eq!(config.history_window_secs, 86_400);
        assert!(config.threshold_overrides.is_empty());
    }

    #[test]
    #[serial]
    fn test_config_from_env_with_all_vars() {
        setup_test_env();
        env::set_var("ZABBIX_URL", "https://zbx.example.com/zabbix");
        env::set_var("ZABBIX_USER", "Admin");
        env::set_var("ZABBIX_PASSWORD", "secret");
        env::set_var("ZABBIX_TIMEOUT_MS", "60000");
        env::set_var("ZABBIX_VERIFY_SSL", "false");
        env::set_var("MAX_RETRIES", "5");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("HOST_GROUPS", "Linux servers, ,Routers");
        env::set_var("CONNECTION_TAG", "reachability");
        env::set_var("HISTORY_LIMIT", "20");
        env::set_var("THRESHOLD_PERCENTAGE", "85.5");
        env::set_var("EXPECTED_VALUE", "up");
        env::set_var("API_BATCH_SIZE", "25");
        env::set_var("HISTORY_WINDOW_SECS", "3600");
        env::set_var("INACTIVE_THRESHOLD", "600");
        env::set_var("MIN_CONNECTIVITY_SCORE", "0.9");

        let config = Config::from_env().expect("should load config");

        assert_eq!(config.data_source, DataSource::Api);
        assert_eq!(config.timeout_ms, 60_000);
        assert!(!config.verify_ssl);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.host_groups, vec!["Linux servers", "Routers"]);
        assert_eq!(config.connection_tag, "reachability");
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.threshold_percentage, 85.5);
        assert_eq!(config.expected_value, ExpectedValue::Text("up".into()));
        assert_eq!(config.api_batch_size, 25);
        assert_eq!(config.history_window_secs, 3600);
        assert_eq!(config.threshold_overrides.inactive_threshold, Some(600));
        assert_eq!(config.threshold_overrides.min_connectivity_score, Some(0.9));
        assert_eq!(config.threshold_overrides.max_data_age, None);

        let client = config.client_config();
        assert_eq!(client.url, "https://zbx.example.com/zabbix/api_jsonrpc.php");
        assert_eq!(client.api_batch_size, 25);
        assert!(!client.verify_ssl);
    }

    #[test]
    #[serial]
    fn test_config_api_requires_credentials() {
        setup_test_env();

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingRequired { var } if var == "ZABBIX_USER"
        ));
    }

    #[test]
    #[serial]
    fn test_config_token_is_enough() {
        setup_test_env();
        env::set_var("ZABBIX_API_TOKEN", "tok-123");

        let config = Config::from_env().expect("should load config");
        assert_eq!(
            config.credentials().unwrap(),
            Credentials::token("tok-123")
        );
    }

    #[test]
    #[serial]
    fn test_config_empty_values_are_unset() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "snapshot");
        env::set_var("ZABBIX_API_TOKEN", "");
        env::set_var("HISTORY_LIMIT", "");

        let config = Config::from_env().expect("should load config");
        assert!(config.zabbix_api_token.is_none());
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeout_format() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "snapshot");
        env::set_var("ZABBIX_TIMEOUT_MS", "not-a-number");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var, .. } if var == "ZABBIX_TIMEOUT_MS"
        ));
    }

    #[test]
    #[serial]
    fn test_config_invalid_data_source() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "database");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var, .. } if var == "DATA_SOURCE"
        ));
    }

    #[test]
    #[serial]
    fn test_config_invalid_bool() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "snapshot");
        env::set_var("ZABBIX_VERIFY_SSL", "maybe");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var, .. } if var == "ZABBIX_VERIFY_SSL"
        ));
    }

    #[test]
    #[serial]
    fn test_config_threshold_out_of_range() {
        setup_test_env();
        env::set_var("DATA_SOURCE", "snapshot");
        env::set_var("THRESHOLD_PERCENTAGE", "120");

        let err = Config::from_env().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var, .. } if var == "THRESHOLD_PERCENTAGE"
        ));
    }

    #[test]
    fn test_credentials_prefer_token() {
        let config = Config {
            zabbix_user: Some("Admin".into()),
            zabbix_password: Some(SecretString::new("pw")),
            zabbix_api_token: Some(SecretString::new("tok")),
            ..Config::default()
        };
        assert_eq!(config.credentials().unwrap(), Credentials::token("tok"));
    }

    #[test]
    fn test_credentials_missing_password() {
        let config = Config {
            zabbix_user: Some("Admin".into()),
            ..Config::default()
        };
        assert!(matches!(
            config.credentials(),
            Err(ConfigError::MissingRequired { var }) if var == "ZABBIX_PASSWORD"
        ));
    }

    #[test]
    fn test_pipeline_settings() {
        let config = Config {
            host_groups: vec!["Routers".into()],
            history_limit: 5,
            expected_value: ExpectedValue::Float(1.5),
            ..Config::default()
        };
        let settings = config.pipeline_settings();
        assert_eq!(settings.host_filter, HostFilter::groups(["Routers"]));
        assert_eq!(settings.history_limit, 5);
        assert_eq!(settings.expected_value, ExpectedValue::Float(1.5));
    }

    #[test]
    fn test_config_debug_redacts_secrets() {
        let config = Config {
            zabbix_password: Some(SecretString::new("super-secret-pw")),
            zabbix_api_token: Some(SecretString::new("super-secret-token")),
            ..Config::default()
        };

        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret-pw"));
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("<REDACTED>"));
        assert!(debug.contains("localhost/zabbix"));
    }

    #[test]
    fn test_data_source_display_and_parse() {
        assert_eq!(DataSource::Snapshot.to_string(), "snapshot");
        assert_eq!(" API ".parse::<DataSource>().unwrap(), DataSource::Api);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_list(" , ").is_empty());
    }

    #[test]
    fn test_parse_env_u64_with_value() {
        env::set_var("TEST_ZBX_U64", "12345");
        assert_eq!(parse_env_u64("TEST_ZBX_U64", 0).unwrap(), 12345);
        env::remove_var("TEST_ZBX_U64");
    }

    #[test]
    fn test_parse_env_u64_default() {
        env::remove_var("TEST_ZBX_U64_MISSING");
        assert_eq!(parse_env_u64("TEST_ZBX_U64_MISSING", 999).unwrap(), 999);
    }

    #[test]
    fn test_parse_env_u32_invalid() {
        env::set_var("TEST_ZBX_U32_INVALID", "-4");
        assert!(parse_env_u32("TEST_ZBX_U32_INVALID", 0).is_err());
        env::remove_var("TEST_ZBX_U32_INVALID");
    }

    #[test]
    fn test_parse_env_opt_float() {
        env::set_var("TEST_ZBX_F64", "0.75");
        assert_eq!(parse_env_opt::<f64>("TEST_ZBX_F64").unwrap(), Some(0.75));
        env::remove_var("TEST_ZBX_F64");
        assert_eq!(parse_env_opt::<f64>("TEST_ZBX_F64").unwrap(), None);
    }
}
