//! Error types for the Zabbix monitoring integration.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level application errors
//! - [`ZabbixError`]: Zabbix JSON-RPC API errors
//! - [`ConfigError`]: Configuration and template rule errors
//! - [`ReportError`]: Output and snapshot persistence errors
//!
//! Matching misses and data-quality gaps are not errors: classifiers skip
//! them and scorers downgrade them to issues.
//!
//! All errors implement `Send + Sync` for async compatibility.

use thiserror::Error;

/// Top-level application error.
///
/// This is the main error type returned by the run modes.
/// It wraps all subsystem errors for unified error handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Zabbix API error.
    #[error("Zabbix API error: {0}")]
    Zabbix(#[from] ZabbixError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Report persistence error.
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Zabbix API errors.
///
/// These errors represent failures when communicating with the Zabbix
/// JSON-RPC endpoint or when its records fail boundary validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ZabbixError {
    /// Login was rejected or no session could be established.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the failure.
        message: String,
    },

    /// The API answered with a JSON-RPC error payload.
    #[error("API error: {message} (Code: {code}){}", data.as_deref().map(|d| format!(" - {d}")).unwrap_or_default())]
    Api {
        /// JSON-RPC error code.
        code: i64,
        /// Error message.
        message: String,
        /// Additional error detail, if the server sent any.
        data: Option<String>,
    },

    /// Non-success HTTP status.
    #[error("HTTP status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body (may be truncated).
        body: String,
    },

    /// Request was rate limited.
    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_seconds: u64,
    },

    /// Request timed out.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Network communication error.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// Response could not be decoded.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what was unexpected.
        message: String,
    },

    /// A record is missing a field the analysis depends on.
    #[error("Invalid {entity} record: {reason}")]
    InvalidRecord {
        /// Entity kind (host, item, history, template).
        entity: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ZabbixError {
    /// Returns true if this error is retryable.
    ///
    /// Transport failures, timeouts, rate limiting and 5xx responses are
    /// retryable. API error payloads and authentication failures are not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
/// They are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },

    /// The template rule file could not be read.
    #[error("Template mapping file not readable: {path} - {message}")]
    RulesUnreadable {
        /// Path of the rule file.
        path: String,
        /// Underlying I/O error.
        message: String,
    },

    /// The template rule file is malformed.
    #[error("Template mapping file invalid: {path} - {message}")]
    RulesInvalid {
        /// Path of the rule file.
        path: String,
        /// What is malformed.
        message: String,
    },
}

/// Report persistence errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// The path involved.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A structure could not be (de)serialized.
    #[error("Serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },

    /// An input file expected by an offline run is absent.
    #[error("Input file not found: {path}")]
    MissingInput {
        /// The missing path.
        path: String,
    },
}
