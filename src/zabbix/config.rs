//! Zabbix client configuration.

#![allow(clippy::missing_const_for_fn)]

use crate::config::SecretString;

/// JSON-RPC endpoint path appended to the server URL.
pub const API_PATH: &str = "api_jsonrpc.php";
/// Default server URL.
pub const DEFAULT_URL: &str = "http://localhost/zabbix";
/// Default timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default maximum retries.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default retry delay in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
/// Default number of host ids per `item.get` request.
pub const DEFAULT_API_BATCH_SIZE: usize = 100;
/// Default number of item ids per `history.get` request.
pub const DEFAULT_HISTORY_BATCH_SIZE: usize = 50;

/// Normalize a server URL to its JSON-RPC endpoint.
///
/// ```
/// use zabbix_monitoring::zabbix::endpoint_url;
///
/// assert_eq!(
///     endpoint_url("https://zbx.example.com/zabbix/"),
///     "https://zbx.example.com/zabbix/api_jsonrpc.php"
/// );
/// assert_eq!(
///     endpoint_url("https://zbx.example.com/api_jsonrpc.php"),
///     "https://zbx.example.com/api_jsonrpc.php"
/// );
/// ```
#[must_use]
pub fn endpoint_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with(API_PATH) {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{API_PATH}")
    }
}

/// Client configuration for the Zabbix API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// JSON-RPC endpoint URL.
    pub url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub retry_delay_ms: u64,
    /// Whether TLS certificates are verified.
    pub verify_ssl: bool,
    /// Host ids per `item.get` batch.
    pub api_batch_size: usize,
    /// Item ids per `history.get` batch.
    pub history_batch_size: usize,
}

impl ClientConfig {
    /// Create a new client configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server URL. The endpoint path is appended when missing.
    #[must_use]
    pub fn with_url(mut self, url: impl AsRef<str>) -> Self {
        self.url = endpoint_url(url.as_ref());
        self
    }

    /// Set timeout in milliseconds.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set maximum retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set retry delay in milliseconds.
    #[must_use]
    pub const fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    /// Enable or disable certificate verification.
    #[must_use]
    pub const fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    /// Set the `item.get` batch size. Zero is raised to one.
    #[must_use]
    pub fn with_api_batch_size(mut self, size: usize) -> Self {
        self.api_batch_size = size.max(1);
        self
    }

    /// Set the `history.get` batch size. Zero is raised to one.
    #[must_use]
    pub fn with_history_batch_size(mut self, size: usize) -> Self {
        self.history_batch_size = size.max(1);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: endpoint_url(DEFAULT_URL),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            verify_ssl: true,
            api_batch_size: DEFAULT_API_BATCH_SIZE,
            history_batch_size: DEFAULT_HISTORY_BATCH_SIZE,
        }
    }
}

/// How the client authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `user.login` with username and password.
    Login {
        /// Username.
        username: String,
        /// Password.
        password: SecretString,
    },
    /// Pre-issued API token, sent as a bearer token.
    Token(SecretString),
}

impl Credentials {
    /// Username/password credentials.
    #[must_use]
    pub fn login(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self::Login {
            username: username.into(),
            password: password.into(),
        }
    }

    /// API token credentials.
    #[must_use]
    pub fn token(token: impl Into<SecretString>) -> Self {
        Self::Token(token.into())
    }
}
