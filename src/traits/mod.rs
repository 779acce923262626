//! Trait definitions for mockable dependencies.
//!
//! This module defines traits for:
//! - [`MonitoringSource`]: where hosts, items and history come from
//! - [`TimeProvider`]: Time abstraction for testing
//!
//! It also re-exports the request types from the `types` submodule.
//!
//! # Mocking
//!
//! All traits are annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates mock implementations automatically for testing.
//!
//! # Example
//!
//! ```
//! use zabbix_monitoring::traits::{TimeProvider, RealTimeProvider};
//!
//! let time_provider = RealTimeProvider;
//! let now = time_provider.now();
//! println!("Current time: {now}");
//! ```

mod types;

use std::sync::Arc;

pub use types::{BatchFailurePolicy, HistoryRequest, HistoryTarget, HostFilter};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ZabbixError;
use crate::model::{HistoryMap, Host, Template, TelemetryItem};

/// Source of monitoring data.
///
/// Implemented by the live JSON-RPC client and by the offline snapshot
/// reader, so every run mode works against either.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitoringSource: Send + Sync {
    /// Enabled hosts with their linked templates.
    ///
    /// # Errors
    ///
    /// Returns [`ZabbixError`] if the hosts cannot be retrieved.
    async fn hosts(&self, filter: &HostFilter) -> Result<Vec<Host>, ZabbixError>;

    /// All templates.
    ///
    /// # Errors
    ///
    /// Returns [`ZabbixError`] if the templates cannot be retrieved.
    async fn templates(&self) -> Result<Vec<Template>, ZabbixError>;

    /// Items of the given hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ZabbixError`] if any batch fails.
    async fn host_items(&self, hostids: &[String]) -> Result<Vec<TelemetryItem>, ZabbixError>;

    /// Monitored items of the given hosts carrying a tag named `tag`, with
    /// their tags and owning host embedded.
    ///
    /// # Errors
    ///
    /// Returns [`ZabbixError`] if the items cannot be retrieved.
    async fn items_by_tag(
        &self,
        tag: &str,
        hostids: &[String],
    ) -> Result<Vec<TelemetryItem>, ZabbixError>;

    /// Recent history for the requested items, keyed by item id.
    ///
    /// # Errors
    ///
    /// Returns [`ZabbixError`] if a batch fails under
    /// [`BatchFailurePolicy::Abort`].
    async fn history(&self, request: &HistoryRequest) -> Result<HistoryMap, ZabbixError>;
}

/// Time provider trait for deterministic testing.
///
/// This trait abstracts time operations to allow for
/// deterministic testing by providing fixed timestamps.
#[cfg_attr(test, mockall::automock)]
pub trait TimeProvider: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Real time provider using system clock.
///
/// This is the production implementation that returns the actual current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: TimeProvider + ?Sized> TimeProvider for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
