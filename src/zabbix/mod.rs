//! Zabbix JSON-RPC API client.
//!
//! This module provides the live [`MonitoringSource`](crate::traits::MonitoringSource):
//! - [`ZabbixClient`]: authenticated client with retries and batching
//! - [`ClientConfig`]: endpoint, timeout, retry and batch settings
//! - [`Credentials`]: login or API token
//! - Wire types validated into [`crate::model`] records at the boundary

mod client;
mod config;
mod types;

pub use client::ZabbixClient;
pub use config::{
    endpoint_url, ClientConfig, Credentials, API_PATH, DEFAULT_API_BATCH_SIZE,
    DEFAULT_HISTORY_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
    DEFAULT_URL,
};
pub use types::{
    decode_records, RawHistory, RawHost, RawItem, RawTag, RawTemplate, RawTemplateLink,
    RpcError, RpcRequest, RpcResponse,
};
