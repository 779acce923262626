//! Zabbix JSON-RPC client with retry logic.
//!
//! This module provides:
//! - Session login (`user.login`) or API token authentication
//! - Retry logic with exponential backoff
//! - Batched `item.get` and `history.get` collection
//! - The live [`MonitoringSource`] implementation

#![allow(clippy::missing_errors_doc)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::config::{ClientConfig, Credentials};
use super::types::{
    decode_records, RawHistory, RawHost, RawHostGroup, RawItem, RawTemplate, RpcRequest,
    RpcResponse,
};
use crate::config::SecretString;
use crate::error::ZabbixError;
use crate::model::{group_history, HistoryMap, HistoryRecord, Host, Template, TelemetryItem};
use crate::traits::{BatchFailurePolicy, HistoryRequest, HostFilter, MonitoringSource};

/// Item fields requested by every `item.get`.
const ITEM_OUTPUT: [&str; 9] = [
    "itemid",
    "hostid",
    "templateid",
    "key_",
    "name",
    "value_type",
    "status",
    "lastvalue",
    "lastclock",
];

/// Tag filter operator "contains"; with no value it matches any value.
const TAG_OPERATOR_LIKE: u8 = 0;

/// Zabbix JSON-RPC client.
#[derive(Debug)]
pub struct ZabbixClient {
    client: Client,
    config: ClientConfig,
    credentials: Credentials,
    auth: Option<SecretString>,
    next_id: AtomicU64,
}

impl ZabbixClient {
    /// Create a client. API token credentials are usable immediately;
    /// login credentials need [`authenticate`](Self::authenticate).
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self, ZabbixError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| ZabbixError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        let auth = match &credentials {
            Credentials::Token(token) => Some(token.clone()),
            Credentials::Login { .. } => None,
        };

        Ok(Self {
            client,
            config,
            credentials,
            auth,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create and authenticate a client.
    pub async fn connect(
        config: ClientConfig,
        credentials: Credentials,
    ) -> Result<Self, ZabbixError> {
        let mut client = Self::new(config, credentials)?;
        client.authenticate().await?;
        Ok(client)
    }

    /// Log in with username and password. A no-op for token credentials.
    pub async fn authenticate(&mut self) -> Result<(), ZabbixError> {
        let Credentials::Login { username, password } = &self.credentials else {
            tracing::info!("Using Zabbix API token");
            return Ok(());
        };

        let params = json!({
            "username": username,
            "password": password.expose(),
        });
        let result = self
            .execute_with_retry("user.login", &params)
            .await
            .map_err(|e| match e {
                ZabbixError::Api { message, data, .. } => ZabbixError::AuthenticationFailed {
                    message: data.unwrap_or(message),
                },
                other => other,
            })?;

        let token = result
            .as_str()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ZabbixError::AuthenticationFailed {
                message: "user.login returned no session token".into(),
            })?;
        self.auth = Some(SecretString::new(token));
        tracing::info!(username = %username, "Authenticated with Zabbix API");
        Ok(())
    }

    /// Whether requests will carry credentials.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_some()
    }

    /// Get the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.config.url
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Call an API method and return its `result`.
    pub async fn api_request(&self, method: &str, params: &Value) -> Result<Value, ZabbixError> {
        self.execute_with_retry(method, params).await
    }

    /// Resolve host group names to ids.
    async fn group_ids(&self, names: &[String]) -> Result<Vec<String>, ZabbixError> {
        let params = json!({
            "output": ["groupid"],
            "filter": {"name": names},
        });
        let result = self.api_request("hostgroup.get", &params).await?;
        let groups: Vec<RawHostGroup> =
            serde_json::from_value(result).map_err(|e| ZabbixError::UnexpectedResponse {
                message: format!("Failed to decode host groups: {e}"),
            })?;
        Ok(groups.into_iter().map(|g| g.groupid).collect())
    }

    /// Run `item.get` over `hostids` in batches, failing on the first error.
    async fn items_in_batches(
        &self,
        hostids: &[String],
        base: &Value,
    ) -> Result<Vec<TelemetryItem>, ZabbixError> {
        let mut items = Vec::new();
        for (batch, chunk) in hostids.chunks(self.config.api_batch_size).enumerate() {
            let mut params = base.clone();
            params["hostids"] = json!(chunk);
            let result = self.api_request("item.get", &params).await.inspect_err(|e| {
                tracing::error!(batch = batch + 1, error = %e, "Item batch failed");
            })?;
            let batch_items: Vec<TelemetryItem> = decode_records::<RawItem, _>(result)?;
            tracing::debug!(
                batch = batch + 1,
                item_count = batch_items.len(),
                "Collected item batch"
            );
            items.extend(batch_items);
        }
        Ok(items)
    }

    /// One `history.get` call for items sharing a value type.
    async fn fetch_history(
        &self,
        value_type: u8,
        itemids: &[&str],
        request: &HistoryRequest,
        limit: usize,
    ) -> Result<Vec<HistoryRecord>, ZabbixError> {
        let params = json!({
            "output": "extend",
            "history": value_type,
            "itemids": itemids,
            "sortfield": "clock",
            "sortorder": "DESC",
            "time_from": request.time_from,
            "time_till": request.time_till,
            "limit": limit,
        });
        let result = self.api_request("history.get", &params).await?;
        decode_records::<RawHistory, HistoryRecord>(result)
    }

    /// Newest `limit_per_item` samples for each item of one batch.
    ///
    /// `limit` caps the whole result set, not each item, so busy items can
    /// crowd out slow ones. When the batch fills its limit, items that came
    /// back short are fetched on their own.
    async fn history_batch(
        &self,
        value_type: u8,
        chunk: &[&str],
        request: &HistoryRequest,
    ) -> Result<HistoryMap, ZabbixError> {
        let per_item = request.limit_per_item;
        let limit = per_item * chunk.len();
        let records = self.fetch_history(value_type, chunk, request, limit).await?;
        let saturated = records.len() >= limit;
        let mut grouped = group_history(records);

        if saturated {
            for &itemid in chunk {
                let have = grouped.get(itemid).map_or(0, Vec::len);
                if have >= per_item {
                    continue;
                }
                tracing::debug!(itemid, value_type, have, "Fetching history for crowded-out item");
                let samples = self
                    .fetch_history(value_type, &[itemid], request, per_item)
                    .await?;
                if !samples.is_empty() {
                    grouped.insert(itemid.to_string(), samples);
                }
            }
        }

        for samples in grouped.values_mut() {
            samples.sort_by(|a, b| b.clock.cmp(&a.clock));
            samples.truncate(per_item);
        }
        Ok(grouped)
    }

    /// Execute request with retry logic.
    async fn execute_with_retry(&self, method: &str, params: &Value) -> Result<Value, ZabbixError> {
        let mut last_error = None;
        let mut delay = self.config.retry_delay_ms;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(attempt, delay_ms = delay, method, "Retrying Zabbix request");
                tokio::time::sleep(Duration::from_millis(delay)).await;
                delay *= 2; // Exponential backoff
            }

            match self.execute_once(method, params).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }
                    tracing::warn!(error = %e, attempt, method, "Retryable error occurred");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ZabbixError::Network {
            message: "Unknown error after retries".to_string(),
        }))
    }

    /// Execute a single request attempt.
    async fn execute_once(&self, method: &str, params: &Value) -> Result<Value, ZabbixError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let start = Instant::now();
        let elapsed_ms = |start: Instant| u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(
            url = %self.config.url,
            method,
            id,
            timeout_ms = self.config.timeout_ms,
            "Starting Zabbix API request"
        );

        let mut builder = self
            .client
            .post(&self.config.url)
            .header("content-type", "application/json-rpc")
            .json(&RpcRequest::new(method, params, id));
        if method != "user.login" {
            if let Some(token) = &self.auth {
                builder = builder.bearer_auth(token.expose());
            }
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                tracing::error!(
                    method,
                    elapsed_ms = elapsed_ms(start),
                    timeout_ms = self.config.timeout_ms,
                    "Zabbix API request timed out"
                );
                ZabbixError::Timeout {
                    timeout_ms: self.config.timeout_ms,
                }
            } else {
                tracing::error!(
                    method,
                    elapsed_ms = elapsed_ms(start),
                    error = %e,
                    "Zabbix API request failed"
                );
                ZabbixError::Network {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        tracing::debug!(
            method,
            status = %status,
            elapsed_ms = elapsed_ms(start),
            "Zabbix API response received"
        );

        if status.as_u16() == 401 {
            return Err(ZabbixError::AuthenticationFailed {
                message: format!("HTTP 401 for {method}"),
            });
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(60);
            return Err(ZabbixError::RateLimited {
                retry_after_seconds: retry_after,
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ZabbixError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body: RpcResponse =
            response
                .json()
                .await
                .map_err(|e| ZabbixError::UnexpectedResponse {
                    message: format!("Failed to parse response: {e}"),
                })?;

        if let Some(error) = body.error {
            tracing::error!(
                method,
                code = error.code,
                message = %error.message,
                data = ?error.data,
                "Zabbix API returned an error"
            );
            return Err(error.into());
        }

        body.result.ok_or_else(|| ZabbixError::UnexpectedResponse {
            message: format!("{method} response has neither result nor error"),
        })
    }
}

#[async_trait]
impl MonitoringSource for ZabbixClient {
    async fn hosts(&self, filter: &HostFilter) -> Result<Vec<Host>, ZabbixError> {
        tracing::info!("Collecting hosts from Zabbix API");
        let mut params = json!({
            "output": ["hostid", "host", "name", "status"],
            "selectParentTemplates": ["templateid", "name"],
            "filter": {"status": "0"},
        });

        if !filter.host_groups.is_empty() {
            match self.group_ids(&filter.host_groups).await {
                Ok(ids) if !ids.is_empty() => params["groupids"] = json!(ids),
                Ok(_) => {
                    tracing::warn!(
                        groups = ?filter.host_groups,
                        "No host groups matched, collecting all hosts"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        groups = ?filter.host_groups,
                        error = %e,
                        "Failed to resolve host groups, collecting all hosts"
                    );
                }
            }
        }

        let result = self.api_request("host.get", &params).await?;
        let hosts: Vec<Host> = decode_records::<RawHost, _>(result)?;
        tracing::info!(host_count = hosts.len(), "Collected hosts");
        Ok(hosts)
    }

    async fn templates(&self) -> Result<Vec<Template>, ZabbixError> {
        tracing::info!("Collecting templates from Zabbix API");
        let params = json!({"output": ["templateid", "host", "name"]});
        let result = self.api_request("template.get", &params).await?;
        let templates: Vec<Template> = decode_records::<RawTemplate, _>(result)?;
        tracing::info!(template_count = templates.len(), "Collected templates");
        Ok(templates)
    }

    async fn host_items(&self, hostids: &[String]) -> Result<Vec<TelemetryItem>, ZabbixError> {
        tracing::info!(host_count = hostids.len(), "Collecting host items");
        let base = json!({
            "output": ITEM_OUTPUT,
            "selectTags": "extend",
        });
        let items = self.items_in_batches(hostids, &base).await?;
        tracing::info!(item_count = items.len(), "Collected host items");
        Ok(items)
    }

    async fn items_by_tag(
        &self,
        tag: &str,
        hostids: &[String],
    ) -> Result<Vec<TelemetryItem>, ZabbixError> {
        tracing::info!(tag, host_count = hostids.len(), "Collecting items by tag");
        let base = json!({
            "output": ITEM_OUTPUT,
            "evaltype": 0,
            "tags": [{"tag": tag, "operator": TAG_OPERATOR_LIKE}],
            "selectHosts": ["hostid", "host", "name"],
            "selectTags": "extend",
            "monitored": true,
        });
        let items = self.items_in_batches(hostids, &base).await?;
        tracing::info!(tag, item_count = items.len(), "Collected tagged items");
        Ok(items)
    }

    async fn history(&self, request: &HistoryRequest) -> Result<HistoryMap, ZabbixError> {
        tracing::info!(
            item_count = request.targets.len(),
            limit_per_item = request.limit_per_item,
            "Collecting history"
        );

        let mut by_type: BTreeMap<u8, Vec<&str>> = BTreeMap::new();
        for target in &request.targets {
            by_type
                .entry(target.value_type.code())
                .or_default()
                .push(target.itemid.as_str());
        }

        let mut history = HistoryMap::new();
        for (value_type, itemids) in by_type {
            for (batch, chunk) in itemids.chunks(self.config.history_batch_size).enumerate() {
                match self.history_batch(value_type, chunk, request).await {
                    Ok(grouped) => {
                        tracing::debug!(
                            value_type,
                            batch = batch + 1,
                            item_count = grouped.len(),
                            "Collected history batch"
                        );
                        history.extend(grouped);
                    }
                    Err(e) => match request.failure_policy {
                        BatchFailurePolicy::Abort => {
                            tracing::error!(
                                value_type,
                                batch = batch + 1,
                                error = %e,
                                "History batch failed"
                            );
                            return Err(e);
                        }
                        BatchFailurePolicy::Skip => {
                            tracing::warn!(
                                value_type,
                                batch = batch + 1,
                                item_count = chunk.len(),
                                error = %e,
                                "History batch failed, continuing without it"
                            );
                        }
                    },
                }
            }
        }

        tracing::info!(item_count = history.len(), "Collected history");
        Ok(history)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unreadable_literal,
    clippy::unused_async
)]
mod tests {
    use super::*;
    use crate::model::ValueType;
    use crate::traits::HistoryTarget;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API: &str = "/api_jsonrpc.php";

    fn test_config(server: &MockServer) -> ClientConfig {
        ClientConfig::default()
            .with_url(server.uri())
            .with_max_retries(0)
            .with_retry_delay_ms(10)
            .with_timeout_ms(5_000)
    }

    // Helper to create a token-authenticated client pointing to the mock server
    async fn create_mock_client(server: &MockServer) -> ZabbixClient {
        ZabbixClient::new(test_config(server), Credentials::token("test-token")).unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "result": result, "id": 1}))
    }

    fn rpc_error(code: i64, message: &str, data: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message, "data": data},
            "id": 1
        }))
    }

    async fn mount_method(server: &MockServer, api_method: &str, response: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": api_method})))
            .respond_with(response)
            .mount(server)
            .await;
    }

    #[test]
    fn test_client_new_with_token_is_authenticated() {
        let client =
            ZabbixClient::new(ClientConfig::default(), Credentials::token("tok")).unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.url(), "http://localhost/zabbix/api_jsonrpc.php");
    }

    #[test]
    fn test_client_new_with_login_needs_authentication() {
        let config = ClientConfig::default().with_timeout_ms(10_000);
        let client = ZabbixClient::new(config, Credentials::login("admin", "secret")).unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(client.config().timeout_ms, 10_000);
    }

    #[test]
    fn test_client_debug_hides_credentials() {
        let client =
            ZabbixClient::new(ClientConfig::default(), Credentials::login("admin", "pw-123"))
                .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("pw-123"));
    }

    #[tokio::test]
    async fn test_connect_logs_in_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "user.login",
                "params": {"username": "admin", "password": "zabbix"}
            })))
            .respond_with(rpc_result(json!("session-abc")))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "template.get"})))
            .and(header("authorization", "Bearer session-abc"))
            .respond_with(rpc_result(json!([{"templateid": "1", "name": "T"}])))
            .expect(1)
            .mount(&server)
            .await;

        let client =
            ZabbixClient::connect(test_config(&server), Credentials::login("admin", "zabbix"))
                .await
                .unwrap();
        assert!(client.is_authenticated());
        let templates = client.templates().await.unwrap();
        assert_eq!(templates, vec![Template::new("1", "T")]);
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let server = MockServer::start().await;
        mount_method(
            &server,
            "user.login",
            rpc_error(-32602, "Invalid params.", "Incorrect user name or password."),
        )
        .await;

        let result =
            ZabbixClient::connect(test_config(&server), Credentials::login("admin", "wrong")).await;
        assert_eq!(
            result.unwrap_err(),
            ZabbixError::AuthenticationFailed {
                message: "Incorrect user name or password.".into()
            }
        );
    }

    #[tokio::test]
    async fn test_token_skips_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "user.login"})))
            .respond_with(rpc_result(json!("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let client = ZabbixClient::connect(test_config(&server), Credentials::token("tok"))
            .await
            .unwrap();
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_hosts_resolves_group_filter() {
        let server = MockServer::start().await;
        mount_method(&server, "hostgroup.get", rpc_result(json!([{"groupid": "5"}]))).await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "host.get",
                "params": {"groupids": ["5"], "filter": {"status": "0"}}
            })))
            .respond_with(rpc_result(json!([{
                "hostid": "10084",
                "host": "web-01",
                "name": "Web 01",
                "parentTemplates": [{"templateid": "10001", "name": "Template Net ICMP Ping"}]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let hosts = client
            .hosts(&HostFilter::groups(["Linux servers"]))
            .await
            .unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0].parent_templates[0].name, "Template Net ICMP Ping");
    }

    #[tokio::test]
    async fn test_hosts_group_lookup_failure_drops_filter() {
        let server = MockServer::start().await;
        mount_method(&server, "hostgroup.get", rpc_error(-32500, "Application error.", "")).await;
        mount_method(
            &server,
            "host.get",
            rpc_result(json!([{"hostid": "1", "host": "a", "name": "A"}])),
        )
        .await;

        let client = create_mock_client(&server).await;
        let hosts = client.hosts(&HostFilter::groups(["Missing"])).await.unwrap();
        assert_eq!(hosts.len(), 1);
    }

    #[tokio::test]
    async fn test_host_items_in_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "item.get", "params": {"hostids": ["1", "2"]}})))
            .respond_with(rpc_result(json!([
                {"itemid": "11", "hostid": "1", "key_": "icmpping", "name": "Ping", "value_type": "3"},
                {"itemid": "21", "hostid": "2", "key_": "icmpping", "name": "Ping", "value_type": "3"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "item.get", "params": {"hostids": ["3"]}})))
            .respond_with(rpc_result(json!([
                {"itemid": "31", "hostid": "3", "key_": "agent.ping", "name": "Agent", "value_type": "3"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = create_mock_client(&server).await;
        client.config = client.config.clone().with_api_batch_size(2);
        let ids: Vec<String> = ["1", "2", "3"].iter().map(ToString::to_string).collect();
        let items = client.host_items(&ids).await.unwrap();
        let item_ids: Vec<&str> = items.iter().map(|i| i.itemid.as_str()).collect();
        assert_eq!(item_ids, vec!["11", "21", "31"]);
    }

    #[tokio::test]
    async fn test_host_items_empty_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        assert!(client.host_items(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_host_items_batch_failure_aborts() {
        let server = MockServer::start().await;
        mount_method(&server, "item.get", rpc_error(-32602, "Invalid params.", "bad")).await;

        let client = create_mock_client(&server).await;
        let result = client.host_items(&["1".to_string()]).await;
        assert!(matches!(result, Err(ZabbixError::Api { code: -32602, .. })));
    }

    #[tokio::test]
    async fn test_items_by_tag_sends_tag_filter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "item.get",
                "params": {
                    "tags": [{"tag": "connection status", "operator": 0}],
                    "monitored": true,
                    "selectHosts": ["hostid", "host", "name"]
                }
            })))
            .respond_with(rpc_result(json!([{
                "itemid": "101",
                "key_": "icmpping",
                "name": "ICMP ping",
                "value_type": "3",
                "tags": [{"tag": "Connection Status", "value": ""}],
                "hosts": [{"hostid": "10", "host": "h1", "name": "Host 1"}]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let items = client
            .items_by_tag("connection status", &["10".to_string()])
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].hostid, "10");
        assert!(items[0].find_tag("connection status").is_some());
    }

    #[tokio::test]
    async fn test_history_grouped_by_value_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {
                    "history": 3,
                    "itemids": ["1", "2"],
                    "limit": 20,
                    "sortfield": "clock",
                    "sortorder": "DESC",
                    "time_from": 1_699_913_600,
                    "time_till": 1_700_000_000
                }
            })))
            .respond_with(rpc_result(json!([
                {"itemid": "1", "clock": "1700000000", "value": "1"},
                {"itemid": "2", "clock": "1699999990", "value": "0"},
                {"itemid": "1", "clock": "1699999900", "value": "1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {"history": 0, "itemids": ["3"], "limit": 10}
            })))
            .respond_with(rpc_result(json!([
                {"itemid": "3", "clock": "1699999999", "value": "0.25"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let request = HistoryRequest::window(
            vec![
                HistoryTarget::new("1", ValueType::Unsigned),
                HistoryTarget::new("3", ValueType::Float),
                HistoryTarget::new("2", ValueType::Unsigned),
            ],
            1_700_000_000,
            86_400,
        )
        .with_limit(10);

        let history = client.history(&request).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history["1"].len(), 2);
        assert_eq!(history["1"][0].clock, 1_700_000_000);
        assert_eq!(history["2"][0].value, "0");
        assert_eq!(history["3"][0].value, "0.25");
    }

    #[tokio::test]
    async fn test_history_refetches_items_crowded_out_of_full_batch() {
        let server = MockServer::start().await;
        // Item 1 polls often and fills the whole batch limit
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {"itemids": ["1", "2"], "limit": 2}
            })))
            .respond_with(rpc_result(json!([
                {"itemid": "1", "clock": "1700000000", "value": "1"},
                {"itemid": "1", "clock": "1699999970", "value": "1"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {
                    "history": 3,
                    "itemids": ["2"],
                    "limit": 1,
                    "sortfield": "clock",
                    "sortorder": "DESC"
                }
            })))
            .respond_with(rpc_result(json!([
                {"itemid": "2", "clock": "1699999700", "value": "0"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let request = HistoryRequest::window(
            vec![
                HistoryTarget::new("1", ValueType::Unsigned),
                HistoryTarget::new("2", ValueType::Unsigned),
            ],
            1_700_000_000,
            86_400,
        );

        let history = client.history(&request).await.unwrap();
        assert_eq!(history["1"].len(), 1);
        assert_eq!(history["1"][0].clock, 1_700_000_000);
        assert_eq!(history["2"].len(), 1);
        assert_eq!(history["2"][0].clock, 1_699_999_700);
    }

    #[tokio::test]
    async fn test_history_item_without_samples_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {"itemids": ["1", "2"], "limit": 2}
            })))
            .respond_with(rpc_result(json!([
                {"itemid": "1", "clock": "1700000000", "value": "1"},
                {"itemid": "1", "clock": "1699999970", "value": "1"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": {"itemids": ["2"], "limit": 1}
            })))
            .respond_with(rpc_result(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let request = HistoryRequest::window(
            vec![
                HistoryTarget::new("1", ValueType::Unsigned),
                HistoryTarget::new("2", ValueType::Unsigned),
            ],
            1_700_000_000,
            86_400,
        );

        let history = client.history(&request).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(!history.contains_key("2"));
    }

    #[tokio::test]
    async fn test_history_skip_policy_continues() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "history.get", "params": {"itemids": ["1"]}})))
            .respond_with(rpc_error(-32500, "Application error.", "DB down"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(API))
            .and(body_partial_json(json!({"method": "history.get", "params": {"itemids": ["2"]}})))
            .respond_with(rpc_result(json!([{"itemid": "2", "clock": "100", "value": "1"}])))
            .mount(&server)
            .await;

        let mut client = create_mock_client(&server).await;
        client.config = client.config.clone().with_history_batch_size(1);
        let targets = vec![
            HistoryTarget::new("1", ValueType::Unsigned),
            HistoryTarget::new("2", ValueType::Unsigned),
        ];

        let skip = HistoryRequest::window(targets.clone(), 200, 100)
            .with_policy(BatchFailurePolicy::Skip);
        let history = client.history(&skip).await.unwrap();
        assert!(!history.contains_key("1"));
        assert_eq!(history["2"].len(), 1);

        let abort = HistoryRequest::window(targets, 200, 100);
        assert!(matches!(
            client.history(&abort).await,
            Err(ZabbixError::Api { code: -32500, .. })
        ));
    }

    #[tokio::test]
    async fn test_history_empty_targets() {
        let server = MockServer::start().await;
        let client = create_mock_client(&server).await;
        let request = HistoryRequest::window(Vec::new(), 100, 10);
        assert!(client.history(&request).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let result = client.api_request("apiinfo.version", &json!({})).await;
        assert_eq!(
            result.unwrap_err(),
            ZabbixError::Http {
                status: 404,
                body: "not here".into()
            }
        );
    }

    #[tokio::test]
    async fn test_unauthorized_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let result = client.templates().await;
        assert!(matches!(result, Err(ZabbixError::AuthenticationFailed { .. })));
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let result = client.templates().await;
        assert!(matches!(result, Err(ZabbixError::UnexpectedResponse { .. })));
    }

    #[tokio::test]
    async fn test_missing_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "id": 1})))
            .mount(&server)
            .await;

        let client = create_mock_client(&server).await;
        let result = client.api_request("apiinfo.version", &json!({})).await;
        assert!(matches!(result, Err(ZabbixError::UnexpectedResponse { .. })));
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(rpc_result(json!([])).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let config = test_config(&server).with_timeout_ms(50);
        let client = ZabbixClient::new(config, Credentials::token("tok")).unwrap();
        let result = client.templates().await;
        assert_eq!(result.unwrap_err(), ZabbixError::Timeout { timeout_ms: 50 });
    }

    // Retry logic tests
    #[tokio::test]
    async fn test_retry_on_rate_limit() {
        use std::sync::atomic::AtomicU32;
        use std::sync::Arc;

        let server = MockServer::start().await;
        let call_count = Arc::new(AtomicU32::new(0));
        let call_count_clone = Arc::clone(&call_count);

        // 429 on the first call, success on the second
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(move |_req: &wiremock::Request| {
                let count = call_count_clone.fetch_add(1, Ordering::SeqCst);
                if count == 0 {
                    ResponseTemplate::new(429).insert_header("retry-after", "1")
                } else {
                    rpc_result(json!([{"templateid": "7", "name": "T7"}]))
                }
            })
            .mount(&server)
            .await;

        let config = test_config(&server).with_max_retries(1);
        let client = ZabbixClient::new(config, Credentials::token("tok")).unwrap();

        let templates = client.templates().await.unwrap();
        assert_eq!(templates, vec![Template::new("7", "T7")]);
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_retries_exceeded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .expect(3)
            .mount(&server)
            .await;

        let config = test_config(&server).with_max_retries(2);
        let client = ZabbixClient::new(config, Credentials::token("tok")).unwrap();

        let result = client.templates().await;
        assert!(matches!(result, Err(ZabbixError::Http { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_no_retry_on_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(API))
            .respond_with(rpc_error(-32602, "Invalid params.", "No permissions."))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server).with_max_retries(3);
        let client = ZabbixClient::new(config, Credentials::token("tok")).unwrap();

        let result = client.templates().await;
        assert!(matches!(result, Err(ZabbixError::Api { .. })));
    }
}
