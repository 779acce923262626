//! The JSON-RPC client driving the pipeline against a mock Zabbix server.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zabbix_monitoring::error::{AppError, ZabbixError};
use zabbix_monitoring::model::ValueType;
use zabbix_monitoring::pipeline::RunMode;
use zabbix_monitoring::rules::TemplateCatalog;
use zabbix_monitoring::scoring::ScoreStatus;
use zabbix_monitoring::snapshot::{Snapshot, SnapshotSource};
use zabbix_monitoring::zabbix::{ClientConfig, Credentials, ZabbixClient};

use super::common::{pipeline, NOW};

const API: &str = "/api_jsonrpc.php";

fn rpc_result(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"jsonrpc": "2.0", "result": result, "id": 1}))
}

fn history_row(itemid: &str, age: i64, value: &str) -> Value {
    json!({"itemid": itemid, "clock": (NOW - age).to_string(), "value": value, "ns": "0"})
}

async fn mount(server: &MockServer, body: Value, response: ResponseTemplate, priority: u8) {
    Mock::given(method("POST"))
        .and(path(API))
        .and(body_partial_json(body))
        .respond_with(response)
        .with_priority(priority)
        .mount(server)
        .await;
}

/// Two hosts; edge-1 has a healthy tagged ping, edge-2 a failing one.
async fn mock_zabbix(history: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;

    mount(
        &server,
        json!({"method": "user.login", "params": {"username": "Admin", "password": "zabbix"}}),
        rpc_result(json!("session-1")),
        5,
    )
    .await;
    mount(
        &server,
        json!({"method": "host.get"}),
        rpc_result(json!([
            {
                "hostid": "1", "host": "edge-1", "name": "Edge 1",
                "parentTemplates": [{"templateid": "9", "name": "Template Net ICMP Ping"}]
            },
            {"hostid": "2", "host": "edge-2", "name": "Edge 2", "parentTemplates": []}
        ])),
        5,
    )
    .await;
    mount(
        &server,
        json!({"method": "template.get"}),
        rpc_result(json!([
            {"templateid": "9", "host": "Template Net ICMP Ping", "name": "Template Net ICMP Ping"}
        ])),
        5,
    )
    .await;

    let ping = |itemid: &str, hostid: &str, host: &str| {
        json!({
            "itemid": itemid, "hostid": hostid, "templateid": "0",
            "key_": "icmpping", "name": "ICMP ping", "value_type": "3", "status": "0",
            "lastvalue": "0", "lastclock": "0",
            "tags": [{"tag": "Connection Status", "value": ""}],
            "hosts": [{"hostid": hostid, "host": host, "name": host}]
        })
    };
    let tagged = json!([ping("11", "1", "edge-1"), ping("21", "2", "edge-2")]);
    mount(
        &server,
        json!({"method": "item.get", "params": {"evaltype": 0}}),
        rpc_result(tagged.clone()),
        1,
    )
    .await;
    let mut all = tagged.as_array().unwrap().clone();
    all.push(json!({
        "itemid": "22", "hostid": "2", "key_": "system.uptime", "name": "Uptime",
        "value_type": "3", "status": "0", "tags": []
    }));
    mount(
        &server,
        json!({"method": "item.get"}),
        rpc_result(Value::Array(all)),
        5,
    )
    .await;

    mount(&server, json!({"method": "history.get"}), history, 5).await;
    server
}

fn healthy_history() -> ResponseTemplate {
    rpc_result(json!([
        history_row("11", 0, "1"),
        history_row("11", 60, "1"),
        history_row("21", 0, "0"),
        history_row("21", 60, "0"),
        history_row("21", 120, "1"),
    ]))
}

async fn connect(server: &MockServer) -> ZabbixClient {
    let config = ClientConfig::default()
        .with_url(server.uri())
        .with_max_retries(0)
        .with_retry_delay_ms(10);
    ZabbixClient::connect(config, Credentials::login("Admin", "zabbix"))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_collect_from_api_and_replay_offline() {
    let server = mock_zabbix(healthy_history()).await;
    let client = connect(&server).await;
    assert!(client.is_authenticated());

    let collected = TempDir::new().unwrap();
    let collector = pipeline(client, TemplateCatalog::default(), collected.path());
    collector.run(RunMode::Collect).await.unwrap();

    let snapshot = Snapshot::load(collector.store()).unwrap();
    assert_eq!(snapshot.hosts.len(), 2);
    assert_eq!(snapshot.hosts[0].parent_templates[0].templateid, "9");
    assert_eq!(snapshot.templates.len(), 1);
    assert_eq!(snapshot.items.len(), 3);
    let ping = &snapshot.items[0];
    assert_eq!(ping.value_type, ValueType::Unsigned);
    assert_eq!(ping.templateid, None);
    assert_eq!(ping.lastclock, None);
    assert_eq!(ping.tags[0].value, None);
    assert_eq!(snapshot.history["21"].len(), 3);

    let reports = TempDir::new().unwrap();
    let analysis = pipeline(
        SnapshotSource::open(collected.path()).unwrap(),
        TemplateCatalog::default(),
        reports.path(),
    )
    .tag_connectivity()
    .await
    .unwrap();
    assert_eq!(analysis.summary.hosts_with_issues, 1);
    assert_eq!(analysis.problematic_items[0].host.hostname, "edge-2");
}

#[tokio::test]
async fn test_tag_mode_against_api() {
    let server = mock_zabbix(healthy_history()).await;
    let dir = TempDir::new().unwrap();
    let analysis = pipeline(connect(&server).await, TemplateCatalog::default(), dir.path())
        .tag_connectivity()
        .await
        .unwrap();

    assert_eq!(analysis.hosts.len(), 2);
    let edge1 = &analysis.hosts[0];
    assert_eq!(edge1.host.hostname, "edge-1");
    assert_eq!(edge1.items[0].score.status, ScoreStatus::Healthy);
    let edge2 = &analysis.hosts[1];
    assert_eq!(edge2.items[0].score.successful_count, 1);
    assert_eq!(edge2.items[0].score.total_count, 3);
    assert_eq!(edge2.items[0].score.status, ScoreStatus::Critical);
}

#[tokio::test]
async fn test_tag_mode_tolerates_failed_history() {
    let server = mock_zabbix(ResponseTemplate::new(500).set_body_string("boom")).await;
    let dir = TempDir::new().unwrap();
    let analysis = pipeline(connect(&server).await, TemplateCatalog::default(), dir.path())
        .tag_connectivity()
        .await
        .unwrap();

    assert_eq!(analysis.summary.total_items_analyzed, 2);
    assert!(analysis
        .hosts
        .iter()
        .flat_map(|h| &h.items)
        .all(|i| i.score.status == ScoreStatus::NoData));
}

#[tokio::test]
async fn test_collect_aborts_on_failed_history() {
    let server = mock_zabbix(ResponseTemplate::new(500).set_body_string("boom")).await;
    let dir = TempDir::new().unwrap();
    let result = pipeline(connect(&server).await, TemplateCatalog::default(), dir.path())
        .run(RunMode::Collect)
        .await;

    assert!(matches!(
        result,
        Err(AppError::Zabbix(ZabbixError::Http { status: 500, .. }))
    ));
}

#[tokio::test]
async fn test_session_sent_as_bearer() {
    let server = mock_zabbix(healthy_history()).await;
    Mock::given(method("POST"))
        .and(path(API))
        .and(header("authorization", "Bearer session-1"))
        .and(body_partial_json(json!({"method": "apiinfo.version"})))
        .respond_with(rpc_result(json!("7.0.0")))
        .expect(1)
        .mount(&server)
        .await;

    let client = connect(&server).await;
    let version = client
        .api_request("apiinfo.version", &json!({}))
        .await
        .unwrap();
    assert_eq!(version, json!("7.0.0"));
}
