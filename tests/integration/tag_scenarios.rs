//! Tag-driven detection and success-rate scoring.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zabbix_monitoring::model::{HistoryMap, Host, ItemStatus, ItemTag, TelemetryItem};
use zabbix_monitoring::pipeline::{PipelineSettings, RunMode};
use zabbix_monitoring::report::{TAG_ANALYSIS_FILE, TAG_ITEMS_FILE};
use zabbix_monitoring::rules::TemplateCatalog;
use zabbix_monitoring::scoring::{ExpectedValue, ScoreStatus, TagBasedAnalysis};
use zabbix_monitoring::snapshot::{Snapshot, SnapshotSource};

use super::common::{pipeline, samples, tagged_item};

/// H1 healthy with three items, H2 at 40%, H3 with no tagged items.
fn three_host_snapshot() -> Snapshot {
    let h1 = Host::new("1", "h1", "Host 1");
    let h2 = Host::new("2", "h2", "Host 2");
    let h3 = Host::new("3", "h3", "Host 3");

    let mut history = HistoryMap::new();
    for id in ["11", "12", "13"] {
        history.insert(id.into(), samples(id, &["1"; 10]));
    }
    history.insert(
        "21".into(),
        samples("21", &["1", "0", "1", "0", "0", "1", "0", "1", "0", "0"]),
    );

    Snapshot {
        items: vec![
            tagged_item("11", &h1),
            tagged_item("12", &h1),
            tagged_item("13", &h1),
            tagged_item("21", &h2),
            TelemetryItem::new("31", "3", "system.cpu.load", "CPU load"),
        ],
        hosts: vec![h1, h2, h3],
        templates: Vec::new(),
        history,
    }
}

#[tokio::test]
async fn test_healthy_host_has_no_issues() {
    let dir = TempDir::new().unwrap();
    let source = SnapshotSource::new(three_host_snapshot());
    let analysis = pipeline(source, TemplateCatalog::default(), dir.path())
        .tag_connectivity()
        .await
        .unwrap();

    let host1 = analysis.hosts.iter().find(|h| h.host.hostid == "1").unwrap();
    assert!(!host1.has_issues);
    assert_eq!(host1.total_items, 3);
    assert_eq!(host1.items_below_threshold, 0);
    for item in &host1.items {
        assert_eq!(item.score.percentage, 100.0);
        assert_eq!(item.score.score, 1.0);
        assert_eq!(item.score.status, ScoreStatus::Healthy);
    }
}

#[tokio::test]
async fn test_failing_item_is_problematic() {
    let dir = TempDir::new().unwrap();
    let source = SnapshotSource::new(three_host_snapshot());
    let analysis = pipeline(source, TemplateCatalog::default(), dir.path())
        .tag_connectivity()
        .await
        .unwrap();

    let host2 = analysis.hosts.iter().find(|h| h.host.hostid == "2").unwrap();
    assert!(host2.has_issues);
    assert_eq!(host2.items[0].score.successful_count, 4);
    assert_eq!(host2.items[0].score.total_count, 10);

    assert_eq!(analysis.problematic_items.len(), 1);
    let problem = &analysis.problematic_items[0];
    assert_eq!(problem.itemid, "21");
    assert_eq!(problem.percentage, 40.0);
    assert_eq!(problem.status, ScoreStatus::Critical);
    assert!(problem.message.contains("40.00%"));
}

#[tokio::test]
async fn test_host_without_tagged_items_is_listed_separately() {
    let dir = TempDir::new().unwrap();
    let source = SnapshotSource::new(three_host_snapshot());
    let analysis = pipeline(source, TemplateCatalog::default(), dir.path())
        .tag_connectivity()
        .await
        .unwrap();

    assert_eq!(analysis.hosts_without_connection_items.len(), 1);
    assert_eq!(analysis.hosts_without_connection_items[0].hostid, "3");
    assert!(analysis.hosts.iter().all(|h| h.host.hostid != "3"));

    let summary = &analysis.summary;
    assert_eq!(summary.total_hosts_analyzed, 2);
    assert_eq!(summary.hosts_with_issues, 1);
    assert_eq!(summary.hosts_without_issues, 1);
    assert_eq!(summary.hosts_without_connection_items, 1);
    assert_eq!(summary.total_items_analyzed, 4);
    assert_eq!(summary.items_below_threshold, 1);
    assert_eq!(summary.threshold_percentage, 70.0);
}

#[tokio::test]
async fn test_reports_written_with_expected_shape() {
    let dir = TempDir::new().unwrap();
    let source = SnapshotSource::new(three_host_snapshot());
    let pipeline = pipeline(source, TemplateCatalog::default(), dir.path());
    pipeline.run(RunMode::TagConnectivity).await.unwrap();

    let detection: serde_json::Value = pipeline.store().read_json(TAG_ITEMS_FILE).unwrap();
    assert_eq!(detection["total_hosts"], 3);
    assert_eq!(detection["hosts_with_items"].as_array().unwrap().len(), 2);
    assert_eq!(detection["hosts_without_items"][0]["hostid"], "3");

    let analysis: TagBasedAnalysis = pipeline.store().read_json(TAG_ANALYSIS_FILE).unwrap();
    assert_eq!(analysis.summary.items_below_threshold, 1);

    let raw: serde_json::Value = pipeline.store().read_json(TAG_ANALYSIS_FILE).unwrap();
    assert_eq!(raw["problematic_items"][0]["status"], "critical");
    assert_eq!(raw["hosts"][0]["items"][0]["score"]["status"], "healthy");
}

#[tokio::test]
async fn test_item_without_history_is_no_data() {
    let host = Host::new("5", "h5", "Host 5");
    let snapshot = Snapshot {
        items: vec![tagged_item("51", &host)],
        hosts: vec![host],
        ..Snapshot::default()
    };

    let dir = TempDir::new().unwrap();
    let analysis = pipeline(
        SnapshotSource::new(snapshot),
        TemplateCatalog::default(),
        dir.path(),
    )
    .tag_connectivity()
    .await
    .unwrap();

    let score = &analysis.hosts[0].items[0].score;
    assert_eq!(score.status, ScoreStatus::NoData);
    assert_eq!(score.total_count, 0);
    assert!(analysis.hosts[0].has_issues);
    assert_eq!(analysis.problematic_items[0].status, ScoreStatus::NoData);
}

#[tokio::test]
async fn test_disabled_and_untagged_items_are_ignored() {
    let host = Host::new("6", "h6", "Host 6");
    let mut history = HistoryMap::new();
    history.insert("61".into(), samples("61", &["1", "1"]));
    history.insert("62".into(), samples("62", &["0", "0"]));
    let snapshot = Snapshot {
        items: vec![
            tagged_item("61", &host),
            tagged_item("62", &host).with_status(ItemStatus::Disabled),
            TelemetryItem::new("63", "6", "icmpping", "Other")
                .with_tag(ItemTag::new("scope", "availability")),
        ],
        hosts: vec![host],
        templates: Vec::new(),
        history,
    };

    let dir = TempDir::new().unwrap();
    let analysis = pipeline(
        SnapshotSource::new(snapshot),
        TemplateCatalog::default(),
        dir.path(),
    )
    .tag_connectivity()
    .await
    .unwrap();

    assert_eq!(analysis.hosts.len(), 1);
    assert_eq!(analysis.hosts[0].total_items, 1);
    assert_eq!(analysis.hosts[0].items[0].itemid, "61");
    assert!(!analysis.hosts[0].has_issues);
}

#[tokio::test]
async fn test_custom_tag_expected_value_and_threshold() {
    let host = Host::new("7", "h7", "Host 7");
    let mut history = HistoryMap::new();
    history.insert("71".into(), samples("71", &["up", "up", "down", "up"]));
    let snapshot = Snapshot {
        items: vec![TelemetryItem::new("71", "7", "net.if.status", "Uplink")
            .with_tag(ItemTag::new("Reachability", "wan"))],
        hosts: vec![host],
        templates: Vec::new(),
        history,
    };

    let settings = PipelineSettings {
        connection_tag: "reachability".into(),
        expected_value: ExpectedValue::parse("up"),
        threshold_percentage: 80.0,
        history_limit: 3,
        ..PipelineSettings::default()
    };
    let dir = TempDir::new().unwrap();
    let analysis = pipeline(
        SnapshotSource::new(snapshot),
        TemplateCatalog::default(),
        dir.path(),
    )
    .with_settings(settings)
    .tag_connectivity()
    .await
    .unwrap();

    // Three newest samples: up, up, down
    let score = &analysis.hosts[0].items[0].score;
    assert_eq!(score.total_count, 3);
    assert_eq!(score.successful_count, 2);
    assert_eq!(score.percentage, 66.67);
    assert_eq!(score.status, ScoreStatus::Warning);
    assert_eq!(analysis.summary.threshold_percentage, 80.0);
    assert_eq!(analysis.problematic_items.len(), 1);
}
