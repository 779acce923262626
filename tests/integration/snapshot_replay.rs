//! Collect → save → reload → analyze offline.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zabbix_monitoring::error::ReportError;
use zabbix_monitoring::model::{HistoryMap, Host, TemplateLink, TelemetryItem};
use zabbix_monitoring::pipeline::RunMode;
use zabbix_monitoring::report::{HISTORY_FILE, HOSTS_FILE, ITEMS_FILE, TEMPLATES_FILE};
use zabbix_monitoring::rules::TemplateCatalog;
use zabbix_monitoring::snapshot::{Snapshot, SnapshotSource};

use super::common::{pipeline, samples, tagged_item};

fn source_snapshot() -> Snapshot {
    let h1 = Host::new("1", "edge-1", "Edge 1")
        .with_template(TemplateLink::new("9", "Template Net ICMP Ping"));
    let h2 = Host::new("2", "edge-2", "Edge 2");
    let mut history = HistoryMap::new();
    history.insert("11".into(), samples("11", &["1"; 12]));
    history.insert("21".into(), samples("21", &["0", "0", "1"]));
    Snapshot {
        items: vec![
            tagged_item("11", &h1),
            tagged_item("21", &h2),
            TelemetryItem::new("22", "2", "system.uptime", "Uptime"),
        ],
        hosts: vec![h1, h2],
        templates: Vec::new(),
        history,
    }
}

#[tokio::test]
async fn test_collect_then_replay_tag_mode() {
    let collected = TempDir::new().unwrap();
    let collector = pipeline(
        SnapshotSource::new(source_snapshot()),
        TemplateCatalog::default(),
        collected.path(),
    );
    collector.run(RunMode::Collect).await.unwrap();

    for file in [HOSTS_FILE, TEMPLATES_FILE, ITEMS_FILE, HISTORY_FILE] {
        assert!(collector.store().contains(file), "{file} written");
    }

    let saved = Snapshot::load(collector.store()).unwrap();
    assert_eq!(saved.hosts.len(), 2);
    assert_eq!(saved.items.len(), 3);
    // Collection keeps the ten newest samples per item
    assert_eq!(saved.history["11"].len(), 10);

    let reports = TempDir::new().unwrap();
    let replay = pipeline(
        SnapshotSource::open(collected.path()).unwrap(),
        TemplateCatalog::default(),
        reports.path(),
    );
    let analysis = replay.tag_connectivity().await.unwrap();

    assert_eq!(analysis.summary.total_hosts_analyzed, 2);
    assert_eq!(analysis.summary.hosts_with_issues, 1);
    assert_eq!(analysis.problematic_items.len(), 1);
    assert_eq!(analysis.problematic_items[0].itemid, "21");
    assert!(analysis.hosts_without_connection_items.is_empty());
}

#[tokio::test]
async fn test_replay_without_snapshot_fails() {
    let empty = TempDir::new().unwrap();
    let result = SnapshotSource::open(empty.path());
    assert!(matches!(result, Err(ReportError::MissingInput { .. })));
}
