//! Template-driven classification and weighted scoring.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use zabbix_monitoring::error::{AppError, ConfigError};
use zabbix_monitoring::model::{
    HistoryMap, HistoryRecord, Host, Template, TemplateLink, TelemetryItem,
};
use zabbix_monitoring::pipeline::RunMode;
use zabbix_monitoring::report::{
    ANALYSIS_RESULTS_FILE, CONNECTIVITY_ITEMS_FILE, MASTER_ITEMS_CHECK_FILE, MASTER_ITEMS_FILE,
    TEMPLATE_ANALYSIS_FILE,
};
use zabbix_monitoring::rules::{Priority, TemplateCatalog, TemplateCoverage, ThresholdOverrides};
use zabbix_monitoring::scoring::ConnectivityAnalysis;
use zabbix_monitoring::snapshot::{Snapshot, SnapshotSource};

use super::common::{pipeline, NOW};

const CATALOG: &str = r#"
templates:
  - name: "Template Net ICMP Ping"
    connection_check_items:
      - { key: "icmpping", required: true, priority: high }
      - { key: "icmppingloss", priority: medium }
    master_items:
      - { key: "agent.ping", priority: medium }
  - name: "Template Module Interfaces SNMP"
    connection_check_items:
      - { key: "net.if.status.*", priority: low }
thresholds:
  inactive_threshold: 600
"#;

fn catalog() -> TemplateCatalog {
    TemplateCatalog::from_yaml(CATALOG, "inline").unwrap()
}

fn snapshot() -> Snapshot {
    let icmp = TemplateLink::new("9", "Template Net ICMP Ping");
    let linux = TemplateLink::new("10", "Template OS Linux");
    let mut history = HistoryMap::new();
    history.insert("11".into(), vec![HistoryRecord::new("11", NOW - 30, "1")]);
    history.insert("12".into(), vec![HistoryRecord::new("12", NOW - 1_200, "0")]);
    history.insert("13".into(), vec![HistoryRecord::new("13", NOW - 60, "1")]);
    history.insert("21".into(), vec![HistoryRecord::new("21", NOW - 10, "1")]);

    Snapshot {
        hosts: vec![
            Host::new("1", "web", "Web")
                .with_template(icmp.clone())
                .with_template(linux.clone()),
            Host::new("2", "db", "Database").with_template(icmp),
            Host::new("3", "app", "App").with_template(linux),
        ],
        templates: vec![
            Template::new("9", "Template Net ICMP Ping"),
            Template::new("10", "Template OS Linux"),
            Template::new("11", "Template Module Interfaces SNMP"),
        ],
        items: vec![
            TelemetryItem::new("11", "1", "icmpping", "ICMP ping"),
            TelemetryItem::new("12", "1", "icmppingloss", "ICMP loss"),
            TelemetryItem::new("13", "1", "agent.ping", "Agent ping"),
            TelemetryItem::new("14", "1", "system.cpu.load", "CPU load"),
            TelemetryItem::new("21", "2", "icmpping", "ICMP ping"),
            TelemetryItem::new("31", "3", "system.cpu.load", "CPU load"),
        ],
        history,
    }
}

#[tokio::test]
async fn test_weighted_score_with_stale_item() {
    let dir = TempDir::new().unwrap();
    let report = pipeline(SnapshotSource::new(snapshot()), catalog(), dir.path())
        .template_connectivity()
        .await
        .unwrap();

    // Only hosts with classified items are scored
    assert_eq!(report.analysis.hosts.len(), 2);

    let web = &report.analysis.hosts[0];
    assert_eq!(web.hostid.as_deref(), Some("1"));
    assert_eq!(web.total_items, 2);
    assert_eq!(web.active_items, 1);
    assert_eq!(web.inactive_items, 1);
    // 1.0 / (1.0 + 0.5)
    assert_eq!(web.connectivity_score, 0.667);
    assert_eq!(web.issues.len(), 1);
    assert_eq!(web.issues[0].key, "icmppingloss");
    assert_eq!(web.issues[0].issue, "No recent data for 20 minutes");
    assert_eq!(web.issues[0].data_age_seconds, Some(1_200));

    let db = &report.analysis.hosts[1];
    assert_eq!(db.connectivity_score, 1.0);
    assert!(db.issues.is_empty());

    let summary = &report.analysis.summary;
    assert_eq!(summary.total_hosts, 2);
    assert_eq!(summary.hosts_with_connectivity, 1);
    assert_eq!(summary.hosts_without_connectivity, 1);
    assert_eq!(summary.total_connectivity_items, 3);
}

#[tokio::test]
async fn test_classified_items_carry_rule_metadata() {
    let dir = TempDir::new().unwrap();
    let report = pipeline(SnapshotSource::new(snapshot()), catalog(), dir.path())
        .template_connectivity()
        .await
        .unwrap();

    let ping = report
        .connectivity_items
        .iter()
        .find(|i| i.itemid == "11")
        .unwrap();
    assert_eq!(ping.template, "Template Net ICMP Ping");
    assert!(ping.required);
    assert_eq!(ping.priority, Priority::High);

    assert_eq!(report.master_items.len(), 1);
    assert_eq!(report.master_items[0].itemid, "13");
    assert_eq!(report.master_check.summary.total_master_items, 1);
    assert_eq!(report.master_check.summary.active_items, 1);
    assert_eq!(report.master_check.summary.items_with_data, 1);
}

#[tokio::test]
async fn test_reports_written() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(SnapshotSource::new(snapshot()), catalog(), dir.path());
    pipeline.run(RunMode::TemplateConnectivity).await.unwrap();

    for file in [
        CONNECTIVITY_ITEMS_FILE,
        MASTER_ITEMS_FILE,
        ANALYSIS_RESULTS_FILE,
        MASTER_ITEMS_CHECK_FILE,
    ] {
        assert!(pipeline.store().contains(file), "{file} written");
    }

    let analysis: ConnectivityAnalysis = pipeline.store().read_json(ANALYSIS_RESULTS_FILE).unwrap();
    assert_eq!(analysis.max_data_age, 3600);
    assert_eq!(analysis.analysis_timestamp.timestamp(), NOW);
}

#[tokio::test]
async fn test_threshold_overrides_take_precedence() {
    let overrides = ThresholdOverrides {
        inactive_threshold: Some(2_000),
        min_connectivity_score: Some(0.5),
        ..ThresholdOverrides::default()
    };
    let catalog = catalog().with_threshold_overrides(&overrides);
    assert_eq!(catalog.thresholds().inactive_threshold, 2_000);

    let dir = TempDir::new().unwrap();
    let report = pipeline(SnapshotSource::new(snapshot()), catalog, dir.path())
        .template_connectivity()
        .await
        .unwrap();

    // The 20 minute old sample is now fresh enough
    assert_eq!(report.analysis.hosts[0].connectivity_score, 1.0);
    assert_eq!(report.analysis.summary.hosts_with_connectivity, 2);
}

#[tokio::test]
async fn test_analyze_templates_coverage() {
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(SnapshotSource::new(snapshot()), catalog(), dir.path());
    pipeline.run(RunMode::AnalyzeTemplates).await.unwrap();

    let coverage: TemplateCoverage = pipeline.store().read_json(TEMPLATE_ANALYSIS_FILE).unwrap();
    assert_eq!(coverage.total_templates, 3);
    assert_eq!(coverage.matched_templates, 2);
    assert_eq!(coverage.unmatched_templates, 1);
    assert_eq!(coverage.unconfigured, vec!["Template OS Linux".to_string()]);
    let icmp = coverage
        .configured
        .iter()
        .find(|c| c.name == "Template Net ICMP Ping")
        .unwrap();
    assert_eq!(icmp.connection_check_items, 2);
    assert_eq!(icmp.master_items, 1);
}

#[test]
fn test_malformed_catalog_is_config_error() {
    let err = TemplateCatalog::from_yaml("templates: [", "broken.yml").unwrap_err();
    assert!(matches!(&err, ConfigError::RulesInvalid { path, .. } if path == "broken.yml"));

    let app: AppError = err.into();
    assert!(app.to_string().starts_with("Configuration error"));
}

#[test]
fn test_shipped_mapping_loads() {
    let catalog = TemplateCatalog::from_path(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/mappings/templates.yml"
    ))
    .unwrap();

    assert_eq!(catalog.templates().len(), 3);
    let snmp = catalog
        .get_template_by_name("Template Module Interfaces SNMP")
        .unwrap();
    assert!(snmp.connection_check_items[0].is_discovery);
    assert_eq!(catalog.thresholds().min_connectivity_score, 0.8);
}
