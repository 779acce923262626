//! Run modes.
//!
//! A [`Pipeline`] composes a [`MonitoringSource`], the template rule
//! catalog, the classifiers, the scorers and a [`ReportStore`]. Each
//! [`RunMode`] is one pass over the source ending in persisted reports.

use std::collections::HashSet;
use std::sync::Arc;

use crate::classify::{detect_by_tag, ClassifiedItem, TemplateClassifier, DEFAULT_CONNECTION_TAG};
use crate::error::AppError;
use crate::model::{Host, HostRef};
use crate::report::ReportStore;
use crate::rules::{analyze_templates, TemplateCatalog, TemplateCoverage};
use crate::scoring::{
    ConnectivityAnalysis, ConnectivityScorer, ExpectedValue, MasterItemsAnalysis,
    TagBasedAnalysis, TagConnectivityScorer, DEFAULT_HISTORY_LIMIT, DEFAULT_THRESHOLD_PERCENTAGE,
};
use crate::snapshot::Snapshot;
use crate::traits::{
    BatchFailurePolicy, HistoryRequest, HistoryTarget, HostFilter, MonitoringSource, TimeProvider,
};

/// Default history window in seconds (one day).
pub const DEFAULT_HISTORY_WINDOW_SECS: i64 = 86_400;

/// What a run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Collect hosts, templates, items and history into a snapshot.
    Collect,
    /// Report which templates have rule configuration.
    AnalyzeTemplates,
    /// Template-driven classification, weighted scoring, master check.
    TemplateConnectivity,
    /// Tag-driven detection and success-rate scoring.
    TagConnectivity,
}

impl RunMode {
    /// Returns the mode name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collect => "collect",
            Self::AnalyzeTemplates => "analyze-templates",
            Self::TemplateConnectivity => "template-connectivity",
            Self::TagConnectivity => "tag-connectivity",
        }
    }

    /// Returns all modes.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Collect,
            Self::AnalyzeTemplates,
            Self::TemplateConnectivity,
            Self::TagConnectivity,
        ]
    }

    /// Whether the mode cannot run without a template rule file.
    #[must_use]
    pub const fn requires_catalog(&self) -> bool {
        matches!(self, Self::AnalyzeTemplates | Self::TemplateConnectivity)
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunMode {
    type Err = ParseRunModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "collect" => Ok(Self::Collect),
            "analyze-templates" => Ok(Self::AnalyzeTemplates),
            "template-connectivity" => Ok(Self::TemplateConnectivity),
            "tag-connectivity" => Ok(Self::TagConnectivity),
            _ => Err(ParseRunModeError {
                input: s.to_string(),
            }),
        }
    }
}

/// Error when parsing a run mode from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRunModeError {
    /// The input that failed to parse.
    pub input: String,
}

impl std::fmt::Display for ParseRunModeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Unknown mode: '{}'. Valid modes: {}",
            self.input,
            RunMode::all()
                .iter()
                .map(RunMode::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseRunModeError {}

/// Knobs shared by the run modes.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Host selection.
    pub host_filter: HostFilter,
    /// Tag name marking connectivity items.
    pub connection_tag: String,
    /// Recent samples scored per tagged item.
    pub history_limit: usize,
    /// History window ending now, in seconds.
    pub history_window_secs: i64,
    /// Tag-mode threshold percentage.
    pub threshold_percentage: f64,
    /// Sample value that counts as a success in tag mode.
    pub expected_value: ExpectedValue,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            host_filter: HostFilter::default(),
            connection_tag: DEFAULT_CONNECTION_TAG.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_window_secs: DEFAULT_HISTORY_WINDOW_SECS,
            threshold_percentage: DEFAULT_THRESHOLD_PERCENTAGE,
            expected_value: ExpectedValue::default(),
        }
    }
}

/// Outputs of the template-connectivity mode.
#[derive(Debug, Clone)]
pub struct TemplateConnectivityReport {
    /// Classified connection-check items.
    pub connectivity_items: Vec<ClassifiedItem>,
    /// Classified master items.
    pub master_items: Vec<ClassifiedItem>,
    /// Weighted per-host analysis.
    pub analysis: ConnectivityAnalysis,
    /// Master item freshness check.
    pub master_check: MasterItemsAnalysis,
}

/// Composes a data source, rules, scorers and a report store.
pub struct Pipeline<S, T>
where
    S: MonitoringSource,
    T: TimeProvider,
{
    source: S,
    catalog: TemplateCatalog,
    store: ReportStore,
    settings: PipelineSettings,
    time: Arc<T>,
}

impl<S, T> Pipeline<S, T>
where
    S: MonitoringSource,
    T: TimeProvider,
{
    /// Create a pipeline with default settings.
    #[must_use]
    pub fn new(source: S, catalog: TemplateCatalog, store: ReportStore, time: T) -> Self {
        Self {
            source,
            catalog,
            store,
            settings: PipelineSettings::default(),
            time: Arc::new(time),
        }
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings in use.
    #[must_use]
    pub const fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Output store.
    #[must_use]
    pub const fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Run one mode to completion.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if collection fails or a report cannot be saved.
    pub async fn run(&self, mode: RunMode) -> Result<(), AppError> {
        tracing::info!(mode = %mode, output = %self.store.root().display(), "Starting run");
        match mode {
            RunMode::Collect => {
                self.collect().await?;
            }
            RunMode::AnalyzeTemplates => {
                self.analyze_templates().await?;
            }
            RunMode::TemplateConnectivity => {
                self.template_connectivity().await?;
            }
            RunMode::TagConnectivity => {
                self.tag_connectivity().await?;
            }
        }
        tracing::info!(mode = %mode, "Run completed");
        Ok(())
    }

    /// Collect a snapshot and save it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if any collection step fails or the snapshot
    /// cannot be saved.
    pub async fn collect(&self) -> Result<Snapshot, AppError> {
        let hosts = self.source.hosts(&self.settings.host_filter).await?;
        let templates = self.source.templates().await?;
        let hostids: Vec<String> = hosts.iter().map(|h| h.hostid.clone()).collect();
        let items = self.source.host_items(&hostids).await?;

        let targets = items
            .iter()
            .map(|i| HistoryTarget::new(&i.itemid, i.value_type))
            .collect();
        // Enough samples per item for a later tag-mode replay.
        let history = self
            .source
            .history(&self.history_request(
                targets,
                self.settings.history_limit,
                BatchFailurePolicy::Abort,
            ))
            .await?;

        let snapshot = Snapshot {
            hosts,
            templates,
            items,
            history,
        };
        snapshot.save(&self.store)?;
        Ok(snapshot)
    }

    /// Compare the source's templates with the catalog and save the result.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if templates cannot be fetched or the report
    /// cannot be saved.
    pub async fn analyze_templates(&self) -> Result<TemplateCoverage, AppError> {
        let templates = self.source.templates().await?;
        let coverage = analyze_templates(&self.catalog, &templates);
        self.store.save_template_analysis(&coverage)?;
        Ok(coverage)
    }

    /// Classify items by template rules, fetch their latest history, score
    /// hosts and check master items.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if any collection step fails (history batches
    /// abort the run) or a report cannot be saved.
    pub async fn template_connectivity(&self) -> Result<TemplateConnectivityReport, AppError> {
        let hosts = self.source.hosts(&self.settings.host_filter).await?;
        let templates = self.source.templates().await?;
        let hostids: Vec<String> = hosts.iter().map(|h| h.hostid.clone()).collect();
        let items = self.source.host_items(&hostids).await?;

        let classifier = TemplateClassifier::new(&self.catalog);
        let connectivity_items = classifier.classify_connectivity_items(&hosts, &items, &templates);
        let master_items = classifier.classify_master_items(&hosts, &items, &templates);
        self.store.save_connectivity_items(&connectivity_items)?;
        self.store.save_master_items(&master_items)?;

        let mut seen = HashSet::new();
        let targets = connectivity_items
            .iter()
            .chain(&master_items)
            .filter(|i| seen.insert(i.itemid.clone()))
            .map(|i| HistoryTarget::new(&i.itemid, i.value_type))
            .collect();
        let history = self
            .source
            .history(&self.history_request(targets, 1, BatchFailurePolicy::Abort))
            .await?;

        let scorer = ConnectivityScorer::new(*self.catalog.thresholds(), Arc::clone(&self.time));
        let analysis = scorer.analyze_connectivity(&connectivity_items, &history);
        let master_check = scorer.analyze_master_items(&master_items, &history);
        self.store.save_analysis(&analysis)?;
        self.store.save_master_items_check(&master_check)?;

        tracing::info!(
            total_hosts = analysis.summary.total_hosts,
            hosts_with_connectivity = analysis.summary.hosts_with_connectivity,
            hosts_without_connectivity = analysis.summary.hosts_without_connectivity,
            average_score = analysis.summary.average_connectivity_score,
            master_items = master_check.summary.total_master_items,
            inactive_master_items = master_check.summary.inactive_items,
            "Template connectivity summary"
        );

        Ok(TemplateConnectivityReport {
            connectivity_items,
            master_items,
            analysis,
            master_check,
        })
    }

    /// Detect tagged items, fetch their recent history and score each
    /// item's success rate.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if hosts or tagged items cannot be fetched or a
    /// report cannot be saved. Failed history batches are skipped.
    pub async fn tag_connectivity(&self) -> Result<TagBasedAnalysis, AppError> {
        let tag = self.settings.connection_tag.as_str();
        let hosts = self.source.hosts(&self.settings.host_filter).await?;
        let hostids: Vec<String> = hosts.iter().map(|h| h.hostid.clone()).collect();
        let items = self.source.items_by_tag(tag, &hostids).await?;

        let mut detection = detect_by_tag(&items, tag);
        let host_refs: Vec<HostRef> = hosts.iter().map(Host::to_ref).collect();
        detection.include_hosts(&host_refs);
        self.store.save_tag_detection(&detection)?;

        let targets = detection
            .hosts_with_items
            .iter()
            .flat_map(|h| &h.items)
            .map(|i| HistoryTarget::new(&i.itemid, i.value_type))
            .collect();
        let history = self
            .source
            .history(&self.history_request(
                targets,
                self.settings.history_limit,
                BatchFailurePolicy::Skip,
            ))
            .await?;

        let scorer = TagConnectivityScorer::new(Arc::clone(&self.time))
            .with_expected(self.settings.expected_value.clone())
            .with_history_limit(self.settings.history_limit)
            .with_threshold(self.settings.threshold_percentage);
        let analysis = scorer.analyze_tag_based_connectivity(&detection, &history);
        self.store.save_tag_analysis(&analysis)?;

        let summary = &analysis.summary;
        tracing::info!(
            total_hosts_analyzed = summary.total_hosts_analyzed,
            hosts_with_issues = summary.hosts_with_issues,
            hosts_without_connection_items = summary.hosts_without_connection_items,
            total_items_analyzed = summary.total_items_analyzed,
            items_below_threshold = summary.items_below_threshold,
            threshold_percentage = summary.threshold_percentage,
            "Connectivity analysis summary"
        );

        Ok(analysis)
    }

    fn history_request(
        &self,
        targets: Vec<HistoryTarget>,
        limit_per_item: usize,
        policy: BatchFailurePolicy,
    ) -> HistoryRequest {
        HistoryRequest::window(
            targets,
            self.time.now().timestamp(),
            self.settings.history_window_secs,
        )
        .with_limit(limit_per_item)
        .with_policy(policy)
    }
}

impl<S, T> std::fmt::Debug for Pipeline<S, T>
where
    S: MonitoringSource,
    T: TimeProvider,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("source", &"<MonitoringSource>")
            .field("catalog_templates", &self.catalog.templates().len())
            .field("store", &self.store)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::unreadable_literal
)]
mod tests {
    use super::*;
    use crate::error::ZabbixError;
    use crate::model::{
        HistoryMap, HistoryRecord, ItemTag, Template, TemplateLink, TelemetryItem,
    };
    use crate::report::{
        ANALYSIS_RESULTS_FILE, CONNECTIVITY_ITEMS_FILE, HOSTS_FILE, MASTER_ITEMS_CHECK_FILE,
        MASTER_ITEMS_FILE, TAG_ANALYSIS_FILE, TAG_ITEMS_FILE, TEMPLATE_ANALYSIS_FILE,
    };
    use crate::rules::{ConnectionCheckRule, MasterItemRule, Priority, TemplateRule, Thresholds};
    use crate::scoring::ScoreStatus;
    use crate::traits::{MockMonitoringSource, MockTimeProvider};
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const NOW: i64 = 1_700_000_000;
    const ICMP_TEMPLATE: &str = "Template Net ICMP Ping";

    fn fixed_clock() -> MockTimeProvider {
        let now: DateTime<Utc> = DateTime::from_timestamp(NOW, 0).unwrap();
        let mut time = MockTimeProvider::new();
        time.expect_now().returning(move || now);
        time
    }

    fn icmp_catalog() -> TemplateCatalog {
        TemplateCatalog::new(
            vec![TemplateRule::new(ICMP_TEMPLATE)
                .with_connection_check(
                    ConnectionCheckRule::new("icmpping", "", true, Priority::High).unwrap(),
                )
                .with_master_item(
                    MasterItemRule::new("agent.ping", "", false, Priority::Medium).unwrap(),
                )],
            Thresholds::default(),
        )
    }

    fn samples(itemid: &str, values: &[&str]) -> Vec<HistoryRecord> {
        values
            .iter()
            .zip(0..)
            .map(|(v, i)| HistoryRecord::new(itemid, NOW - i * 60, *v))
            .collect()
    }

    fn tagged(itemid: &str, host: &Host) -> TelemetryItem {
        TelemetryItem::new(itemid, &host.hostid, "icmpping", format!("Ping {itemid}"))
            .with_tag(ItemTag::bare("connection status"))
            .with_host(host.to_ref())
    }

    #[test]
    fn test_run_mode_from_str() {
        assert_eq!("collect".parse::<RunMode>().unwrap(), RunMode::Collect);
        assert_eq!(
            "Tag_Connectivity".parse::<RunMode>().unwrap(),
            RunMode::TagConnectivity
        );
        for mode in RunMode::all() {
            assert_eq!(mode.as_str().parse::<RunMode>().unwrap(), *mode);
            assert_eq!(mode.to_string(), mode.as_str());
        }
    }

    #[test]
    fn test_run_mode_from_str_unknown() {
        let err = "report".parse::<RunMode>().unwrap_err();
        assert_eq!(err.input, "report");
        let message = err.to_string();
        assert!(message.contains("collect"));
        assert!(message.contains("tag-connectivity"));
    }

    #[test]
    fn test_run_mode_requires_catalog() {
        assert!(RunMode::AnalyzeTemplates.requires_catalog());
        assert!(RunMode::TemplateConnectivity.requires_catalog());
        assert!(!RunMode::Collect.requires_catalog());
        assert!(!RunMode::TagConnectivity.requires_catalog());
    }

    #[test]
    fn test_pipeline_settings_default() {
        let settings = PipelineSettings::default();
        assert_eq!(settings.connection_tag, "connection status");
        assert_eq!(settings.history_limit, 10);
        assert_eq!(settings.history_window_secs, 86_400);
        assert_eq!(settings.threshold_percentage, 70.0);
        assert_eq!(settings.expected_value, ExpectedValue::Int(1));
    }

    #[tokio::test]
    async fn test_tag_connectivity_scenarios() {
        let h1 = Host::new("1", "h1", "Host 1");
        let h2 = Host::new("2", "h2", "Host 2");
        let h3 = Host::new("3", "h3", "Host 3");
        let hosts = vec![h1.clone(), h2.clone(), h3];
        let items = vec![
            tagged("11", &h1),
            tagged("12", &h1),
            tagged("13", &h1),
            tagged("21", &h2),
        ];

        let mut history = HistoryMap::new();
        for id in ["11", "12", "13"] {
            history.insert(id.into(), samples(id, &["1"; 10]));
        }
        history.insert(
            "21".into(),
            samples("21", &["1", "0", "1", "0", "0", "1", "0", "1", "0", "0"]),
        );

        let mut source = MockMonitoringSource::new();
        source.expect_hosts().returning(move |_| Ok(hosts.clone()));
        source
            .expect_items_by_tag()
            .times(1)
            .returning(move |_, _| Ok(items.clone()));
        source
            .expect_history()
            .withf(|request| {
                request.failure_policy == BatchFailurePolicy::Skip
                    && request.limit_per_item == 10
                    && request.targets.len() == 4
                    && request.time_till == NOW
                    && request.time_from == NOW - 86_400
            })
            .times(1)
            .returning(move |_| Ok(history.clone()));

        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            source,
            TemplateCatalog::default(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        );
        let analysis = pipeline.tag_connectivity().await.unwrap();

        // H1: all items fully successful
        let host1 = analysis.hosts.iter().find(|h| h.host.hostid == "1").unwrap();
        assert!(!host1.has_issues);
        assert_eq!(host1.total_items, 3);

        // H2: 40% success is problematic
        assert_eq!(analysis.problematic_items.len(), 1);
        let problem = &analysis.problematic_items[0];
        assert_eq!(problem.host.hostid, "2");
        assert_eq!(problem.percentage, 40.0);
        assert_eq!(problem.status, ScoreStatus::Critical);
        assert_eq!(analysis.summary.hosts_with_issues, 1);

        // H3: only listed as without connection items
        assert_eq!(analysis.hosts_without_connection_items.len(), 1);
        assert_eq!(analysis.hosts_without_connection_items[0].hostid, "3");
        assert!(analysis.hosts.iter().all(|h| h.host.hostid != "3"));
        assert_eq!(analysis.summary.hosts_without_connection_items, 1);

        assert!(pipeline.store().contains(TAG_ITEMS_FILE));
        assert!(pipeline.store().contains(TAG_ANALYSIS_FILE));
    }

    #[tokio::test]
    async fn test_template_connectivity() {
        let host =
            Host::new("1", "web", "Web").with_template(TemplateLink::new("9", ICMP_TEMPLATE));
        let items = vec![
            TelemetryItem::new("11", "1", "icmpping", "ICMP ping"),
            TelemetryItem::new("12", "1", "agent.ping", "Agent ping"),
            TelemetryItem::new("13", "1", "system.cpu.load", "CPU load"),
        ];
        let mut history = HistoryMap::new();
        history.insert("11".into(), vec![HistoryRecord::new("11", NOW - 30, "1")]);

        let mut source = MockMonitoringSource::new();
        source
            .expect_hosts()
            .returning(move |_| Ok(vec![host.clone()]));
        source
            .expect_templates()
            .returning(|| Ok(vec![Template::new("9", ICMP_TEMPLATE)]));
        source
            .expect_host_items()
            .returning(move |_| Ok(items.clone()));
        source
            .expect_history()
            .withf(|request| {
                request.failure_policy == BatchFailurePolicy::Abort
                    && request.limit_per_item == 1
                    && request.targets.len() == 2
            })
            .times(1)
            .returning(move |_| Ok(history.clone()));

        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            source,
            icmp_catalog(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        );
        let report = pipeline.template_connectivity().await.unwrap();

        assert_eq!(report.connectivity_items.len(), 1);
        assert_eq!(report.master_items.len(), 1);
        assert_eq!(report.analysis.hosts.len(), 1);
        assert_eq!(report.analysis.hosts[0].connectivity_score, 1.0);
        assert_eq!(report.master_check.summary.inactive_items, 1);
        assert_eq!(report.master_check.summary.items_without_data, 1);

        for file in [
            CONNECTIVITY_ITEMS_FILE,
            MASTER_ITEMS_FILE,
            ANALYSIS_RESULTS_FILE,
            MASTER_ITEMS_CHECK_FILE,
        ] {
            assert!(pipeline.store().contains(file), "{file} written");
        }
    }

    #[tokio::test]
    async fn test_template_connectivity_history_failure_aborts() {
        let host =
            Host::new("1", "web", "Web").with_template(TemplateLink::new("9", ICMP_TEMPLATE));

        let mut source = MockMonitoringSource::new();
        source
            .expect_hosts()
            .returning(move |_| Ok(vec![host.clone()]));
        source
            .expect_templates()
            .returning(|| Ok(vec![Template::new("9", ICMP_TEMPLATE)]));
        source.expect_host_items().returning(|_| {
            Ok(vec![TelemetryItem::new("11", "1", "icmpping", "ICMP ping")])
        });
        source
            .expect_history()
            .returning(|_| Err(ZabbixError::Timeout { timeout_ms: 30_000 }));

        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            source,
            icmp_catalog(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        );
        let result = pipeline.run(RunMode::TemplateConnectivity).await;

        assert!(matches!(result, Err(AppError::Zabbix(ZabbixError::Timeout { .. }))));
        assert!(!pipeline.store().contains(ANALYSIS_RESULTS_FILE));
    }

    #[tokio::test]
    async fn test_analyze_templates() {
        let mut source = MockMonitoringSource::new();
        source.expect_templates().returning(|| {
            Ok(vec![
                Template::new("9", ICMP_TEMPLATE),
                Template::new("10", "Template OS Linux"),
            ])
        });

        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            source,
            icmp_catalog(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        );
        pipeline.run(RunMode::AnalyzeTemplates).await.unwrap();

        let coverage: TemplateCoverage =
            pipeline.store().read_json(TEMPLATE_ANALYSIS_FILE).unwrap();
        assert_eq!(coverage.matched_templates, 1);
        assert_eq!(coverage.unconfigured, vec!["Template OS Linux".to_string()]);
    }

    #[tokio::test]
    async fn test_collect_writes_snapshot() {
        let mut source = MockMonitoringSource::new();
        source
            .expect_hosts()
            .withf(|filter| filter.host_groups == vec!["Routers".to_string()])
            .returning(|_| Ok(vec![Host::new("1", "r1", "Router 1")]));
        source
            .expect_templates()
            .returning(|| Ok(vec![Template::new("9", ICMP_TEMPLATE)]));
        source.expect_host_items().returning(|_| {
            Ok(vec![TelemetryItem::new("11", "1", "icmpping", "ICMP ping")])
        });
        source
            .expect_history()
            .withf(|req| req.limit_per_item == 10 && req.targets.len() == 1)
            .returning(|_| {
                let mut history = HistoryMap::new();
                history.insert("11".into(), vec![HistoryRecord::new("11", NOW, "1")]);
                Ok(history)
            });

        let dir = TempDir::new().unwrap();
        let settings = PipelineSettings {
            host_filter: HostFilter::groups(["Routers"]),
            ..PipelineSettings::default()
        };
        let pipeline = Pipeline::new(
            source,
            TemplateCatalog::default(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        )
        .with_settings(settings);

        let snapshot = pipeline.collect().await.unwrap();
        assert_eq!(snapshot.items.len(), 1);
        assert!(pipeline.store().contains(HOSTS_FILE));
        let reloaded = Snapshot::load(pipeline.store()).unwrap();
        assert_eq!(reloaded, snapshot);
    }

    #[tokio::test]
    async fn test_host_failure_propagates() {
        let mut source = MockMonitoringSource::new();
        source.expect_hosts().returning(|_| {
            Err(ZabbixError::AuthenticationFailed {
                message: "expired".into(),
            })
        });

        let dir = TempDir::new().unwrap();
        let pipeline = Pipeline::new(
            source,
            TemplateCatalog::default(),
            ReportStore::new(dir.path()),
            fixed_clock(),
        );
        let result = pipeline.run(RunMode::TagConnectivity).await;
        assert!(matches!(
            result,
            Err(AppError::Zabbix(ZabbixError::AuthenticationFailed { .. }))
        ));
    }
}
