//! Template rule catalog.
//!
//! The catalog maps monitoring-template names to the item rules that mark
//! connection checks and master (heartbeat) items, plus optional threshold
//! overrides. It is loaded once from YAML at startup and read-only after:
//!
//! ```yaml
//! templates:
//!   - name: "Template Net ICMP Ping"
//!     connection_check_items:
//!       - key: "icmpping"
//!         required: true
//!         priority: high
//!     master_items:
//!       - key: "agent.ping"
//! thresholds:
//!   inactive_threshold: 7200
//! ```
//!
//! Rule patterns are compiled once at load. A pattern that does not compile
//! is a configuration error.

mod coverage;
mod pattern;
mod thresholds;

pub use coverage::{analyze_templates, ConfiguredTemplate, TemplateCoverage};
pub use pattern::GlobPattern;
pub use thresholds::{
    ThresholdOverrides, Thresholds, DEFAULT_INACTIVE_THRESHOLD, DEFAULT_MASTER_ITEM_THRESHOLD,
    DEFAULT_MAX_DATA_AGE, DEFAULT_MIN_CONNECTIVITY_SCORE,
};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{Host, TelemetryItem};

/// Importance of a rule. Lower level means more important.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    /// Level 1.
    High,
    /// Level 2. Also used for unrecognised values.
    #[default]
    Medium,
    /// Level 3.
    Low,
}

impl Priority {
    /// Numeric level (high=1, medium=2, low=3).
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Scoring weight, `1 / level`.
    #[must_use]
    pub fn weight(self) -> f64 {
        1.0 / f64::from(self.level())
    }

    /// Lowercase name as written in rule files and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled key/name matcher for one rule.
///
/// A candidate matches when the rule key is non-empty and the candidate key
/// equals it case-insensitively or matches it as a glob; or when the rule
/// name is non-empty and is a case-insensitive substring of the candidate
/// name or matches it as a glob.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemMatcher {
    key: Option<(String, GlobPattern)>,
    name: Option<(String, GlobPattern)>,
}

impl ItemMatcher {
    /// Compile a matcher. Empty strings disable that half of the rule.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if either pattern is malformed.
    pub fn new(key: &str, name: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            key: compile(key)?,
            name: compile(name)?,
        })
    }

    /// Whether `item` satisfies the rule.
    #[must_use]
    pub fn matches(&self, item: &TelemetryItem) -> bool {
        if let Some((key, glob)) = &self.key {
            let candidate = item.key.to_lowercase();
            if candidate == *key || glob.is_match(&candidate) {
                return true;
            }
        }
        if let Some((name, glob)) = &self.name {
            let candidate = item.name.to_lowercase();
            if candidate.contains(name.as_str()) || glob.is_match(&candidate) {
                return true;
            }
        }
        false
    }
}

fn compile(raw: &str) -> Result<Option<(String, GlobPattern)>, regex::Error> {
    if raw.is_empty() {
        return Ok(None);
    }
    let lowered = raw.to_lowercase();
    let glob = GlobPattern::new(&lowered)?;
    Ok(Some((lowered, glob)))
}

/// Rule marking an item as a connection check.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionCheckRule {
    /// Item key, possibly a glob.
    pub key: String,
    /// Item name pattern, possibly empty.
    pub name: String,
    /// Whether a missing or stale item is an error rather than a warning.
    pub required: bool,
    /// Importance.
    pub priority: Priority,
    /// Whether the item comes from a low-level discovery rule.
    pub is_discovery: bool,
    /// Free-text note about the discovery rule.
    pub discovery_rule_note: Option<String>,
    matcher: ItemMatcher,
}

impl ConnectionCheckRule {
    /// Build a rule with no discovery metadata.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if `key` or `name` is a malformed glob.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        required: bool,
        priority: Priority,
    ) -> Result<Self, regex::Error> {
        let key = key.into();
        let name = name.into();
        let matcher = ItemMatcher::new(&key, &name)?;
        Ok(Self {
            key,
            name,
            required,
            priority,
            is_discovery: false,
            discovery_rule_note: None,
            matcher,
        })
    }

    /// Mark the rule as coming from a discovery rule.
    #[must_use]
    pub fn with_discovery(mut self, note: Option<String>) -> Self {
        self.is_discovery = true;
        self.discovery_rule_note = note;
        self
    }

    /// Whether `item` satisfies the rule.
    #[must_use]
    pub fn matches(&self, item: &TelemetryItem) -> bool {
        self.matcher.matches(item)
    }
}

/// Rule marking an item as a master (heartbeat) item.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterItemRule {
    /// Item key, possibly a glob. Rules with an empty key never match.
    pub key: String,
    /// Item name pattern, possibly empty.
    pub name: String,
    /// Whether a stale item is an error rather than a warning.
    pub required: bool,
    /// Importance.
    pub priority: Priority,
    matcher: ItemMatcher,
}

impl MasterItemRule {
    /// Build a master rule.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if `key` or `name` is a malformed glob.
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        required: bool,
        priority: Priority,
    ) -> Result<Self, regex::Error> {
        let key = key.into();
        let name = name.into();
        let matcher = ItemMatcher::new(&key, &name)?;
        Ok(Self {
            key,
            name,
            required,
            priority,
            matcher,
        })
    }

    /// Whether the rule takes part in matching at all.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.key.is_empty()
    }

    /// Whether `item` satisfies the rule.
    #[must_use]
    pub fn matches(&self, item: &TelemetryItem) -> bool {
        self.is_active() && self.matcher.matches(item)
    }
}

/// Rules for one monitoring template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRule {
    /// Template name, matched exactly and case-sensitively.
    pub name: String,
    /// Connection-check rules, in file order.
    pub connection_check_items: Vec<ConnectionCheckRule>,
    /// Master-item rules, in file order.
    pub master_items: Vec<MasterItemRule>,
}

impl TemplateRule {
    /// Create an empty rule set for a template.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connection_check_items: Vec::new(),
            master_items: Vec::new(),
        }
    }

    /// Add a connection-check rule.
    #[must_use]
    pub fn with_connection_check(mut self, rule: ConnectionCheckRule) -> Self {
        self.connection_check_items.push(rule);
        self
    }

    /// Add a master-item rule.
    #[must_use]
    pub fn with_master_item(mut self, rule: MasterItemRule) -> Self {
        self.master_items.push(rule);
        self
    }
}

// ============================================================================
// File format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    templates: Vec<RawTemplate>,
    #[serde(default)]
    thresholds: ThresholdOverrides,
}

#[derive(Debug, Deserialize)]
struct RawTemplate {
    name: String,
    #[serde(default)]
    connection_check_items: Vec<RawConnectionCheck>,
    #[serde(default)]
    master_items: Vec<RawMasterItem>,
}

#[derive(Debug, Deserialize)]
struct RawConnectionCheck {
    #[serde(default)]
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    is_discovery: bool,
    #[serde(default)]
    discovery_rule_note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawMasterItem {
    #[serde(default)]
    key: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    priority: Priority,
}

/// Loaded template rules and thresholds. The default is an empty catalog
/// with built-in thresholds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateCatalog {
    templates: Vec<TemplateRule>,
    thresholds: Thresholds,
}

impl TemplateCatalog {
    /// Build a catalog from rules already in memory.
    #[must_use]
    pub fn new(templates: Vec<TemplateRule>, thresholds: Thresholds) -> Self {
        Self {
            templates,
            thresholds,
        }
    }

    /// Load a catalog from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RulesUnreadable`] if the file cannot be read and
    /// [`ConfigError::RulesInvalid`] if it cannot be parsed or a pattern does
    /// not compile.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::RulesUnreadable {
            path: label.clone(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_yaml(&text, &label)?;
        tracing::info!(
            path = %label,
            template_count = catalog.templates.len(),
            "Loaded template mapping"
        );
        Ok(catalog)
    }

    /// Parse a catalog from YAML text. `label` names the source in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::RulesInvalid`] on malformed YAML or patterns.
    pub fn from_yaml(text: &str, label: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::RulesInvalid {
            path: label.to_string(),
            message,
        };

        let raw: RawCatalog = serde_yaml::from_str(text).map_err(|e| invalid(e.to_string()))?;

        let mut templates = Vec::with_capacity(raw.templates.len());
        for (t_idx, template) in raw.templates.into_iter().enumerate() {
            let mut rule = TemplateRule::new(template.name);
            for (i, item) in template.connection_check_items.into_iter().enumerate() {
                let mut check =
                    ConnectionCheckRule::new(item.key, item.name, item.required, item.priority)
                        .map_err(|e| {
                            invalid(format!(
                                "templates[{t_idx}].connection_check_items[{i}]: {e}"
                            ))
                        })?;
                check.is_discovery = item.is_discovery;
                check.discovery_rule_note = item.discovery_rule_note;
                rule.connection_check_items.push(check);
            }
            for (i, item) in template.master_items.into_iter().enumerate() {
                let master = MasterItemRule::new(item.key, item.name, item.required, item.priority)
                    .map_err(|e| invalid(format!("templates[{t_idx}].master_items[{i}]: {e}")))?;
                rule.master_items.push(master);
            }
            templates.push(rule);
        }

        Ok(Self {
            templates,
            thresholds: Thresholds::default().with_overrides(&raw.thresholds),
        })
    }

    /// Apply environment-level threshold overrides on top of the file's.
    #[must_use]
    pub fn with_threshold_overrides(mut self, overrides: &ThresholdOverrides) -> Self {
        self.thresholds = self.thresholds.with_overrides(overrides);
        self
    }

    /// Rules for a template name. Exact, case-sensitive; the first entry wins
    /// when a name is listed twice.
    #[must_use]
    pub fn get_template_by_name(&self, name: &str) -> Option<&TemplateRule> {
        self.templates.iter().find(|t| t.name == name)
    }

    /// All template rules, in file order.
    #[must_use]
    pub fn templates(&self) -> &[TemplateRule] {
        &self.templates
    }

    /// Merged thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Rules for every template linked to `host` that has configuration.
    #[must_use]
    pub fn configs_for_host<'a>(&'a self, host: &Host) -> Vec<&'a TemplateRule> {
        host.parent_templates
            .iter()
            .filter_map(|link| self.get_template_by_name(&link.name))
            .collect()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::model::TemplateLink;
    use std::io::Write;

    const SAMPLE: &str = r#"
templates:
  - name: "Template Net ICMP Ping"
    connection_check_items:
      - key: "icmpping"
        required: true
        priority: high
      - key: "icmppingloss"
        name: "ICMP loss"
        priority: low
        is_discovery: true
        discovery_rule_note: "from net.if.discovery"
    master_items:
      - key: "agent.ping"
        required: true
      - key: ""
        name: "ignored"
  - name: "Template SNMP Device"
    connection_check_items:
      - key: "snmp*"
        priority: urgent
thresholds:
  inactive_threshold: 600
"#;

    fn item(key: &str, name: &str) -> TelemetryItem {
        TelemetryItem::new("1", "10", key, name)
    }

    #[test]
    fn test_priority_levels_and_weights() {
        assert_eq!(Priority::High.level(), 1);
        assert_eq!(Priority::Medium.level(), 2);
        assert_eq!(Priority::Low.level(), 3);
        assert_eq!(Priority::High.weight(), 1.0);
        assert_eq!(Priority::Medium.weight(), 0.5);
        assert!((Priority::Low.weight() - 1.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_priority_is_medium() {
        assert_eq!(Priority::from("urgent".to_string()), Priority::Medium);
        assert_eq!(Priority::from("HIGH".to_string()), Priority::High);
        let p: Priority = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(p, Priority::Medium);
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"low\"");
    }

    #[test]
    fn test_key_match_is_case_insensitive() {
        let m = ItemMatcher::new("icmp*", "").unwrap();
        assert!(m.matches(&item("icmpping", "")));
        assert!(m.matches(&item("ICMPPING", "")));
        assert!(!m.matches(&item("snmp.ping", "")));
    }

    #[test]
    fn test_exact_key_with_brackets_matches_by_equality() {
        // the glob reads `[,,,]` as a class; equality still matches
        let m = ItemMatcher::new("icmpping[,,,]", "").unwrap();
        assert!(m.matches(&item("ICMPPING[,,,]", "")));
    }

    #[test]
    fn test_name_substring_and_glob() {
        let m = ItemMatcher::new("", "ICMP").unwrap();
        assert!(m.matches(&item("x", "Host icmp ping")));
        assert!(!m.matches(&item("icmpping", "Agent ping")));

        let g = ItemMatcher::new("", "*availability").unwrap();
        assert!(g.matches(&item("x", "Zabbix agent availability")));
    }

    #[test]
    fn test_empty_matcher_never_matches() {
        let m = ItemMatcher::new("", "").unwrap();
        assert!(!m.matches(&item("", "")));
        assert!(!m.matches(&item("icmpping", "ICMP ping")));
    }

    #[test]
    fn test_master_rule_with_empty_key_is_inactive() {
        let rule = MasterItemRule::new("", "agent", false, Priority::Medium).unwrap();
        assert!(!rule.is_active());
        assert!(!rule.matches(&item("agent.ping", "agent ping")));
    }

    #[test]
    fn test_from_yaml_parses_rules_and_defaults() {
        let catalog = TemplateCatalog::from_yaml(SAMPLE, "sample.yml").unwrap();
        assert_eq!(catalog.templates().len(), 2);

        let icmp = catalog
            .get_template_by_name("Template Net ICMP Ping")
            .unwrap();
        assert_eq!(icmp.connection_check_items.len(), 2);
        let first = &icmp.connection_check_items[0];
        assert!(first.required);
        assert_eq!(first.priority, Priority::High);
        assert!(!first.is_discovery);
        let second = &icmp.connection_check_items[1];
        assert!(!second.required);
        assert_eq!(second.priority, Priority::Low);
        assert!(second.is_discovery);
        assert_eq!(
            second.discovery_rule_note.as_deref(),
            Some("from net.if.discovery")
        );
        assert_eq!(icmp.master_items.len(), 2);
        assert_eq!(icmp.master_items[0].priority, Priority::Medium);

        let snmp = catalog.get_template_by_name("Template SNMP Device").unwrap();
        assert_eq!(snmp.connection_check_items[0].priority, Priority::Medium);
    }

    #[test]
    fn test_thresholds_merge_file_over_defaults() {
        let catalog = TemplateCatalog::from_yaml(SAMPLE, "sample.yml").unwrap();
        assert_eq!(catalog.thresholds().inactive_threshold, 600);
        assert_eq!(
            catalog.thresholds().master_item_threshold,
            DEFAULT_MASTER_ITEM_THRESHOLD
        );

        let env = ThresholdOverrides {
            inactive_threshold: Some(1200),
            ..ThresholdOverrides::default()
        };
        let catalog = catalog.with_threshold_overrides(&env);
        assert_eq!(catalog.thresholds().inactive_threshold, 1200);
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        let catalog = TemplateCatalog::from_yaml(SAMPLE, "sample.yml").unwrap();
        assert!(catalog
            .get_template_by_name("template net icmp ping")
            .is_none());
        assert!(catalog.get_template_by_name("Template Net ICMP").is_none());
    }

    #[test]
    fn test_duplicate_template_first_wins() {
        let yaml = r#"
templates:
  - name: "T"
    connection_check_items: [{ key: "first" }]
  - name: "T"
    connection_check_items: [{ key: "second" }]
"#;
        let catalog = TemplateCatalog::from_yaml(yaml, "dup.yml").unwrap();
        let t = catalog.get_template_by_name("T").unwrap();
        assert_eq!(t.connection_check_items[0].key, "first");
    }

    #[test]
    fn test_invalid_yaml_is_rules_invalid() {
        let err = TemplateCatalog::from_yaml("templates: [ {", "bad.yml").unwrap_err();
        assert!(matches!(err, ConfigError::RulesInvalid { ref path, .. } if path == "bad.yml"));
    }

    #[test]
    fn test_bad_pattern_reports_position() {
        let yaml = r#"
templates:
  - name: "T"
    connection_check_items: [{ key: "[z-a]" }]
"#;
        let err = TemplateCatalog::from_yaml(yaml, "bad.yml").unwrap_err();
        match err {
            ConfigError::RulesInvalid { message, .. } => {
                assert!(message.starts_with("templates[0].connection_check_items[0]"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_document_yields_empty_catalog() {
        let catalog = TemplateCatalog::from_yaml("{}", "empty.yml").unwrap();
        assert!(catalog.templates().is_empty());
        assert_eq!(*catalog.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = TemplateCatalog::from_path("/nonexistent/templates.yml").unwrap_err();
        assert!(matches!(err, ConfigError::RulesUnreadable { .. }));
    }

    #[test]
    fn test_from_path_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let catalog = TemplateCatalog::from_path(file.path()).unwrap();
        assert_eq!(catalog.templates().len(), 2);
    }

    #[test]
    fn test_configs_for_host_skips_unconfigured() {
        let catalog = TemplateCatalog::from_yaml(SAMPLE, "sample.yml").unwrap();
        let host = Host::new("10", "srv", "Server")
            .with_template(TemplateLink::new("1", "Template Net ICMP Ping"))
            .with_template(TemplateLink::new("2", "Template OS Linux"));
        let configs = catalog.configs_for_host(&host);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].name, "Template Net ICMP Ping");
    }
}
