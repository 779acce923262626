//! Domain records for monitored hosts, their items and item history.
//!
//! These are validated snapshots of monitoring-system data. They are
//! produced at the boundary (see [`crate::zabbix`] and [`crate::snapshot`]),
//! never mutated by the analysis core, and discarded after a run.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a host as carried through classification and reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HostRef {
    /// Host identifier.
    pub hostid: String,
    /// Technical (machine) name.
    pub hostname: String,
    /// Visible display name.
    #[serde(rename = "host_name")]
    pub display_name: String,
}

impl HostRef {
    /// Create a host reference.
    #[must_use]
    pub fn new(
        hostid: impl Into<String>,
        hostname: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            hostid: hostid.into(),
            hostname: hostname.into(),
            display_name: display_name.into(),
        }
    }
}

/// A template linked to a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateLink {
    /// Template identifier.
    pub templateid: String,
    /// Template name, matched against rule configuration.
    pub name: String,
}

impl TemplateLink {
    /// Create a template link.
    #[must_use]
    pub fn new(templateid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            templateid: templateid.into(),
            name: name.into(),
        }
    }
}

/// A monitored endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Host {
    /// Host identifier.
    pub hostid: String,
    /// Technical (machine) name.
    pub host: String,
    /// Visible display name.
    pub name: String,
    /// Templates linked to this host.
    #[serde(default)]
    pub parent_templates: Vec<TemplateLink>,
}

impl Host {
    /// Create a host without linked templates.
    #[must_use]
    pub fn new(hostid: impl Into<String>, host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            hostid: hostid.into(),
            host: host.into(),
            name: name.into(),
            parent_templates: Vec::new(),
        }
    }

    /// Link a template.
    #[must_use]
    pub fn with_template(mut self, template: TemplateLink) -> Self {
        self.parent_templates.push(template);
        self
    }

    /// Reference to this host.
    #[must_use]
    pub fn to_ref(&self) -> HostRef {
        HostRef::new(&self.hostid, &self.host, &self.name)
    }
}

/// A template known to the monitoring system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    /// Template identifier.
    pub templateid: String,
    /// Template name.
    pub name: String,
}

impl Template {
    /// Create a template.
    #[must_use]
    pub fn new(templateid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            templateid: templateid.into(),
            name: name.into(),
        }
    }
}

/// A descriptive tag on an item. The value may be absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemTag {
    /// Tag name.
    pub tag: String,
    /// Tag value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ItemTag {
    /// Create a tag with a value.
    #[must_use]
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: Some(value.into()),
        }
    }

    /// Create a tag without a value.
    #[must_use]
    pub fn bare(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: None,
        }
    }

    /// Case-insensitive tag name comparison; the value is ignored.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.tag.to_lowercase() == name.to_lowercase()
    }
}

/// Kind of value an item stores. Selects the history table to query.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Numeric float.
    Float,
    /// Character string.
    Character,
    /// Log line.
    Log,
    /// Numeric unsigned (counters, ping results).
    #[default]
    Unsigned,
    /// Free text.
    Text,
    /// Binary blob.
    Binary,
}

impl ValueType {
    /// Parse the numeric wire code (`"0"`..`"5"`).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::Float),
            "1" => Some(Self::Character),
            "2" => Some(Self::Log),
            "3" => Some(Self::Unsigned),
            "4" => Some(Self::Text),
            "5" => Some(Self::Binary),
            _ => None,
        }
    }

    /// Numeric wire code used by `history.get`.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Float => 0,
            Self::Character => 1,
            Self::Log => 2,
            Self::Unsigned => 3,
            Self::Text => 4,
            Self::Binary => 5,
        }
    }
}

/// Whether an item is being collected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Collected.
    #[default]
    Enabled,
    /// Not collected.
    Disabled,
}

impl ItemStatus {
    /// Parse the numeric wire code (`"0"` enabled, `"1"` disabled).
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "0" => Some(Self::Enabled),
            "1" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// One monitored metric on one host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TelemetryItem {
    /// Item identifier.
    pub itemid: String,
    /// Owning host identifier.
    pub hostid: String,
    /// Identifier of the template this item is linked to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub templateid: Option<String>,
    /// Item key. Not unique per host.
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// Stored value kind.
    #[serde(default)]
    pub value_type: ValueType,
    /// Collection status.
    #[serde(default)]
    pub status: ItemStatus,
    /// Most recent raw value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastvalue: Option<String>,
    /// Unix timestamp of the most recent value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastclock: Option<i64>,
    /// Descriptive tags, in source order.
    #[serde(default)]
    pub tags: Vec<ItemTag>,
    /// Embedded owning host, when the source selected it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostRef>,
}

impl TelemetryItem {
    /// Create an enabled unsigned item with no tags.
    #[must_use]
    pub fn new(
        itemid: impl Into<String>,
        hostid: impl Into<String>,
        key: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            itemid: itemid.into(),
            hostid: hostid.into(),
            templateid: None,
            key: key.into(),
            name: name.into(),
            value_type: ValueType::default(),
            status: ItemStatus::default(),
            lastvalue: None,
            lastclock: None,
            tags: Vec::new(),
            host: None,
        }
    }

    /// Set the linked template identifier.
    #[must_use]
    pub fn with_templateid(mut self, templateid: impl Into<String>) -> Self {
        self.templateid = Some(templateid.into());
        self
    }

    /// Set the value type.
    #[must_use]
    pub const fn with_value_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }

    /// Set the status.
    #[must_use]
    pub const fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the last value and its timestamp.
    #[must_use]
    pub fn with_last(mut self, value: impl Into<String>, clock: i64) -> Self {
        self.lastvalue = Some(value.into());
        self.lastclock = Some(clock);
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: ItemTag) -> Self {
        self.tags.push(tag);
        self
    }

    /// Embed the owning host.
    #[must_use]
    pub fn with_host(mut self, host: HostRef) -> Self {
        self.hostid.clone_from(&host.hostid);
        self.host = Some(host);
        self
    }

    /// First tag whose name equals `name` case-insensitively.
    #[must_use]
    pub fn find_tag(&self, name: &str) -> Option<&ItemTag> {
        self.tags.iter().find(|t| t.is_named(name))
    }

    /// The owning host. Falls back to the bare host id when the source did
    /// not embed host details.
    #[must_use]
    pub fn owner(&self) -> HostRef {
        self.host
            .clone()
            .unwrap_or_else(|| HostRef::new(&self.hostid, "", ""))
    }
}

/// One `(value, timestamp)` sample of one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryRecord {
    /// Item the sample belongs to.
    pub itemid: String,
    /// Unix timestamp in seconds.
    pub clock: i64,
    /// Raw value as reported by the source.
    pub value: String,
}

impl HistoryRecord {
    /// Create a sample.
    #[must_use]
    pub fn new(itemid: impl Into<String>, clock: i64, value: impl Into<String>) -> Self {
        Self {
            itemid: itemid.into(),
            clock,
            value: value.into(),
        }
    }
}

/// History samples keyed by item id.
pub type HistoryMap = BTreeMap<String, Vec<HistoryRecord>>;

/// Group loose samples by item id, preserving arrival order per item.
#[must_use]
pub fn group_history(records: impl IntoIterator<Item = HistoryRecord>) -> HistoryMap {
    let mut grouped = HistoryMap::new();
    for record in records {
        grouped.entry(record.itemid.clone()).or_default().push(record);
    }
    grouped
}

/// Most recent sample by timestamp, regardless of input ordering.
#[must_use]
pub fn latest_record(records: &[HistoryRecord]) -> Option<&HistoryRecord> {
    records.iter().max_by_key(|r| r.clock)
}

/// Up to `limit` most recent samples, newest first.
#[must_use]
pub fn most_recent(records: &[HistoryRecord], limit: usize) -> Vec<&HistoryRecord> {
    let mut sorted: Vec<&HistoryRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.clock.cmp(&a.clock));
    sorted.truncate(limit);
    sorted
}
