//! Output records of the classifiers.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::model::{HostRef, ItemStatus, TelemetryItem, ValueType};
use crate::rules::Priority;

/// A telemetry item joined with the rule that matched it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifiedItem {
    /// Item identifier.
    pub itemid: String,
    /// Host the item was classified for.
    pub hostid: String,
    /// Technical name of that host.
    pub hostname: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Name of the template whose rule matched.
    pub template: String,
    /// Stored value kind.
    pub value_type: ValueType,
    /// Collection status.
    pub status: ItemStatus,
    /// Last value reported with the item.
    #[serde(default)]
    pub lastvalue: Option<String>,
    /// Timestamp of the last value.
    #[serde(default)]
    pub lastclock: Option<i64>,
    /// Rule's required flag.
    pub required: bool,
    /// Rule's priority.
    pub priority: Priority,
    /// Discovery flag; present for connection-check items only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_discovery: Option<bool>,
    /// Discovery note; connection-check items only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_rule_note: Option<String>,
}

impl ClassifiedItem {
    /// Join an item with rule metadata. Discovery fields stay empty.
    #[must_use]
    pub fn from_match(
        item: &TelemetryItem,
        host: &HostRef,
        template: &str,
        required: bool,
        priority: Priority,
    ) -> Self {
        Self {
            itemid: item.itemid.clone(),
            hostid: host.hostid.clone(),
            hostname: host.hostname.clone(),
            key: item.key.clone(),
            name: item.name.clone(),
            template: template.to_string(),
            value_type: item.value_type,
            status: item.status,
            lastvalue: item.lastvalue.clone(),
            lastclock: item.lastclock,
            required,
            priority,
            is_discovery: None,
            discovery_rule_note: None,
        }
    }
}

/// An item carrying the connectivity tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaggedItem {
    /// Item identifier.
    pub itemid: String,
    /// Item key.
    pub key: String,
    /// Item name.
    pub name: String,
    /// Stored value kind.
    #[serde(default)]
    pub value_type: ValueType,
    /// Last value reported with the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastvalue: Option<String>,
    /// Timestamp of the last value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastclock: Option<i64>,
}

impl From<&TelemetryItem> for TaggedItem {
    fn from(item: &TelemetryItem) -> Self {
        Self {
            itemid: item.itemid.clone(),
            key: item.key.clone(),
            name: item.name.clone(),
            value_type: item.value_type,
            lastvalue: item.lastvalue.clone(),
            lastclock: item.lastclock,
        }
    }
}

/// A host with at least one tagged item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaggedHost {
    /// Host identity.
    #[serde(flatten)]
    pub host: HostRef,
    /// Tagged items, in input order.
    pub items: Vec<TaggedItem>,
}

/// Partition of every host seen into hosts with and without tagged items.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagDetectionResult {
    /// Distinct hosts seen across all items.
    pub total_hosts: usize,
    /// Items carrying the tag.
    pub total_connection_items: usize,
    /// Hosts with one or more tagged items.
    pub hosts_with_items: Vec<TaggedHost>,
    /// Hosts with no tagged items.
    pub hosts_without_items: Vec<HostRef>,
}

impl TagDetectionResult {
    /// Add hosts that were queried but own no tagged item. Hosts already in
    /// either partition are left alone.
    pub fn include_hosts<'a>(&mut self, hosts: impl IntoIterator<Item = &'a HostRef>) {
        let mut known: HashSet<String> = self
            .hosts_with_items
            .iter()
            .map(|h| h.host.hostid.clone())
            .chain(self.hosts_without_items.iter().map(|h| h.hostid.clone()))
            .collect();
        for host in hosts {
            if known.insert(host.hostid.clone()) {
                self.hosts_without_items.push(host.clone());
                self.total_hosts += 1;
            }
        }
    }
}
