//! Collected snapshots and offline replay.
//!
//! A [`Snapshot`] is what the `collect` mode writes: hosts, templates,
//! items and history as four JSON files. [`SnapshotSource`] reads them
//! back and serves them through [`MonitoringSource`], so every analysis
//! mode can run without a live API.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, ZabbixError};
use crate::model::{HistoryMap, Host, HostRef, ItemStatus, Template, TelemetryItem};
use crate::report::{ReportStore, HISTORY_FILE, HOSTS_FILE, ITEMS_FILE, TEMPLATES_FILE};
use crate::traits::{HistoryRequest, HostFilter, MonitoringSource};

/// Everything collected in one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Snapshot {
    /// Enabled hosts.
    pub hosts: Vec<Host>,
    /// All templates.
    pub templates: Vec<Template>,
    /// Items of the hosts.
    pub items: Vec<TelemetryItem>,
    /// History keyed by item id.
    pub history: HistoryMap,
}

impl Snapshot {
    /// Write the four snapshot files.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if any file cannot be written.
    pub fn save(&self, store: &ReportStore) -> Result<(), ReportError> {
        store.write_json(HOSTS_FILE, &self.hosts)?;
        store.write_json(TEMPLATES_FILE, &self.templates)?;
        store.write_json(ITEMS_FILE, &self.items)?;
        store.write_json(HISTORY_FILE, &self.history)?;
        tracing::info!(
            host_count = self.hosts.len(),
            template_count = self.templates.len(),
            item_count = self.items.len(),
            history_items = self.history.len(),
            "Saved snapshot"
        );
        Ok(())
    }

    /// Read a snapshot. Hosts, templates and items are required; missing
    /// history is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::MissingInput`] for a missing required file,
    /// or another [`ReportError`] if a file cannot be read or parsed.
    pub fn load(store: &ReportStore) -> Result<Self, ReportError> {
        let snapshot = Self {
            hosts: store.read_json(HOSTS_FILE)?,
            templates: store.read_json(TEMPLATES_FILE)?,
            items: store.read_json(ITEMS_FILE)?,
            history: store.read_json_opt(HISTORY_FILE)?.unwrap_or_default(),
        };
        tracing::info!(
            root = %store.root().display(),
            host_count = snapshot.hosts.len(),
            item_count = snapshot.items.len(),
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}

/// Offline [`MonitoringSource`] over a loaded [`Snapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
    hosts_by_id: HashMap<String, HostRef>,
}

impl SnapshotSource {
    /// Serve an in-memory snapshot.
    #[must_use]
    pub fn new(snapshot: Snapshot) -> Self {
        let hosts_by_id = snapshot
            .hosts
            .iter()
            .map(|h| (h.hostid.clone(), h.to_ref()))
            .collect();
        Self {
            snapshot,
            hosts_by_id,
        }
    }

    /// Load the snapshot stored under `dir`.
    ///
    /// # Errors
    ///
    /// See [`Snapshot::load`].
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, ReportError> {
        let store = ReportStore::new(dir.as_ref());
        Ok(Self::new(Snapshot::load(&store)?))
    }

    /// The underlying snapshot.
    #[must_use]
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

#[async_trait]
impl MonitoringSource for SnapshotSource {
    async fn hosts(&self, filter: &HostFilter) -> Result<Vec<Host>, ZabbixError> {
        if !filter.host_groups.is_empty() {
            tracing::warn!(
                groups = ?filter.host_groups,
                "Snapshots carry no host groups, filter ignored"
            );
        }
        Ok(self.snapshot.hosts.clone())
    }

    async fn templates(&self) -> Result<Vec<Template>, ZabbixError> {
        Ok(self.snapshot.templates.clone())
    }

    async fn host_items(&self, hostids: &[String]) -> Result<Vec<TelemetryItem>, ZabbixError> {
        let wanted: HashSet<&str> = hostids.iter().map(String::as_str).collect();
        Ok(self
            .snapshot
            .items
            .iter()
            .filter(|i| wanted.contains(i.hostid.as_str()))
            .cloned()
            .collect())
    }

    async fn items_by_tag(
        &self,
        tag: &str,
        hostids: &[String],
    ) -> Result<Vec<TelemetryItem>, ZabbixError> {
        let wanted: HashSet<&str> = hostids.iter().map(String::as_str).collect();
        Ok(self
            .snapshot
            .items
            .iter()
            .filter(|i| wanted.contains(i.hostid.as_str()))
            .filter(|i| i.status == ItemStatus::Enabled && i.find_tag(tag).is_some())
            .map(|i| {
                let mut item = i.clone();
                if item.host.is_none() {
                    item.host = self.hosts_by_id.get(&item.hostid).cloned();
                }
                item
            })
            .collect())
    }

    /// Samples were windowed at collection time, so only the per-item
    /// limit is applied here.
    async fn history(&self, request: &HistoryRequest) -> Result<HistoryMap, ZabbixError> {
        let mut history = HistoryMap::new();
        for target in &request.targets {
            if let Some(records) = self.snapshot.history.get(&target.itemid) {
                let mut records = records.clone();
                records.sort_by(|a, b| b.clock.cmp(&a.clock));
                records.truncate(request.limit_per_item);
                history.insert(target.itemid.clone(), records);
            }
        }
        Ok(history)
    }
}
