//! Shared fixtures.

#![allow(clippy::expect_used)]

use chrono::{DateTime, Utc};
use std::path::Path;
use zabbix_monitoring::model::{Host, HistoryRecord, ItemTag, TelemetryItem};
use zabbix_monitoring::pipeline::Pipeline;
use zabbix_monitoring::report::ReportStore;
use zabbix_monitoring::rules::TemplateCatalog;
use zabbix_monitoring::traits::{MonitoringSource, TimeProvider};

/// Reference "now" for every test.
pub const NOW: i64 = 1_700_000_000;

/// Clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl TimeProvider for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).expect("valid timestamp")
    }
}

/// One sample per minute going back from [`NOW`], newest first.
pub fn samples(itemid: &str, values: &[&str]) -> Vec<HistoryRecord> {
    values
        .iter()
        .zip(0..)
        .map(|(v, i)| HistoryRecord::new(itemid, NOW - i * 60, *v))
        .collect()
}

/// An ICMP item carrying the connection tag.
pub fn tagged_item(itemid: &str, host: &Host) -> TelemetryItem {
    TelemetryItem::new(itemid, &host.hostid, "icmpping", format!("ICMP ping {itemid}"))
        .with_tag(ItemTag::bare("Connection Status"))
}

/// A pipeline over `source` writing into `dir`, clocked at [`NOW`].
pub fn pipeline<S: MonitoringSource>(
    source: S,
    catalog: TemplateCatalog,
    dir: &Path,
) -> Pipeline<S, FixedClock> {
    Pipeline::new(source, catalog, ReportStore::new(dir), FixedClock(NOW))
}
