//! Tag-driven classification.
//!
//! No template configuration is involved: an item is a connectivity item
//! when any of its tags carries the designated name, compared
//! case-insensitively. The tag value is ignored, including when absent.

use std::collections::HashMap;

use super::types::{TagDetectionResult, TaggedHost, TaggedItem};
use crate::model::{HostRef, TelemetryItem};

/// Default connectivity tag name.
pub const DEFAULT_CONNECTION_TAG: &str = "connection status";

/// Partition every host seen in `items` by whether it owns a tagged item.
///
/// Hosts keep the order in which they first appear in `items`.
#[must_use]
pub fn detect_by_tag(items: &[TelemetryItem], connection_tag: &str) -> TagDetectionResult {
    tracing::info!(
        item_count = items.len(),
        tag = %connection_tag,
        "Detecting connectivity items by tag"
    );

    let mut hosts: Vec<HostRef> = Vec::new();
    let mut tagged: Vec<Vec<TaggedItem>> = Vec::new();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut total_connection_items = 0;

    for item in items {
        let owner = item.owner();
        let idx = match position.get(&owner.hostid) {
            Some(&idx) => idx,
            None => {
                let idx = hosts.len();
                position.insert(owner.hostid.clone(), idx);
                hosts.push(owner);
                tagged.push(Vec::new());
                idx
            }
        };

        if item.find_tag(connection_tag).is_some() {
            tagged[idx].push(TaggedItem::from(item));
            total_connection_items += 1;
        }
    }

    let total_hosts = hosts.len();
    let mut hosts_with_items = Vec::new();
    let mut hosts_without_items = Vec::new();
    for (host, items) in hosts.into_iter().zip(tagged) {
        if items.is_empty() {
            hosts_without_items.push(host);
        } else {
            hosts_with_items.push(TaggedHost { host, items });
        }
    }

    tracing::info!(
        total_hosts,
        total_connection_items,
        hosts_with_items = hosts_with_items.len(),
        hosts_without_items = hosts_without_items.len(),
        "Tag detection complete"
    );

    TagDetectionResult {
        total_hosts,
        total_connection_items,
        hosts_with_items,
        hosts_without_items,
    }
}
