//! Grouping helpers shared by classifiers and scorers.

use std::collections::{HashMap, HashSet};

use crate::model::{Template, TelemetryItem};

/// Group references by a string key, keeping groups in order of first
/// appearance and members in input order.
pub fn group_ordered<'a, T, F>(items: &'a [T], key: F) -> Vec<(&'a str, Vec<&'a T>)>
where
    F: Fn(&'a T) -> &'a str,
{
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<(&'a str, Vec<&'a T>)> = Vec::new();
    for item in items {
        let k = key(item);
        match index.get(k) {
            Some(&pos) => groups[pos].1.push(item),
            None => {
                index.insert(k, groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Items keyed by owning host id.
#[must_use]
pub fn group_by_host(items: &[TelemetryItem]) -> HashMap<&str, Vec<&TelemetryItem>> {
    let mut grouped: HashMap<&str, Vec<&TelemetryItem>> = HashMap::new();
    for item in items {
        grouped.entry(item.hostid.as_str()).or_default().push(item);
    }
    grouped
}

/// Items keyed by linked template id, limited to the given templates.
#[must_use]
pub fn group_by_template<'a>(
    items: &'a [TelemetryItem],
    templates: &[Template],
) -> HashMap<&'a str, Vec<&'a TelemetryItem>> {
    let known: HashSet<&str> = templates.iter().map(|t| t.templateid.as_str()).collect();
    let mut grouped: HashMap<&'a str, Vec<&'a TelemetryItem>> = HashMap::new();
    for item in items {
        if let Some(tid) = item.templateid.as_deref() {
            if known.contains(tid) {
                grouped.entry(tid).or_default().push(item);
            }
        }
    }
    grouped
}
