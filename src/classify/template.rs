//! Template-driven classification.
//!
//! For every (host, linked template) pair with configuration, each rule is
//! matched against the host's own items followed by the template's items.
//! The first candidate that satisfies the rule wins; a rule matches at most
//! once per pair.

use std::collections::HashMap;

use super::grouping::{group_by_host, group_by_template};
use super::types::ClassifiedItem;
use crate::model::{Host, Template, TelemetryItem};
use crate::rules::TemplateCatalog;

/// Classifies items using the template rule catalog.
#[derive(Debug, Clone, Copy)]
pub struct TemplateClassifier<'a> {
    catalog: &'a TemplateCatalog,
}

/// Items indexed for candidate lookup.
struct ItemIndex<'a> {
    by_host: HashMap<&'a str, Vec<&'a TelemetryItem>>,
    by_template: HashMap<&'a str, Vec<&'a TelemetryItem>>,
}

impl<'a> ItemIndex<'a> {
    fn new(items: &'a [TelemetryItem], templates: &[Template]) -> Self {
        Self {
            by_host: group_by_host(items),
            by_template: group_by_template(items, templates),
        }
    }

    fn host_items(&self, hostid: &str) -> &[&'a TelemetryItem] {
        self.by_host.get(hostid).map(Vec::as_slice).unwrap_or(&[])
    }

    fn template_items(&self, templateid: &str) -> &[&'a TelemetryItem] {
        self.by_template.get(templateid).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl<'a> TemplateClassifier<'a> {
    /// Create a classifier over `catalog`.
    #[must_use]
    pub const fn new(catalog: &'a TemplateCatalog) -> Self {
        Self { catalog }
    }

    /// Find items matching each connection-check rule.
    #[must_use]
    pub fn classify_connectivity_items(
        &self,
        hosts: &[Host],
        items: &[TelemetryItem],
        templates: &[Template],
    ) -> Vec<ClassifiedItem> {
        tracing::info!(host_count = hosts.len(), "Detecting connectivity items");
        let index = ItemIndex::new(items, templates);
        let mut classified = Vec::new();

        for host in hosts {
            let host_ref = host.to_ref();
            let host_items = index.host_items(&host.hostid);
            for link in &host.parent_templates {
                let Some(rule) = self.catalog.get_template_by_name(&link.name) else {
                    tracing::debug!(
                        hostid = %host.hostid,
                        template = %link.name,
                        "No configuration for template"
                    );
                    continue;
                };
                let template_items = index.template_items(&link.templateid);

                for check in &rule.connection_check_items {
                    if let Some(item) =
                        find_matching_item(host_items, template_items, |i| check.matches(i))
                    {
                        let mut entry = ClassifiedItem::from_match(
                            item,
                            &host_ref,
                            &link.name,
                            check.required,
                            check.priority,
                        );
                        entry.is_discovery = Some(check.is_discovery);
                        entry.discovery_rule_note.clone_from(&check.discovery_rule_note);
                        classified.push(entry);
                    }
                }
            }
        }

        tracing::info!(
            item_count = classified.len(),
            "Detected connectivity items"
        );
        classified
    }

    /// Find items matching each master-item rule. Rules with an empty key
    /// are skipped.
    #[must_use]
    pub fn classify_master_items(
        &self,
        hosts: &[Host],
        items: &[TelemetryItem],
        templates: &[Template],
    ) -> Vec<ClassifiedItem> {
        tracing::info!(host_count = hosts.len(), "Detecting master items");
        let index = ItemIndex::new(items, templates);
        let mut classified = Vec::new();

        for host in hosts {
            let host_ref = host.to_ref();
            let host_items = index.host_items(&host.hostid);
            for link in &host.parent_templates {
                let Some(rule) = self.catalog.get_template_by_name(&link.name) else {
                    continue;
                };
                let template_items = index.template_items(&link.templateid);

                for master in rule.master_items.iter().filter(|m| m.is_active()) {
                    if let Some(item) =
                        find_matching_item(host_items, template_items, |i| master.matches(i))
                    {
                        classified.push(ClassifiedItem::from_match(
                            item,
                            &host_ref,
                            &link.name,
                            master.required,
                            master.priority,
                        ));
                    }
                }
            }
        }

        tracing::info!(item_count = classified.len(), "Detected master items");
        classified
    }
}

/// First candidate satisfying `matches`, searching host items before
/// template items.
pub fn find_matching_item<'i, F>(
    host_items: &[&'i TelemetryItem],
    template_items: &[&'i TelemetryItem],
    matches: F,
) -> Option<&'i TelemetryItem>
where
    F: Fn(&TelemetryItem) -> bool,
{
    host_items
        .iter()
        .chain(template_items.iter())
        .copied()
        .find(|item| matches(item))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::model::TemplateLink;
    use crate::rules::{ConnectionCheckRule, MasterItemRule, Priority, TemplateRule, Thresholds};
    use pretty_assertions::assert_eq;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::new(
            vec![
                TemplateRule::new("Template Net ICMP Ping")
                    .with_connection_check(
                        ConnectionCheckRule::new("icmpping", "", true, Priority::High).unwrap(),
                    )
                    .with_connection_check(
                        ConnectionCheckRule::new("icmppingloss", "", false, Priority::Low)
                            .unwrap()
                            .with_discovery(Some("net discovery".into())),
                    )
                    .with_master_item(
                        MasterItemRule::new("agent.ping", "", true, Priority::High).unwrap(),
                    )
                    .with_master_item(
                        MasterItemRule::new("", "agent", false, Priority::Low).unwrap(),
                    ),
                TemplateRule::new("Template SNMP").with_connection_check(
                    ConnectionCheckRule::new("snmp*", "", false, Priority::Medium).unwrap(),
                ),
            ],
            Thresholds::default(),
        )
    }

    fn host(id: &str, templates: &[(&str, &str)]) -> Host {
        templates.iter().fold(
            Host::new(id, format!("srv-{id}"), format!("Server {id}")),
            |h, (tid, name)| h.with_template(TemplateLink::new(*tid, *name)),
        )
    }

    #[test]
    fn test_connectivity_match_carries_rule_metadata() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("500", "Template Net ICMP Ping")])];
        let items = vec![
            TelemetryItem::new("1", "10", "ICMPPING", "ICMP ping").with_last("1", 100),
            TelemetryItem::new("2", "10", "icmppingloss", "ICMP loss"),
            TelemetryItem::new("3", "10", "system.cpu", "CPU"),
        ];

        let classified = TemplateClassifier::new(&catalog).classify_connectivity_items(
            &hosts,
            &items,
            &[Template::new("500", "Template Net ICMP Ping")],
        );

        assert_eq!(classified.len(), 2);
        let first = &classified[0];
        assert_eq!(first.itemid, "1");
        assert_eq!(first.hostname, "srv-10");
        assert_eq!(first.template, "Template Net ICMP Ping");
        assert!(first.required);
        assert_eq!(first.priority, Priority::High);
        assert_eq!(first.is_discovery, Some(false));
        assert_eq!(first.lastclock, Some(100));

        let second = &classified[1];
        assert_eq!(second.itemid, "2");
        assert_eq!(second.is_discovery, Some(true));
        assert_eq!(second.discovery_rule_note.as_deref(), Some("net discovery"));
    }

    #[test]
    fn test_host_items_searched_before_template_items() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("500", "Template Net ICMP Ping")])];
        let items = vec![
            TelemetryItem::new("t1", "500", "icmpping", "template ping").with_templateid("500"),
            TelemetryItem::new("h1", "10", "icmpping", "host ping"),
        ];
        let classified = TemplateClassifier::new(&catalog).classify_connectivity_items(
            &hosts,
            &items,
            &[Template::new("500", "Template Net ICMP Ping")],
        );
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].itemid, "h1");
    }

    #[test]
    fn test_template_items_are_fallback_candidates() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("500", "Template Net ICMP Ping")])];
        let items = vec![
            TelemetryItem::new("t1", "500", "icmpping", "template ping").with_templateid("500")
        ];
        let classified = TemplateClassifier::new(&catalog).classify_connectivity_items(
            &hosts,
            &items,
            &[Template::new("500", "Template Net ICMP Ping")],
        );
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].itemid, "t1");
        assert_eq!(classified[0].hostid, "10");
    }

    #[test]
    fn test_one_match_per_rule_first_wins() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("600", "Template SNMP")])];
        let items = vec![
            TelemetryItem::new("1", "10", "snmp.uptime", "Uptime"),
            TelemetryItem::new("2", "10", "snmp.ping", "Ping"),
        ];
        let classified =
            TemplateClassifier::new(&catalog).classify_connectivity_items(&hosts, &items, &[]);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].itemid, "1");
    }

    #[test]
    fn test_unconfigured_template_is_skipped() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("700", "Template OS Linux")])];
        let items = vec![TelemetryItem::new("1", "10", "icmpping", "ping")];
        let classifier = TemplateClassifier::new(&catalog);
        assert!(classifier
            .classify_connectivity_items(&hosts, &items, &[])
            .is_empty());
        assert!(classifier
            .classify_master_items(&hosts, &items, &[])
            .is_empty());
    }

    #[test]
    fn test_master_items_skip_empty_key_rules() {
        let catalog = catalog();
        let hosts = vec![host("10", &[("500", "Template Net ICMP Ping")])];
        let items = vec![
            TelemetryItem::new("1", "10", "agent.ping", "Zabbix agent ping"),
            TelemetryItem::new("2", "10", "agent.version", "Zabbix agent version"),
        ];
        let classified =
            TemplateClassifier::new(&catalog).classify_master_items(&hosts, &items, &[]);
        assert_eq!(classified.len(), 1);
        assert_eq!(classified[0].itemid, "1");
        assert!(classified[0].required);
        assert_eq!(classified[0].is_discovery, None);
    }

    #[test]
    fn test_host_with_several_templates_contributes_per_template() {
        let catalog = catalog();
        let hosts = vec![host(
            "10",
            &[("500", "Template Net ICMP Ping"), ("600", "Template SNMP")],
        )];
        let items = vec![
            TelemetryItem::new("1", "10", "icmpping", "ping"),
            TelemetryItem::new("2", "10", "snmp.ping", "snmp"),
        ];
        let classified =
            TemplateClassifier::new(&catalog).classify_connectivity_items(&hosts, &items, &[]);
        let templates: Vec<&str> = classified.iter().map(|c| c.template.as_str()).collect();
        assert_eq!(templates, vec!["Template Net ICMP Ping", "Template SNMP"]);
    }

    #[test]
    fn test_find_matching_item_none() {
        let a = TelemetryItem::new("1", "10", "x", "x");
        assert!(find_matching_item(&[&a], &[], |i| i.key == "y").is_none());
    }
}
