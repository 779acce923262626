//! Which monitoring templates have rule configuration.

use serde::{Deserialize, Serialize};

use super::TemplateCatalog;
use crate::model::Template;

/// Rule counts for one configured template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfiguredTemplate {
    /// Template identifier.
    pub templateid: String,
    /// Template name.
    pub name: String,
    /// Number of connection-check rules.
    pub connection_check_items: usize,
    /// Number of master-item rules.
    pub master_items: usize,
}

/// Coverage of the monitoring system's templates by the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TemplateCoverage {
    /// Templates examined.
    pub total_templates: usize,
    /// Templates with configuration.
    pub matched_templates: usize,
    /// Templates without configuration.
    pub unmatched_templates: usize,
    /// Details of configured templates.
    pub configured: Vec<ConfiguredTemplate>,
    /// Names of templates without configuration.
    pub unconfigured: Vec<String>,
}

/// Compare the monitoring system's templates against the catalog.
#[must_use]
pub fn analyze_templates(catalog: &TemplateCatalog, templates: &[Template]) -> TemplateCoverage {
    let mut configured = Vec::new();
    let mut unconfigured = Vec::new();

    for template in templates {
        match catalog.get_template_by_name(&template.name) {
            Some(rule) => configured.push(ConfiguredTemplate {
                templateid: template.templateid.clone(),
                name: template.name.clone(),
                connection_check_items: rule.connection_check_items.len(),
                master_items: rule.master_items.len(),
            }),
            None => unconfigured.push(template.name.clone()),
        }
    }

    tracing::info!(
        total = templates.len(),
        matched = configured.len(),
        unmatched = unconfigured.len(),
        "Template coverage analyzed"
    );

    TemplateCoverage {
        total_templates: templates.len(),
        matched_templates: configured.len(),
        unmatched_templates: unconfigured.len(),
        configured,
        unconfigured,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rules::{ConnectionCheckRule, Priority, TemplateRule, Thresholds};

    #[test]
    fn test_analyze_templates_splits_matched_and_unmatched() {
        let catalog = TemplateCatalog::new(
            vec![TemplateRule::new("ICMP").with_connection_check(
                ConnectionCheckRule::new("icmpping", "", true, Priority::High).unwrap(),
            )],
            Thresholds::default(),
        );
        let templates = vec![
            Template::new("1", "ICMP"),
            Template::new("2", "Linux"),
            Template::new("3", "icmp"),
        ];

        let coverage = analyze_templates(&catalog, &templates);
        assert_eq!(coverage.total_templates, 3);
        assert_eq!(coverage.matched_templates, 1);
        assert_eq!(coverage.unmatched_templates, 2);
        assert_eq!(coverage.configured[0].connection_check_items, 1);
        assert_eq!(coverage.configured[0].master_items, 0);
        assert_eq!(coverage.unconfigured, vec!["Linux", "icmp"]);
    }

    #[test]
    fn test_analyze_templates_empty() {
        let catalog = TemplateCatalog::new(Vec::new(), Thresholds::default());
        let coverage = analyze_templates(&catalog, &[]);
        assert_eq!(coverage.total_templates, 0);
        assert!(coverage.configured.is_empty());
    }
}
