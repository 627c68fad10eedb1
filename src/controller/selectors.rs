//! # Selector Construction
//!
//! Builds the pod/service/rule/probe monitor selectors for the Prometheus
//! spec. Self-contained resources may override any selector directly;
//! otherwise label selectors match resources labeled with a contributing
//! index id and namespace selectors stay open.

use crate::crd::{Observability, RepositoryIndex};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};

/// Label carried by monitors and rules contributed by a tenant
const APP_LABEL: &str = "app";

fn index_label_selector(indexes: &[RepositoryIndex]) -> LabelSelector {
    if indexes.is_empty() {
        return LabelSelector::default();
    }
    LabelSelector {
        match_expressions: Some(vec![LabelSelectorRequirement {
            key: APP_LABEL.to_string(),
            operator: "In".to_string(),
            values: Some(indexes.iter().map(|i| i.id.clone()).collect()),
        }]),
        ..LabelSelector::default()
    }
}

fn override_or_index(
    override_selector: Option<&LabelSelector>,
    indexes: &[RepositoryIndex],
) -> LabelSelector {
    override_selector
        .cloned()
        .unwrap_or_else(|| index_label_selector(indexes))
}

fn override_or_open(override_selector: Option<&LabelSelector>) -> LabelSelector {
    override_selector.cloned().unwrap_or_default()
}

fn self_contained<'a>(
    cr: &'a Observability,
) -> Option<&'a crate::crd::SelfContained> {
    cr.spec.self_contained.as_ref()
}

pub fn pod_monitor_label_selector(
    cr: &Observability,
    indexes: &[RepositoryIndex],
) -> LabelSelector {
    override_or_index(
        self_contained(cr).and_then(|sc| sc.pod_monitor_label_selector.as_ref()),
        indexes,
    )
}

pub fn pod_monitor_namespace_selector(cr: &Observability) -> LabelSelector {
    override_or_open(self_contained(cr).and_then(|sc| sc.pod_monitor_namespace_selector.as_ref()))
}

pub fn service_monitor_label_selector(
    cr: &Observability,
    indexes: &[RepositoryIndex],
) -> LabelSelector {
    override_or_index(
        self_contained(cr).and_then(|sc| sc.service_monitor_label_selector.as_ref()),
        indexes,
    )
}

pub fn service_monitor_namespace_selector(cr: &Observability) -> LabelSelector {
    override_or_open(
        self_contained(cr).and_then(|sc| sc.service_monitor_namespace_selector.as_ref()),
    )
}

pub fn rule_label_selector(cr: &Observability, indexes: &[RepositoryIndex]) -> LabelSelector {
    override_or_index(
        self_contained(cr).and_then(|sc| sc.rule_label_selector.as_ref()),
        indexes,
    )
}

pub fn rule_namespace_selector(cr: &Observability) -> LabelSelector {
    override_or_open(self_contained(cr).and_then(|sc| sc.rule_namespace_selector.as_ref()))
}

pub fn probe_label_selector(cr: &Observability, indexes: &[RepositoryIndex]) -> LabelSelector {
    override_or_index(
        self_contained(cr).and_then(|sc| sc.probe_label_selector.as_ref()),
        indexes,
    )
}

pub fn probe_namespace_selector(cr: &Observability) -> LabelSelector {
    override_or_open(self_contained(cr).and_then(|sc| sc.probe_namespace_selector.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ObservabilitySpec, SelfContained};

    fn index(id: &str) -> RepositoryIndex {
        RepositoryIndex {
            id: id.to_string(),
            base_url: "https://example.com".to_string(),
            ..RepositoryIndex::default()
        }
    }

    #[test]
    fn label_selector_matches_contributing_index_ids() {
        let cr = Observability::new("o", ObservabilitySpec::default());
        let selector = pod_monitor_label_selector(&cr, &[index("a"), index("b")]);
        let expr = &selector.match_expressions.unwrap()[0];
        assert_eq!(expr.key, "app");
        assert_eq!(expr.operator, "In");
        assert_eq!(
            expr.values.as_ref().unwrap(),
            &vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn self_contained_override_wins() {
        let mut override_selector = LabelSelector::default();
        override_selector.match_labels = Some(
            [("team".to_string(), "sre".to_string())]
                .into_iter()
                .collect(),
        );
        let cr = Observability::new(
            "o",
            ObservabilitySpec {
                self_contained: Some(SelfContained {
                    pod_monitor_label_selector: Some(override_selector.clone()),
                    ..SelfContained::default()
                }),
                ..ObservabilitySpec::default()
            },
        );
        assert_eq!(
            pod_monitor_label_selector(&cr, &[index("a")]),
            override_selector
        );
    }

    #[test]
    fn namespace_selectors_default_open() {
        let cr = Observability::new("o", ObservabilitySpec::default());
        assert_eq!(pod_monitor_namespace_selector(&cr), LabelSelector::default());
        assert_eq!(rule_namespace_selector(&cr), LabelSelector::default());
    }
}
