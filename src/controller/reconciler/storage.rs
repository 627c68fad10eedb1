//! # Storage Resolution
//!
//! Decides whether this controller manages the Prometheus storage stanza
//! at all, and with what claim, before the desired spec is assembled.

use crate::controller::model;
use crate::controller::reconciler::types::ReconcilerError;
use crate::controller::reconciler::validation;
use crate::crd::{Observability, RepositoryIndex};
use crate::monitoring::{EmbeddedObjectMetadata, EmbeddedPersistentVolumeClaim, StorageSpec};
use k8s_openapi::api::core::v1::{PersistentVolumeClaimSpec, VolumeResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;

/// Outcome of storage resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageResolution {
    /// Leave any existing storage stanza alone
    Unmanaged,
    /// Write this storage stanza into the desired spec
    Specified(StorageSpec),
    /// An index requested a size that does not parse as a quantity
    Invalid { quantity: String, reason: String },
}

/// Resolve the storage stanza for the managed Prometheus.
///
/// A storage override on the custom resource always wins, even when
/// external sync is disabled. Otherwise the first index-declared size is
/// turned into a volume claim template.
pub fn resolve_storage(cr: &Observability, indexes: &[RepositoryIndex]) -> StorageResolution {
    if let Some(storage) = cr.spec.storage.as_ref().and_then(|s| s.prometheus.clone()) {
        return StorageResolution::Specified(storage);
    }

    if cr.external_sync_disabled() {
        return StorageResolution::Unmanaged;
    }

    let Some(size) = model::prometheus_storage_size(indexes) else {
        return StorageResolution::Unmanaged;
    };

    match validation::parse_storage_quantity(&size) {
        Ok(quantity) => StorageResolution::Specified(claim_for(quantity)),
        Err(ReconcilerError::InvalidStorageQuantity { quantity, reason }) => {
            StorageResolution::Invalid { quantity, reason }
        }
        Err(_) => StorageResolution::Invalid {
            quantity: size,
            reason: "unexpected validation failure".to_string(),
        },
    }
}

fn claim_for(quantity: Quantity) -> StorageSpec {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), quantity);

    StorageSpec {
        volume_claim_template: Some(EmbeddedPersistentVolumeClaim {
            metadata: Some(EmbeddedObjectMetadata {
                name: Some("managed-services".to_string()),
                ..EmbeddedObjectMetadata::default()
            }),
            spec: Some(PersistentVolumeClaimSpec {
                resources: Some(VolumeResourceRequirements {
                    requests: Some(requests),
                    ..VolumeResourceRequirements::default()
                }),
                ..PersistentVolumeClaimSpec::default()
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        ObservabilitySpec, PrometheusIndex, RepositoryConfig, SelfContained, Storage,
    };

    fn index_with_storage(size: Option<&str>) -> RepositoryIndex {
        RepositoryIndex {
            id: "a".to_string(),
            base_url: "https://repo".to_string(),
            config: Some(RepositoryConfig {
                prometheus: Some(PrometheusIndex {
                    storage_size: size.map(str::to_string),
                    ..PrometheusIndex::default()
                }),
                observatoria: vec![],
            }),
            ..RepositoryIndex::default()
        }
    }

    fn cr_with_override() -> Observability {
        Observability::new(
            "o",
            ObservabilitySpec {
                storage: Some(Storage {
                    prometheus: Some(StorageSpec::default()),
                }),
                ..ObservabilitySpec::default()
            },
        )
    }

    #[test]
    fn no_declared_size_means_unmanaged() {
        let cr = Observability::new("o", ObservabilitySpec::default());
        assert_eq!(
            resolve_storage(&cr, &[index_with_storage(None)]),
            StorageResolution::Unmanaged
        );
    }

    #[test]
    fn index_size_becomes_a_volume_claim() {
        let cr = Observability::new("o", ObservabilitySpec::default());
        let resolved = resolve_storage(&cr, &[index_with_storage(Some("50Gi"))]);

        let StorageResolution::Specified(storage) = resolved else {
            panic!("expected a storage spec");
        };
        let template = storage.volume_claim_template.unwrap();
        assert_eq!(
            template.metadata.unwrap().name.as_deref(),
            Some("managed-services")
        );
        let requests = template.spec.unwrap().resources.unwrap().requests.unwrap();
        assert_eq!(requests["storage"].0, "50Gi");
    }

    #[test]
    fn invalid_size_is_reported_not_applied() {
        let cr = Observability::new("o", ObservabilitySpec::default());
        let resolved = resolve_storage(&cr, &[index_with_storage(Some("50Gx"))]);
        assert!(matches!(
            resolved,
            StorageResolution::Invalid { quantity, .. } if quantity == "50Gx"
        ));
    }

    #[test]
    fn cr_override_wins_over_indexes() {
        let resolved = resolve_storage(&cr_with_override(), &[index_with_storage(Some("50Gi"))]);
        assert_eq!(
            resolved,
            StorageResolution::Specified(StorageSpec::default())
        );
    }

    #[test]
    fn cr_override_wins_even_when_sync_is_disabled() {
        let mut cr = cr_with_override();
        cr.spec.self_contained = Some(SelfContained::default());
        assert!(matches!(
            resolve_storage(&cr, &[]),
            StorageResolution::Specified(_)
        ));
    }

    #[test]
    fn sync_disabled_without_override_is_unmanaged() {
        let cr = Observability::new(
            "o",
            ObservabilitySpec {
                self_contained: Some(SelfContained::default()),
                ..ObservabilitySpec::default()
            },
        );
        assert_eq!(
            resolve_storage(&cr, &[index_with_storage(Some("50Gi"))]),
            StorageResolution::Unmanaged
        );
    }
}
