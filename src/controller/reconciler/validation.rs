//! # Input Validation
//!
//! Grammars for the retention duration and storage quantity strings that
//! arrive from the custom resource and the repository indexes.

use crate::controller::reconciler::types::ReconcilerError;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use regex::Regex;
use std::sync::LazyLock;

static RETENTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+((ms)|y|w|d|h|m|s)$").expect("retention pattern must compile")
});

static QUANTITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+(\.[0-9]+)?(m|k|M|G|T|P|E|Ki|Mi|Gi|Ti|Pi|Ei)?$")
        .expect("quantity pattern must compile")
});

/// Retention for the time series database.
///
/// Anything that does not match the duration grammar silently falls back
/// to the injected default instead of failing the reconcile.
pub fn resolve_retention(requested: Option<&str>, default_retention: &str) -> String {
    match requested {
        Some(retention) if RETENTION_PATTERN.is_match(retention) => retention.to_string(),
        _ => default_retention.to_string(),
    }
}

/// Validate an index-provided storage size as a Kubernetes resource
/// quantity.
pub fn parse_storage_quantity(raw: &str) -> Result<Quantity, ReconcilerError> {
    if QUANTITY_PATTERN.is_match(raw) {
        Ok(Quantity(raw.to_string()))
    } else {
        Err(ReconcilerError::InvalidStorageQuantity {
            quantity: raw.to_string(),
            reason: "not a valid resource quantity".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_retention_passes_unchanged() {
        assert_eq!(resolve_retention(Some("45d"), "45d"), "45d");
        assert_eq!(resolve_retention(Some("90d"), "45d"), "90d");
        assert_eq!(resolve_retention(Some("500ms"), "45d"), "500ms");
        assert_eq!(resolve_retention(Some("2w"), "45d"), "2w");
    }

    #[test]
    fn invalid_retention_falls_back_to_default() {
        assert_eq!(resolve_retention(Some("45x"), "45d"), "45d");
        assert_eq!(resolve_retention(Some("d45"), "45d"), "45d");
        assert_eq!(resolve_retention(Some(""), "45d"), "45d");
        assert_eq!(resolve_retention(None, "45d"), "45d");
    }

    #[test]
    fn storage_quantities_validate() {
        assert!(parse_storage_quantity("50Gi").is_ok());
        assert!(parse_storage_quantity("250Mi").is_ok());
        assert!(parse_storage_quantity("1.5Ti").is_ok());
        assert!(parse_storage_quantity("1000").is_ok());

        assert!(parse_storage_quantity("50Gx").is_err());
        assert!(parse_storage_quantity("lots").is_err());
        assert!(parse_storage_quantity("").is_err());
    }
}
