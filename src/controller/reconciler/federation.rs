//! # Federation Aggregator
//!
//! Merges federation match patterns across all repository indexes into a
//! deduplicated, first-seen-ordered list. Any fetch or parse failure
//! aborts the whole aggregation: a partial pattern list would silently
//! drop federated metrics for some tenant.

use crate::controller::fetcher::IndexFetcher;
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{Observability, RepositoryIndex};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FederationPatterns {
    #[serde(rename = "match[]", default)]
    patterns: Vec<String>,
}

/// Aggregate federation patterns from every index that declares a
/// federation document. Each pattern is quoted and appended once,
/// preserving first-seen order.
///
/// Self-contained resources bypass fetching entirely and use the
/// patterns from the custom resource.
pub async fn fetch_federation_configs(
    fetcher: &dyn IndexFetcher,
    cr: &Observability,
    indexes: &[RepositoryIndex],
) -> Result<Vec<String>, ReconcilerError> {
    if cr.external_sync_disabled() {
        return Ok(cr.self_contained_federated_metrics());
    }

    let mut result: Vec<String> = Vec::new();
    for index in indexes {
        let Some(path) = index.prometheus().and_then(|p| p.federation.as_deref()) else {
            continue;
        };

        let url = format!("{}/{}", index.base_url, path);
        let bytes = fetcher
            .fetch(&url, index.tag.as_deref(), index.access_token.as_deref())
            .await?;
        let document: FederationPatterns = serde_yaml::from_slice(&bytes)?;

        for pattern in document.patterns {
            let quoted = format!("'{pattern}'");
            // Linear scan is fine, pattern counts are small
            if !result.contains(&quoted) {
                result.push(quoted);
            }
        }
    }

    Ok(result)
}
