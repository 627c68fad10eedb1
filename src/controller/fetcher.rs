//! # Index Document Fetcher
//!
//! Retrieves raw index documents from a tenant repository. The trait is
//! the seam between the reconciler and the network: production uses a
//! reqwest-backed client, tests substitute an in-memory map.
//!
//! The fetcher enforces a request timeout; the reconciler itself performs
//! no cancellation of its own.

use crate::constants;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("no document registered for {0}")]
    NotFound(String),
}

/// Contract for retrieving a byte blob for a URL, optional revision tag
/// and optional bearer token.
#[async_trait]
pub trait IndexFetcher: Send + Sync {
    async fn fetch(
        &self,
        url: &str,
        tag: Option<&str>,
        token: Option<&str>,
    ) -> Result<Vec<u8>, FetchError>;
}

/// Production fetcher backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpIndexFetcher {
    client: reqwest::Client,
}

impl HttpIndexFetcher {
    pub fn new() -> Result<Self, anyhow::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(constants::INDEX_FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(HttpIndexFetcher { client })
    }
}

#[async_trait]
impl IndexFetcher for HttpIndexFetcher {
    async fn fetch(
        &self,
        url: &str,
        tag: Option<&str>,
        token: Option<&str>,
    ) -> Result<Vec<u8>, FetchError> {
        debug!("fetching index document from {} (tag: {:?})", url, tag);

        let mut request = self.client.get(url);
        if let Some(tag) = tag {
            request = request.query(&[("ref", tag)]);
        }
        if let Some(token) = token {
            request = request.header("Authorization", format!("token {token}"));
        }

        let response = request.send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
pub mod testing {
    //! In-memory fetcher for unit tests

    use super::{FetchError, IndexFetcher};
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    pub struct StaticFetcher {
        documents: HashMap<String, Vec<u8>>,
    }

    impl StaticFetcher {
        pub fn with(mut self, url: &str, body: &str) -> Self {
            self.documents
                .insert(url.to_string(), body.as_bytes().to_vec());
            self
        }
    }

    #[async_trait]
    impl IndexFetcher for StaticFetcher {
        async fn fetch(
            &self,
            url: &str,
            _tag: Option<&str>,
            _token: Option<&str>,
        ) -> Result<Vec<u8>, FetchError> {
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotFound(url.to_string()))
        }
    }
}
