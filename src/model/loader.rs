//! Data Loader
//!
//! This module fetches the CGM export, mirrors the raw bytes to a local
//! cache file and parses them into a [`Dataset`]. The parsed dataset is
//! memoized for the lifetime of the cache object so repeated dashboard
//! renders reuse one download; `invalidate` is the explicit reset hook.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use thiserror::Error;

use crate::core::constants::FETCH_TIMEOUT;
use crate::model::dataset::Dataset;

/// Errors of the loading pipeline. All of them are fatal for the render;
/// there is no retry and no fallback data source.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The HTTP request failed or returned a non-2xx status.
    #[error("download failed: {0}")]
    Network(String),

    /// The local copy of the raw bytes could not be written.
    #[error("failed to write local copy: {0}")]
    Storage(#[from] std::io::Error),

    /// The payload is not well-formed CSV.
    #[error("malformed CSV: {0}")]
    Parse(String),

    /// An expected column is missing from the header row.
    #[error("missing expected column '{0}'")]
    Schema(String),
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Parse(err.to_string())
    }
}

/// Source of the raw export bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetches the raw bytes of the export.
    async fn fetch(&self) -> Result<Vec<u8>, LoadError>;
}

/// `DataSource` backed by an HTTP GET against a fixed URL.
pub struct HttpSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSource {
    /// Creates a source for the given URL with an explicit request timeout.
    pub fn new(url: &str) -> Result<Self, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| LoadError::Network(e.to_string()))?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl DataSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>, LoadError> {
        debug!("fetching CGM export from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| LoadError::Network(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| LoadError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Memoizing wrapper around a [`DataSource`].
///
/// The first `get_or_load` fetches, mirrors the bytes to the cache file and
/// parses; later calls return the shared parsed dataset until `invalidate`
/// is called.
pub struct DatasetCache {
    cache_path: PathBuf,
    dataset: Option<Arc<Dataset>>,
}

impl DatasetCache {
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            dataset: None,
        }
    }

    /// Drops the memoized dataset so the next load fetches again.
    pub fn invalidate(&mut self) {
        self.dataset = None;
    }

    /// Returns the memoized dataset, loading it on the first call.
    pub async fn get_or_load(&mut self, source: &dyn DataSource) -> Result<Arc<Dataset>, LoadError> {
        if let Some(dataset) = &self.dataset {
            debug!("reusing memoized dataset ({} readings)", dataset.len());
            return Ok(dataset.clone());
        }

        let bytes = source.fetch().await?;
        // Mirror of the last download, kept for inspection only.
        tokio::fs::write(&self.cache_path, &bytes).await?;
        let dataset = Arc::new(Dataset::from_csv(&bytes)?);
        info!(
            "loaded {} readings ({} bytes) into the session cache",
            dataset.len(),
            bytes.len()
        );
        self.dataset = Some(dataset.clone());
        Ok(dataset)
    }
}
