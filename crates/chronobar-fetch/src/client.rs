//! HTTP client for downloading bi5 files.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chronobar_types::Symbol;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::HourSource;
use crate::url::{BASE_URL, tick_url};

/// Configuration for the download client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Idle connections kept per host; one per concurrent hour worker.
    pub pool_size: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// Base URL of the data feed.
    pub base_url: String,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            pool_size: 24,
            timeout: Duration::from_secs(60),
            base_url: BASE_URL.to_string(),
            user_agent: format!("chronobar/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Sets the base URL of the data feed.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Errors that can occur while fetching an hour.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status.
    #[error("Server error: {status}")]
    ServerError {
        /// HTTP status code.
        status: u16,
    },

    /// Reading a locally archived payload failed.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },
}

/// HTTP client with connection pooling.
///
/// Each hour is requested once; a failed hour is reported to the caller,
/// which treats it as an hour without ticks.
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: Client,
    config: ClientConfig,
}

impl DownloadClient {
    /// Creates a new download client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_size)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_defaults() -> Result<Self, reqwest::Error> {
        Self::new(ClientConfig::default())
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Downloads a single bi5 file, returning the compressed bytes.
    ///
    /// Returns `Ok(None)` if the file does not exist (404).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server answers with an
    /// error status.
    pub async fn download(&self, url: &str) -> Result<Option<Bytes>, DownloadError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DownloadError::ServerError {
                status: status.as_u16(),
            });
        }

        Ok(Some(response.bytes().await?))
    }
}

#[async_trait]
impl HourSource for DownloadClient {
    async fn fetch(
        &self,
        symbol: &Symbol,
        hour: DateTime<Utc>,
    ) -> Result<Option<Bytes>, DownloadError> {
        let url = tick_url(&self.config.base_url, symbol.as_str(), hour);
        tracing::debug!(%url, "downloading hour");
        self.download(&url).await
    }
}
