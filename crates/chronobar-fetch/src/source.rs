//! Hour source abstraction.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use chronobar_types::Symbol;

use crate::DownloadError;

/// Anything that can supply the compressed bi5 payload of one hour.
#[async_trait]
pub trait HourSource: Send + Sync + std::fmt::Debug {
    /// Fetches the payload for `symbol` at the hour starting at `hour`.
    ///
    /// Returns `Ok(None)` when the archive has no data for that hour.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload could not be retrieved.
    async fn fetch(
        &self,
        symbol: &Symbol,
        hour: DateTime<Utc>,
    ) -> Result<Option<Bytes>, DownloadError>;
}
