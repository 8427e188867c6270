//! Raw bi5 archive layout, persistence and replay.
//!
//! Archived payloads live at `<root>/<SYMBOL>/<yyyy>/<mm>/<dd>/<hh>h.bi5`
//! with a 1-based month, byte-for-byte as they were downloaded.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chronobar_types::Symbol;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::{DownloadError, HourSource};

/// File extension of archived payloads.
pub const ARCHIVE_EXTENSION: &str = "bi5";

/// Returns the directory holding one day of a symbol.
#[must_use]
pub fn day_dir(root: &Path, symbol: &Symbol, day: NaiveDate) -> PathBuf {
    root.join(symbol.as_str())
        .join(format!("{:04}", day.year()))
        .join(format!("{:02}", day.month()))
        .join(format!("{:02}", day.day()))
}

/// Returns the file name of an archived hour, e.g. `07h.bi5`.
#[must_use]
pub fn hour_file_name(hour: DateTime<Utc>) -> String {
    format!("{:02}h.{ARCHIVE_EXTENSION}", hour.hour())
}

/// Returns the full archive path of one hour.
#[must_use]
pub fn hour_path(root: &Path, symbol: &Symbol, hour: DateTime<Utc>) -> PathBuf {
    day_dir(root, symbol, hour.date_naive()).join(hour_file_name(hour))
}

/// Result of persisting a raw payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The payload was written; holds the number of bytes.
    Written(usize),
    /// The payload was empty; any previous file at the path was removed.
    Removed,
}

/// Writes `raw` unmodified to `path`, replacing any previous file.
///
/// An empty payload is not an error: the file is deleted instead of being
/// left empty.
///
/// # Errors
///
/// Returns an error if the file cannot be written or removed.
pub fn save_raw(path: &Path, raw: &[u8]) -> io::Result<ArchiveOutcome> {
    if raw.is_empty() {
        return match fs::remove_file(path) {
            Ok(()) => Ok(ArchiveOutcome::Removed),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(ArchiveOutcome::Removed),
            Err(e) => Err(e),
        };
    }

    fs::write(path, raw)?;
    tracing::trace!(path = %path.display(), bytes = raw.len(), "archived raw payload");
    Ok(ArchiveOutcome::Written(raw.len()))
}

/// Replays a previously archived directory tree as an [`HourSource`].
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    root: PathBuf,
}

impl ArchiveSource {
    /// Creates a source reading from the archive rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the archive root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl HourSource for ArchiveSource {
    async fn fetch(
        &self,
        symbol: &Symbol,
        hour: DateTime<Utc>,
    ) -> Result<Option<Bytes>, DownloadError> {
        let path = hour_path(&self.root, symbol, hour);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(DownloadError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn eurusd() -> Symbol {
        Symbol::new("EURUSD").unwrap()
    }

    #[test]
    fn test_layout() {
        let hour = Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
        let path = hour_path(Path::new("/data"), &eurusd(), hour);
        assert_eq!(path, PathBuf::from("/data/EURUSD/2024/01/05/07h.bi5"));
    }

    #[test]
    fn test_save_raw_writes_and_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("03h.bi5");

        assert_eq!(save_raw(&path, b"abc").unwrap(), ArchiveOutcome::Written(3));
        assert_eq!(fs::read(&path).unwrap(), b"abc");

        assert_eq!(save_raw(&path, &[]).unwrap(), ArchiveOutcome::Removed);
        assert!(!path.exists());

        // Nothing to remove is still fine.
        assert_eq!(save_raw(&path, &[]).unwrap(), ArchiveOutcome::Removed);
    }

    #[tokio::test]
    async fn test_archive_source() {
        let dir = tempfile::tempdir().unwrap();
        let hour = Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap();
        let path = hour_path(dir.path(), &eurusd(), hour);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"payload").unwrap();

        let source = ArchiveSource::new(dir.path());
        let data = source.fetch(&eurusd(), hour).await.unwrap();
        assert_eq!(data.as_deref(), Some(&b"payload"[..]));

        let missing = hour + chrono::TimeDelta::hours(1);
        assert!(source.fetch(&eurusd(), missing).await.unwrap().is_none());
    }
}
