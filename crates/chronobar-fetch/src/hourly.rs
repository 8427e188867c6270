//! Per-hour decode stage: decompress, decode and archive one hour of data.

use chrono::{DateTime, Utc};
use chronobar_types::{Symbol, Tick};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveOutcome, hour_path, save_raw};
use crate::decompress::{StreamStatus, decompress_frames};
use crate::parse::decode_tick;

/// How decoding of one hour ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// The payload was empty.
    Empty,
    /// Every frame was decoded.
    Complete,
    /// Every whole frame was decoded; a partial frame at the end was dropped.
    TrailingBytes(usize),
    /// Decoding stopped early; the ticks before the failure are kept.
    Interrupted(String),
}

impl DecodeOutcome {
    /// Returns true if the hour was decoded without loss.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Empty | Self::Complete)
    }
}

impl fmt::Display for DecodeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Complete => write!(f, "complete"),
            Self::TrailingBytes(n) => write!(f, "complete ({n} trailing bytes dropped)"),
            Self::Interrupted(reason) => write!(f, "interrupted: {reason}"),
        }
    }
}

/// Ticks decoded from one hour, in source order.
#[derive(Debug, Clone)]
pub struct HourBatch {
    /// Start of the hour.
    pub hour: DateTime<Utc>,
    /// Decoded ticks.
    pub ticks: Vec<Tick>,
    /// How decoding ended.
    pub outcome: DecodeOutcome,
    /// Set when the raw payload could not be archived.
    pub archive_error: Option<String>,
}

impl HourBatch {
    /// Creates a batch for an hour that produced no data.
    #[must_use]
    pub const fn empty(hour: DateTime<Utc>) -> Self {
        Self {
            hour,
            ticks: Vec::new(),
            outcome: DecodeOutcome::Empty,
            archive_error: None,
        }
    }

    /// Returns the number of decoded ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Returns true if the hour produced no ticks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

/// Decodes a compressed bi5 payload into ticks.
///
/// Ticks keep the order of the stream. A record that fails to decode
/// abandons the rest of the hour.
#[must_use]
pub fn decode_hour(raw: &[u8], symbol: &Symbol, hour: DateTime<Utc>) -> (Vec<Tick>, DecodeOutcome) {
    if raw.is_empty() {
        return (Vec::new(), DecodeOutcome::Empty);
    }

    let frames = decompress_frames(raw);
    let mut ticks = Vec::with_capacity(frames.len());

    for (index, frame) in frames.frames().enumerate() {
        match decode_tick(frame, symbol, hour) {
            Ok(tick) => ticks.push(tick),
            Err(e) => {
                return (
                    ticks,
                    DecodeOutcome::Interrupted(format!("record {index}: {e}")),
                );
            }
        }
    }

    let outcome = match frames.status() {
        StreamStatus::Complete => DecodeOutcome::Complete,
        StreamStatus::TrailingBytes(n) => DecodeOutcome::TrailingBytes(*n),
        StreamStatus::Interrupted(e) => DecodeOutcome::Interrupted(e.to_string()),
    };
    (ticks, outcome)
}

/// Turns one hour's raw download into ticks and archives the raw bytes.
///
/// Blocking: run it on a blocking thread from async code.
#[derive(Debug, Clone)]
pub struct HourlyDecoder {
    symbol: Symbol,
    archive_root: Option<PathBuf>,
}

impl HourlyDecoder {
    /// Creates a decoder that does not archive raw payloads.
    #[must_use]
    pub const fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            archive_root: None,
        }
    }

    /// Archives raw payloads under `root` in the `<SYMBOL>/<yyyy>/<mm>/<dd>` layout.
    #[must_use]
    pub fn with_archive_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.archive_root = Some(root.into());
        self
    }

    /// Returns the symbol being decoded.
    #[must_use]
    pub const fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Returns the archive root, if archiving is enabled.
    #[must_use]
    pub fn archive_root(&self) -> Option<&Path> {
        self.archive_root.as_deref()
    }

    /// Processes one hour.
    ///
    /// The raw payload is archived whether or not it decodes. Neither a
    /// decode failure nor an archive failure is returned as an error; both
    /// are logged and recorded on the batch.
    #[must_use]
    pub fn process(&self, hour: DateTime<Utc>, raw: &[u8]) -> HourBatch {
        let archive_error = self
            .archive_root
            .as_deref()
            .and_then(|root| self.archive(root, hour, raw).err());

        let (ticks, outcome) = decode_hour(raw, &self.symbol, hour);
        match &outcome {
            DecodeOutcome::Interrupted(reason) => tracing::warn!(
                symbol = %self.symbol,
                %hour,
                ticks = ticks.len(),
                "decode interrupted: {reason}"
            ),
            DecodeOutcome::TrailingBytes(n) => tracing::debug!(
                symbol = %self.symbol,
                %hour,
                "dropped {n} trailing bytes"
            ),
            DecodeOutcome::Empty | DecodeOutcome::Complete => {}
        }
        tracing::debug!(symbol = %self.symbol, %hour, ticks = ticks.len(), "decoded hour");

        HourBatch {
            hour,
            ticks,
            outcome,
            archive_error,
        }
    }

    fn archive(&self, root: &Path, hour: DateTime<Utc>, raw: &[u8]) -> Result<(), String> {
        let path = hour_path(root, &self.symbol, hour);
        let result = if raw.is_empty() {
            save_raw(&path, raw)
        } else {
            path.parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|()| save_raw(&path, raw))
        };

        match result {
            Ok(ArchiveOutcome::Written(_) | ArchiveOutcome::Removed) => Ok(()),
            Err(e) => {
                tracing::error!(path = %path.display(), "failed to archive raw payload: {e}");
                Err(format!("{}: {e}", path.display()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decompress::compress;
    use crate::parse::encode_raw_tick;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn eurusd() -> Symbol {
        Symbol::new("EURUSD").unwrap()
    }

    fn hour() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 7, 0, 0).unwrap()
    }

    fn payload() -> Vec<u8> {
        let mut raw = encode_raw_tick(1_000, 112_350, 112_345, 0.000_001_5, 0.000_001_4);
        raw.extend(encode_raw_tick(61_000, 112_360, 112_355, 1.0, 2.0));
        raw.extend(encode_raw_tick(62_000, 112_370, 112_365, 1.0, 2.0));
        compress(&raw)
    }

    #[test]
    fn test_decode_hour() {
        let (ticks, outcome) = decode_hour(&payload(), &eurusd(), hour());
        assert_eq!(outcome, DecodeOutcome::Complete);
        assert_eq!(ticks.len(), 3);

        assert_eq!(ticks[0].timestamp, hour() + chrono::TimeDelta::seconds(1));
        assert_relative_eq!(ticks[0].bid, 1.12345, epsilon = 1e-12);
        assert_eq!(ticks[0].ask_volume, 2);
        assert_eq!(ticks[0].bid_volume, 1);
        assert!(ticks.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_decode_hour_interrupted_by_record() {
        let mut raw = encode_raw_tick(0, 100, 99, 1.0, 1.0);
        raw.extend(encode_raw_tick(10, 100, 99, -1.0, 1.0));
        raw.extend(encode_raw_tick(20, 100, 99, 1.0, 1.0));

        let (ticks, outcome) = decode_hour(&compress(&raw), &eurusd(), hour());
        assert_eq!(ticks.len(), 1);
        assert!(matches!(outcome, DecodeOutcome::Interrupted(_)));
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_process_archives_raw_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = HourlyDecoder::new(eurusd()).with_archive_root(dir.path());
        let raw = payload();

        let batch = decoder.process(hour(), &raw);
        assert_eq!(batch.len(), 3);
        assert!(batch.archive_error.is_none());

        let path = dir.path().join("EURUSD/2024/01/05/07h.bi5");
        assert_eq!(std::fs::read(path).unwrap(), raw);
    }

    #[test]
    fn test_process_archives_undecodable_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = HourlyDecoder::new(eurusd()).with_archive_root(dir.path());

        let batch = decoder.process(hour(), b"not lzma");
        assert!(batch.is_empty());
        assert!(matches!(batch.outcome, DecodeOutcome::Interrupted(_)));

        let path = dir.path().join("EURUSD/2024/01/05/07h.bi5");
        assert_eq!(std::fs::read(path).unwrap(), b"not lzma");
    }

    #[test]
    fn test_zero_tick_hour_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let decoder = HourlyDecoder::new(eurusd()).with_archive_root(dir.path());

        let path = dir.path().join("EURUSD/2024/01/05/07h.bi5");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"stale").unwrap();

        let batch = decoder.process(hour(), &[]);
        assert!(batch.is_empty());
        assert_eq!(batch.outcome, DecodeOutcome::Empty);
        assert!(batch.archive_error.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_process_without_archive() {
        let decoder = HourlyDecoder::new(eurusd());
        assert!(decoder.archive_root().is_none());
        let batch = decoder.process(hour(), &payload());
        assert_eq!(batch.len(), 3);
    }
}
