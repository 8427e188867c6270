//! Per-hour, per-day and per-run outcome reports.

use chrono::{DateTime, NaiveDate, Utc};
use chronobar_fetch::DecodeOutcome;
use chronobar_format::OutputFormat;
use chronobar_types::Timeframe;
use std::path::PathBuf;
use std::time::Duration;

/// How one hour ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HourStatus {
    /// Every record decoded.
    Complete,
    /// Every record decoded; this many bytes after the last whole record
    /// were ignored.
    TrailingBytes(usize),
    /// The archive had no data for the hour.
    Missing,
    /// The fetch failed; the hour contributed no ticks.
    FetchFailed(String),
    /// Decoding stopped early; the ticks before the failure were kept.
    DecodeInterrupted(String),
}

impl HourStatus {
    pub(crate) fn from_outcome(outcome: &DecodeOutcome) -> Self {
        match outcome {
            DecodeOutcome::Empty => Self::Missing,
            DecodeOutcome::Complete => Self::Complete,
            DecodeOutcome::TrailingBytes(n) => Self::TrailingBytes(*n),
            DecodeOutcome::Interrupted(reason) => Self::DecodeInterrupted(reason.clone()),
        }
    }

    /// Returns true if the hour lost no data.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Complete | Self::TrailingBytes(_) | Self::Missing)
    }
}

/// Outcome of one hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourReport {
    /// Start of the hour.
    pub hour: DateTime<Utc>,
    /// How the hour ended.
    pub status: HourStatus,
    /// Ticks decoded.
    pub ticks: usize,
    /// Set when the raw payload could not be archived.
    pub archive_error: Option<String>,
}

/// Outcome of one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReport {
    /// File path.
    pub path: PathBuf,
    /// Output format.
    pub format: OutputFormat,
    /// Timeframe of the bars.
    pub timeframe: Timeframe,
    /// Bars delivered to the encoder.
    pub bars: u64,
    /// Set when the output was abandoned or could not be completed.
    pub error: Option<String>,
    /// True if the FXT header could not be back-patched.
    pub back_patch_failed: bool,
    /// True if the file was empty and has been removed.
    pub removed_empty: bool,
}

impl OutputReport {
    /// Returns true if the output was written completely.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of one day.
#[derive(Debug, Clone)]
pub struct DayReport {
    /// The day.
    pub day: NaiveDate,
    /// True if the day was skipped without fetching.
    pub skipped: bool,
    /// Per-hour outcomes in chronological order.
    pub hours: Vec<HourReport>,
    /// Outputs finished with the day; empty for range-scoped outputs.
    pub outputs: Vec<OutputReport>,
    /// Wall time spent on the day.
    pub elapsed: Duration,
}

impl DayReport {
    pub(crate) const fn skipped(day: NaiveDate) -> Self {
        Self {
            day,
            skipped: true,
            hours: Vec::new(),
            outputs: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Returns the number of ticks decoded.
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.hours.iter().map(|h| h.ticks).sum()
    }

    /// Returns the bytes ignored after the last whole record, over all hours.
    #[must_use]
    pub fn trailing_bytes(&self) -> usize {
        self.hours
            .iter()
            .map(|h| match h.status {
                HourStatus::TrailingBytes(n) => n,
                _ => 0,
            })
            .sum()
    }

    /// Returns the number of hours that lost data.
    #[must_use]
    pub fn failed_hours(&self) -> usize {
        self.hours.iter().filter(|h| !h.status.is_ok()).count()
    }

    /// Returns true if no hour lost data and every output completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_hours() == 0 && self.outputs.iter().all(OutputReport::is_ok)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Per-day outcomes in order.
    pub days: Vec<DayReport>,
    /// Range-scoped outputs; empty for per-day outputs.
    pub outputs: Vec<OutputReport>,
    /// Total wall time.
    pub elapsed: Duration,
}

impl RunReport {
    /// Returns the number of ticks decoded.
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.days.iter().map(DayReport::ticks).sum()
    }

    /// Returns every output report, per-day and range-scoped.
    pub fn all_outputs(&self) -> impl Iterator<Item = &OutputReport> {
        self.days
            .iter()
            .flat_map(|d| d.outputs.iter())
            .chain(self.outputs.iter())
    }

    /// Returns the number of outputs whose header could not be back-patched.
    #[must_use]
    pub fn back_patch_failures(&self) -> usize {
        self.all_outputs().filter(|o| o.back_patch_failed).count()
    }

    /// Returns the number of days that were not complete.
    #[must_use]
    pub fn partial_days(&self) -> usize {
        self.days
            .iter()
            .filter(|d| !d.skipped && !d.is_complete())
            .count()
    }
}
