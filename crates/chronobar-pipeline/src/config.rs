//! Pipeline configuration.

use chronobar_aggregate::{BarLabel, DEFAULT_QUEUE_CAPACITY, TrailingBar};
use chronobar_format::{CsvOptions, FxtOptions, HstOptions, OutputFormat};
use chronobar_types::{ChronobarError, Result, Symbol, Timeframe};
use std::path::PathBuf;

/// Number of hours in a day, and the default number of concurrent hour workers.
pub const HOURS_PER_DAY: usize = 24;

/// Order in which a day's hours reach the aggregators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HourOrdering {
    /// Buffer the whole day and feed hours in chronological order, with ticks
    /// stably sorted by timestamp.
    #[default]
    Chronological,
    /// Feed each hour as soon as it is decoded.
    Arrival,
}

/// Lifetime of the output files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputScope {
    /// One set of files per day, in the day directory.
    #[default]
    PerDay,
    /// One set of files for the whole range, in the symbol directory.
    Range,
}

/// Configuration for a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root directory for outputs and the raw archive.
    pub dest: PathBuf,
    /// Instrument to process.
    pub symbol: Symbol,
    /// Output format.
    pub format: OutputFormat,
    /// Bar timeframes; HST and FXT write one file per timeframe.
    pub timeframes: Vec<Timeframe>,
    /// Order in which hours are fed to the aggregators.
    pub ordering: HourOrdering,
    /// What happens to the open bar at the end of an output.
    pub trailing: TrailingBar,
    /// Which time sealed bars are labelled with.
    pub label: BarLabel,
    /// Lifetime of the output files.
    pub scope: OutputScope,
    /// Whether raw payloads are archived under `dest`.
    pub archive_raw: bool,
    /// Whether Saturdays are skipped.
    pub skip_saturdays: bool,
    /// Maximum concurrent hour workers.
    pub hour_concurrency: usize,
    /// Capacity of each aggregator's tick queue.
    pub queue_capacity: usize,
    /// CSV options.
    pub csv: CsvOptions,
    /// HST options.
    pub hst: HstOptions,
    /// FXT options.
    pub fxt: FxtOptions,
}

impl PipelineConfig {
    /// Creates a configuration with defaults for everything but the
    /// destination and symbol.
    #[must_use]
    pub fn new(dest: impl Into<PathBuf>, symbol: Symbol) -> Self {
        Self {
            dest: dest.into(),
            symbol,
            format: OutputFormat::default(),
            timeframes: vec![Timeframe::M1],
            ordering: HourOrdering::default(),
            trailing: TrailingBar::default(),
            label: BarLabel::default(),
            scope: OutputScope::default(),
            archive_raw: true,
            skip_saturdays: true,
            hour_concurrency: HOURS_PER_DAY,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            csv: CsvOptions::default(),
            hst: HstOptions::default(),
            fxt: FxtOptions::default(),
        }
    }

    /// Sets the output format.
    #[must_use]
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the bar timeframes.
    #[must_use]
    pub fn with_timeframes(mut self, timeframes: Vec<Timeframe>) -> Self {
        self.timeframes = timeframes;
        self
    }

    /// Sets the hour ordering.
    #[must_use]
    pub const fn with_ordering(mut self, ordering: HourOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    /// Sets the trailing bar policy.
    #[must_use]
    pub const fn with_trailing(mut self, trailing: TrailingBar) -> Self {
        self.trailing = trailing;
        self
    }

    /// Sets the bar label policy.
    #[must_use]
    pub const fn with_label(mut self, label: BarLabel) -> Self {
        self.label = label;
        self
    }

    /// Sets the output scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: OutputScope) -> Self {
        self.scope = scope;
        self
    }

    /// Enables or disables raw archival.
    #[must_use]
    pub const fn with_archive_raw(mut self, archive: bool) -> Self {
        self.archive_raw = archive;
        self
    }

    /// Enables or disables skipping Saturdays.
    #[must_use]
    pub const fn with_skip_saturdays(mut self, skip: bool) -> Self {
        self.skip_saturdays = skip;
        self
    }

    /// Sets the number of concurrent hour workers.
    #[must_use]
    pub const fn with_hour_concurrency(mut self, concurrency: usize) -> Self {
        self.hour_concurrency = concurrency;
        self
    }

    /// Sets the CSV options.
    #[must_use]
    pub const fn with_csv(mut self, csv: CsvOptions) -> Self {
        self.csv = csv;
        self
    }

    /// Sets the HST options.
    #[must_use]
    pub fn with_hst(mut self, hst: HstOptions) -> Self {
        self.hst = hst;
        self
    }

    /// Sets the FXT options.
    #[must_use]
    pub fn with_fxt(mut self, fxt: FxtOptions) -> Self {
        self.fxt = fxt;
        self
    }

    /// Checks the configuration and normalizes the timeframe list.
    ///
    /// Timeframes with the same length in minutes would share a file name,
    /// so only the first of them is kept.
    ///
    /// # Errors
    ///
    /// Returns [`ChronobarError::InvalidInput`] for an empty destination or
    /// a zero concurrency or queue capacity.
    pub fn validate(mut self) -> Result<Self> {
        if self.dest.as_os_str().is_empty() {
            return Err(ChronobarError::InvalidInput(
                "output folder must not be empty".to_string(),
            ));
        }
        if self.hour_concurrency == 0 {
            return Err(ChronobarError::InvalidInput(
                "hour concurrency must be at least 1".to_string(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ChronobarError::InvalidInput(
                "queue capacity must be at least 1".to_string(),
            ));
        }

        let mut seen = Vec::with_capacity(self.timeframes.len());
        self.timeframes.retain(|tf| {
            if seen.contains(&tf.minutes()) {
                tracing::warn!(timeframe = %tf, "duplicate timeframe ignored");
                false
            } else {
                seen.push(tf.minutes());
                true
            }
        });
        if self.timeframes.is_empty() {
            self.timeframes.push(Timeframe::M1);
        }
        Ok(self)
    }
}
