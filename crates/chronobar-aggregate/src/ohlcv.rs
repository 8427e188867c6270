//! OHLCV (candlestick) data structure.

use chrono::{DateTime, Utc};
use chronobar_types::Tick;
use serde::{Deserialize, Serialize};

/// OHLCV bar (candlestick) data.
///
/// Prices come from the bid side only and the volume is the sum of bid
/// volumes, as trading platforms chart bid bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlcv {
    /// Bar open time (start of the window).
    pub timestamp: DateTime<Utc>,
    /// Opening price (first tick's bid).
    pub open: f64,
    /// Highest bid during the window.
    pub high: f64,
    /// Lowest bid during the window.
    pub low: f64,
    /// Closing price (last tick's bid).
    pub close: f64,
    /// Sum of bid volumes.
    pub volume: u64,
    /// Number of ticks in the bar.
    pub tick_count: u32,
}

impl Ohlcv {
    /// Creates a new OHLCV bar.
    #[must_use]
    pub const fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
        tick_count: u32,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            tick_count,
        }
    }

    /// Opens a bar at `timestamp` with its first tick.
    #[must_use]
    pub fn open_with(timestamp: DateTime<Utc>, tick: &Tick) -> Self {
        Self::new(
            timestamp,
            tick.bid,
            tick.bid,
            tick.bid,
            tick.bid,
            tick.bid_volume,
            1,
        )
    }

    /// Folds another tick into the bar.
    pub fn update(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.bid);
        self.low = self.low.min(tick.bid);
        self.close = tick.bid;
        self.volume = self.volume.saturating_add(tick.bid_volume);
        self.tick_count = self.tick_count.saturating_add(1);
    }

    /// Returns the volume clamped to at least one, for formats that reject
    /// empty bars.
    #[must_use]
    pub fn volume_or_one(&self) -> u64 {
        self.volume.max(1)
    }

    /// Returns the bar open time as whole seconds since the Unix epoch.
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}
