//! Tick data representation.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::Symbol;

/// Scale applied to raw float volumes before rounding to integer units.
const VOLUME_SCALE: f64 = 1_000_000.0;

/// A single decoded quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument the quote belongs to.
    pub symbol: Symbol,
    /// Timestamp of the tick (UTC, millisecond resolution).
    pub timestamp: DateTime<Utc>,
    /// Ask (offer) price.
    pub ask: f64,
    /// Bid price.
    pub bid: f64,
    /// Volume available at the ask price, in integer units.
    pub ask_volume: u64,
    /// Volume available at the bid price, in integer units.
    pub bid_volume: u64,
}

impl Tick {
    /// Creates a new tick.
    #[must_use]
    pub const fn new(
        symbol: Symbol,
        timestamp: DateTime<Utc>,
        ask: f64,
        bid: f64,
        ask_volume: u64,
        bid_volume: u64,
    ) -> Self {
        Self {
            symbol,
            timestamp,
            ask,
            bid,
            ask_volume,
            bid_volume,
        }
    }

    /// Returns the tick time as whole seconds since the Unix epoch.
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// Raw tick as read from a decompressed bi5 stream (before normalization).
///
/// The bi5 format stores ticks as 20 bytes in big-endian order:
/// - `i32`: milliseconds offset from hour start
/// - `i32`: ask price (raw, needs division by the point divisor)
/// - `i32`: bid price (raw, needs division by the point divisor)
/// - `f32`: ask volume
/// - `f32`: bid volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTick {
    /// Milliseconds offset from the hour start.
    pub ms_offset: i32,
    /// Raw ask price.
    pub ask_raw: i32,
    /// Raw bid price.
    pub bid_raw: i32,
    /// Raw ask volume.
    pub ask_volume: f32,
    /// Raw bid volume.
    pub bid_volume: f32,
}

impl RawTick {
    /// Size in bytes of a raw tick record.
    pub const SIZE: usize = 20;

    /// Creates a new raw tick.
    #[must_use]
    pub const fn new(
        ms_offset: i32,
        ask_raw: i32,
        bid_raw: i32,
        ask_volume: f32,
        bid_volume: f32,
    ) -> Self {
        Self {
            ms_offset,
            ask_raw,
            bid_raw,
            ask_volume,
            bid_volume,
        }
    }

    /// Normalizes the raw tick into an absolute-time [`Tick`].
    ///
    /// Prices are divided by the symbol's point divisor, so an `EURUSD` raw
    /// price of 112345 becomes 1.12345. Volumes are scaled by one million and
    /// rounded half-up.
    #[must_use]
    pub fn normalize(self, hour_start: DateTime<Utc>, symbol: &Symbol) -> Tick {
        let divisor = symbol.point_divisor_f64();
        Tick {
            symbol: symbol.clone(),
            timestamp: hour_start + TimeDelta::milliseconds(i64::from(self.ms_offset)),
            ask: f64::from(self.ask_raw) / divisor,
            bid: f64::from(self.bid_raw) / divisor,
            ask_volume: scale_volume(self.ask_volume),
            bid_volume: scale_volume(self.bid_volume),
        }
    }
}

/// `floor(raw * 1e6 + 0.5)`; callers reject negative and non-finite input.
fn scale_volume(raw: f32) -> u64 {
    (f64::from(raw) * VOLUME_SCALE + 0.5).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;

    fn eurusd() -> Symbol {
        Symbol::new("EURUSD").unwrap()
    }

    #[test]
    fn test_raw_tick_normalize() {
        let hour_start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let raw = RawTick::new(1000, 110_010, 110_000, 1.5, 2.25);
        let tick = raw.normalize(hour_start, &eurusd());

        assert_eq!(tick.timestamp, hour_start + TimeDelta::milliseconds(1000));
        assert_relative_eq!(tick.ask, 1.1001, epsilon = 1e-10);
        assert_relative_eq!(tick.bid, 1.1000, epsilon = 1e-10);
        assert_eq!(tick.ask_volume, 1_500_000);
        assert_eq!(tick.bid_volume, 2_250_000);
        assert_eq!(tick.symbol.as_str(), "EURUSD");
    }

    #[test]
    fn test_raw_tick_normalize_three_digit_symbol() {
        let hour_start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let gold = Symbol::new("XAUUSD").unwrap();
        let tick = RawTick::new(0, 2_045_125, 2_044_875, 0.0, 0.0).normalize(hour_start, &gold);

        assert_relative_eq!(tick.ask, 2045.125, epsilon = 1e-9);
        assert_relative_eq!(tick.bid, 2044.875, epsilon = 1e-9);
    }

    #[test]
    fn test_volume_rounds_half_up() {
        assert_eq!(scale_volume(0.000_001_5), 2);
        assert_eq!(scale_volume(0.000_001_4), 1);
        assert_eq!(scale_volume(0.0), 0);
    }
}
