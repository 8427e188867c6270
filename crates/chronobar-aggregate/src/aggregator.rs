//! Streaming tick-to-bar aggregation.

use chrono::{DateTime, Utc};
use chronobar_types::{Tick, Timeframe};

use crate::{Bar, BarLabel, Ohlcv};

/// Streaming tick aggregator for one symbol and timeframe.
///
/// A bar accumulates ticks until one arrives at or after the end of its
/// window. That tick seals the bar and opens the next one at its own aligned
/// time, so windows without ticks produce no bars.
#[derive(Debug)]
pub struct TickAggregator {
    timeframe: Timeframe,
    label: BarLabel,
    retain_ticks: bool,
    current: Option<OpenBar>,
}

#[derive(Debug)]
struct OpenBar {
    window_end: i64,
    ohlcv: Ohlcv,
    ticks: Vec<Tick>,
}

impl TickAggregator {
    /// Creates a new aggregator for the given timeframe.
    #[must_use]
    pub const fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            label: BarLabel::WindowStart,
            retain_ticks: true,
            current: None,
        }
    }

    /// Sets how sealed bars are labelled.
    #[must_use]
    pub const fn with_label(mut self, label: BarLabel) -> Self {
        self.label = label;
        self
    }

    /// Sets whether bars carry the ticks of their window.
    #[must_use]
    pub const fn with_retained_ticks(mut self, retain: bool) -> Self {
        self.retain_ticks = retain;
        self
    }

    /// Returns the timeframe being aggregated to.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Processes a tick, returning the bar it sealed, if any.
    pub fn push(&mut self, tick: Tick) -> Option<Bar> {
        let seconds = tick.epoch_seconds();
        let aligned = self.timeframe.align(seconds);

        match self.current.as_mut() {
            Some(open) if seconds < open.window_end => {
                open.ohlcv.update(&tick);
                if self.retain_ticks {
                    open.ticks.push(tick);
                }
                None
            }
            Some(_) => {
                let label = match self.label {
                    BarLabel::WindowStart => None,
                    BarLabel::NextWindow => Some(epoch_to_utc(aligned)),
                };
                let sealed = self.current.take().map(|open| open.seal(label));
                self.open(aligned, tick);
                sealed
            }
            None => {
                self.open(aligned, tick);
                None
            }
        }
    }

    /// Seals and returns the open bar.
    ///
    /// With [`BarLabel::NextWindow`] no closing tick exists, so the bar is
    /// labelled with the end of its window. That keeps it later than the bar
    /// sealed before it, which already carries this bar's window start.
    pub fn flush(&mut self) -> Option<Bar> {
        let open = self.current.take()?;
        let label = match self.label {
            BarLabel::WindowStart => None,
            BarLabel::NextWindow => Some(epoch_to_utc(open.window_end)),
        };
        Some(open.seal(label))
    }

    fn open(&mut self, aligned: i64, tick: Tick) {
        let ohlcv = Ohlcv::open_with(epoch_to_utc(aligned), &tick);
        let ticks = if self.retain_ticks {
            vec![tick]
        } else {
            Vec::new()
        };
        self.current = Some(OpenBar {
            window_end: aligned + self.timeframe.seconds(),
            ohlcv,
            ticks,
        });
    }
}

impl OpenBar {
    fn seal(self, label: Option<DateTime<Utc>>) -> Bar {
        Bar {
            time: label.unwrap_or(self.ohlcv.timestamp),
            ohlcv: self.ohlcv,
            ticks: self.ticks,
        }
    }
}

// Aligned times are derived from valid tick times and never leave chrono's range.
fn epoch_to_utc(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{TimeDelta, TimeZone};
    use chronobar_types::{PeriodUnit, Symbol};

    fn make_tick(hour: u32, minute: u32, second: u32, millis: u32, bid: f64) -> Tick {
        let timestamp = Utc
            .with_ymd_and_hms(2024, 1, 1, hour, minute, second)
            .unwrap()
            + TimeDelta::milliseconds(i64::from(millis));
        Tick::new(Symbol::new("EURUSD").unwrap(), timestamp, bid + 0.0001, bid, 7, 10)
    }

    fn minute(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_minute_aggregation() {
        let mut agg = TickAggregator::new(Timeframe::M1);

        assert!(agg.push(make_tick(12, 0, 0, 0, 1.1000)).is_none());
        assert!(agg.push(make_tick(12, 0, 30, 0, 1.1005)).is_none());
        assert!(agg.push(make_tick(12, 0, 59, 999, 1.0995)).is_none());

        let bar = agg.push(make_tick(12, 1, 0, 0, 1.0985)).unwrap();
        assert_eq!(bar.time, minute(12, 0));
        assert_eq!(bar.ohlcv.tick_count, 3);
        assert_eq!(bar.ticks.len(), 3);
        assert_relative_eq!(bar.ohlcv.open, 1.1000);
        assert_relative_eq!(bar.ohlcv.high, 1.1005);
        assert_relative_eq!(bar.ohlcv.low, 1.0995);
        assert_relative_eq!(bar.ohlcv.close, 1.0995);
        assert_eq!(bar.ohlcv.volume, 30);
    }

    #[test]
    fn test_gap_emits_no_empty_bars() {
        let mut agg = TickAggregator::new(Timeframe::M1);
        agg.push(make_tick(12, 0, 10, 0, 1.1));

        let bar = agg.push(make_tick(12, 7, 10, 0, 1.2)).unwrap();
        assert_eq!(bar.time, minute(12, 0));

        let bar = agg.flush().unwrap();
        assert_eq!(bar.time, minute(12, 7));
        assert!(agg.flush().is_none());
    }

    #[test]
    fn test_two_hours_one_bar_per_minute() {
        let mut agg = TickAggregator::new(Timeframe::M1);
        let mut bars = Vec::new();

        for hour in 10..12 {
            for minute in 0..60 {
                for second in [5, 25, 45] {
                    let bid = 1.0 + f64::from(minute * 60 + second) * 1e-6;
                    if let Some(bar) = agg.push(make_tick(hour, minute, second, 0, bid)) {
                        bars.push(bar);
                    }
                }
            }
        }
        bars.extend(agg.flush());

        assert_eq!(bars.len(), 120);
        for (i, bar) in bars.iter().enumerate() {
            let minute = (i % 60) as u32;
            assert_eq!(bar.time, self::minute(10 + (i / 60) as u32, minute));
            assert_relative_eq!(bar.ohlcv.open, 1.0 + f64::from(minute * 60 + 5) * 1e-6);
            assert_relative_eq!(bar.ohlcv.close, 1.0 + f64::from(minute * 60 + 45) * 1e-6);
        }
    }

    #[test]
    fn test_five_minute_alignment() {
        let tf = Timeframe::new(PeriodUnit::Minute, 5).unwrap();
        let mut agg = TickAggregator::new(tf);
        agg.push(make_tick(12, 3, 0, 0, 1.1));
        agg.push(make_tick(12, 4, 59, 0, 1.2));

        let bar = agg.push(make_tick(12, 5, 0, 0, 1.3)).unwrap();
        assert_eq!(bar.time, minute(12, 0));
        assert_eq!(bar.ohlcv.tick_count, 2);
    }

    #[test]
    fn test_next_window_label() {
        let mut agg = TickAggregator::new(Timeframe::M1).with_label(BarLabel::NextWindow);
        agg.push(make_tick(12, 0, 10, 0, 1.1));

        let bar = agg.push(make_tick(12, 3, 10, 0, 1.2)).unwrap();
        assert_eq!(bar.time, minute(12, 3));
        assert_eq!(bar.ohlcv.timestamp, minute(12, 0));

        let trailing = agg.flush().unwrap();
        assert_eq!(trailing.ohlcv.timestamp, minute(12, 3));
        assert_eq!(trailing.time, minute(12, 4));
        assert!(bar.time < trailing.time);
    }

    #[test]
    fn test_next_window_times_strictly_increase() {
        let tf = Timeframe::new(PeriodUnit::Minute, 5).unwrap();
        let mut agg = TickAggregator::new(tf).with_label(BarLabel::NextWindow);
        let mut bars = Vec::new();
        for (minute, second) in [(0, 10), (2, 0), (7, 30), (21, 5), (23, 59)] {
            bars.extend(agg.push(make_tick(12, minute, second, 0, 1.1)));
        }
        bars.extend(agg.flush());

        let times: Vec<_> = bars.iter().map(|bar| bar.time).collect();
        assert_eq!(times, vec![minute(12, 5), minute(12, 20), minute(12, 25)]);
        assert!(times.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_late_tick_folds_into_open_bar() {
        let mut agg = TickAggregator::new(Timeframe::M1);
        agg.push(make_tick(12, 1, 0, 0, 1.1));
        assert!(agg.push(make_tick(12, 0, 30, 0, 1.0)).is_none());

        let bar = agg.flush().unwrap();
        assert_eq!(bar.time, minute(12, 1));
        assert_eq!(bar.ohlcv.tick_count, 2);
        assert_relative_eq!(bar.ohlcv.low, 1.0);
    }

    #[test]
    fn test_without_retained_ticks() {
        let mut agg = TickAggregator::new(Timeframe::M1).with_retained_ticks(false);
        agg.push(make_tick(12, 0, 0, 0, 1.1));
        agg.push(make_tick(12, 0, 1, 0, 1.1));

        let bar = agg.flush().unwrap();
        assert!(bar.ticks.is_empty());
        assert_eq!(bar.ohlcv.tick_count, 2);
    }
}
