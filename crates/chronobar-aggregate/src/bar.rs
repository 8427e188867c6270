//! Closed bars and the policies that shape them.

use chrono::{DateTime, Utc};
use chronobar_types::Tick;

use crate::Ohlcv;

/// A sealed bar handed to a [`BarSink`](crate::BarSink).
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Time the bar is written under; see [`BarLabel`].
    pub time: DateTime<Utc>,
    /// Aggregated prices and volume; `ohlcv.timestamp` is the window start.
    pub ohlcv: Ohlcv,
    /// The ticks of the window in arrival order.
    ///
    /// Empty when the sink declared it does not need them.
    pub ticks: Vec<Tick>,
}

/// Which time a sealed bar is labelled with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BarLabel {
    /// The start of the bar's own window.
    #[default]
    WindowStart,
    /// The aligned time of the tick that closed the bar.
    ///
    /// Matches legacy converters that stamp a bar when the next one opens.
    /// A bar flushed without a closing tick uses the end of its window.
    NextWindow,
}

/// What happens to the open bar when the stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrailingBar {
    /// Emit it as a final, possibly partial, bar.
    #[default]
    Flush,
    /// Discard it; only bars closed by a later tick are emitted.
    Drop,
}
