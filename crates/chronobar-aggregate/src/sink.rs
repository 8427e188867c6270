//! The seam between aggregation and output encoders.

use chronobar_types::{Result, Tick};

use crate::Bar;

/// Consumer of sealed bars, implemented by every output encoder.
///
/// Bars arrive in the order they were sealed. `finish` is called once after
/// the last bar; an encoder that back-patches a header does so there.
pub trait BarSink: Send {
    /// Accepts one tick before it is aggregated.
    ///
    /// Sinks that write rows per tick do it here instead of reading
    /// [`Bar::ticks`], so no window is buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if the tick could not be written.
    fn accept_tick(&mut self, _tick: &Tick) -> Result<()> {
        Ok(())
    }

    /// Accepts one sealed bar.
    ///
    /// # Errors
    ///
    /// Returns an error if the bar could not be written.
    fn accept_bar(&mut self, bar: &Bar) -> Result<()>;

    /// Completes the output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output could not be completed.
    fn finish(&mut self) -> Result<()>;

    /// Returns true if the sink reads [`Bar::ticks`].
    ///
    /// Sinks that only write aggregated bars return false so the aggregator
    /// does not buffer a window's ticks.
    fn needs_ticks(&self) -> bool {
        true
    }

    /// Short name used in logs.
    fn name(&self) -> &str {
        "sink"
    }
}

impl<S: BarSink + ?Sized> BarSink for Box<S> {
    fn accept_tick(&mut self, tick: &Tick) -> Result<()> {
        (**self).accept_tick(tick)
    }

    fn accept_bar(&mut self, bar: &Bar) -> Result<()> {
        (**self).accept_bar(bar)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }

    fn needs_ticks(&self) -> bool {
        (**self).needs_ticks()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// A sink that keeps every bar in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    /// Bars received so far.
    pub bars: Vec<Bar>,
    /// Whether `finish` was called.
    pub finished: bool,
}

impl BarSink for CollectSink {
    fn accept_bar(&mut self, bar: &Bar) -> Result<()> {
        self.bars.push(bar.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "collect"
    }
}
