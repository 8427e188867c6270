//! Background aggregation worker with a bounded tick queue.

use chronobar_types::{ChronobarError, Tick, Timeframe};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{AggregateError, Bar, BarLabel, BarSink, TickAggregator, TrailingBar};

/// Default capacity of the tick queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Configuration for a [`BarAggregator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Ticks buffered before producers wait.
    pub queue_capacity: usize,
    /// What happens to the open bar at finish.
    pub trailing: TrailingBar,
    /// Which time sealed bars are labelled with.
    pub label: BarLabel,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            trailing: TrailingBar::default(),
            label: BarLabel::default(),
        }
    }
}

impl AggregatorConfig {
    /// Sets the queue capacity (at least one).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
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
}

/// What a finished aggregation produced.
#[derive(Debug)]
pub struct AggregationSummary {
    /// Timeframe that was aggregated.
    pub timeframe: Timeframe,
    /// Ticks consumed.
    pub ticks: u64,
    /// Bars delivered to the sink.
    pub bars: u64,
    /// The first error the sink reported, if any.
    ///
    /// After an `accept_tick` or `accept_bar` failure the output is
    /// abandoned: remaining ticks are drained but nothing more is written and
    /// `finish` is skipped.
    pub sink_error: Option<ChronobarError>,
}

impl AggregationSummary {
    /// Returns true if the sink accepted every bar and finished.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.sink_error.is_none()
    }
}

#[derive(Debug)]
enum Command {
    Tick(Tick),
    Flush,
}

/// Aggregates one timeframe on a background thread.
///
/// Ticks go through a bounded queue to a single consumer that owns the
/// [`TickAggregator`] and the sink. Producers wait while the queue is full.
#[derive(Debug)]
pub struct BarAggregator {
    timeframe: Timeframe,
    sender: mpsc::Sender<Command>,
    consumer: JoinHandle<AggregationSummary>,
}

impl BarAggregator {
    /// Starts a worker delivering bars of `timeframe` to `sink`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S>(timeframe: Timeframe, sink: S, config: AggregatorConfig) -> Self
    where
        S: BarSink + 'static,
    {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let aggregator = TickAggregator::new(timeframe)
            .with_label(config.label)
            .with_retained_ticks(sink.needs_ticks());
        let consumer = tokio::task::spawn_blocking(move || {
            consume(receiver, aggregator, sink, config.trailing)
        });

        Self {
            timeframe,
            sender,
            consumer,
        }
    }

    /// Returns the timeframe being aggregated.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Queues one tick, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Closed`] if the consumer has stopped.
    pub async fn push(&self, tick: Tick) -> Result<(), AggregateError> {
        self.send(Command::Tick(tick)).await
    }

    /// Queues a batch of ticks in order.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Closed`] if the consumer has stopped.
    pub async fn push_batch<I>(&self, ticks: I) -> Result<(), AggregateError>
    where
        I: IntoIterator<Item = Tick>,
    {
        for tick in ticks {
            self.push(tick).await?;
        }
        Ok(())
    }

    /// Seals the open bar once every tick queued before it is processed.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Closed`] if the consumer has stopped.
    pub async fn flush(&self) -> Result<(), AggregateError> {
        self.send(Command::Flush).await
    }

    /// Closes the queue, waits for the consumer to drain it and for the
    /// sink to finish.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError::Worker`] if the consumer panicked.
    pub async fn finish(self) -> Result<AggregationSummary, AggregateError> {
        drop(self.sender);
        Ok(self.consumer.await?)
    }

    async fn send(&self, command: Command) -> Result<(), AggregateError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| AggregateError::Closed)
    }
}

fn consume<S: BarSink>(
    mut receiver: mpsc::Receiver<Command>,
    mut aggregator: TickAggregator,
    mut sink: S,
    trailing: TrailingBar,
) -> AggregationSummary {
    let mut delivery = Delivery {
        bars: 0,
        error: None,
    };
    let mut ticks = 0u64;

    while let Some(command) = receiver.blocking_recv() {
        match command {
            Command::Tick(tick) => {
                ticks += 1;
                delivery.deliver_tick(&mut sink, &tick);
                if let Some(bar) = aggregator.push(tick) {
                    delivery.deliver(&mut sink, &bar);
                }
            }
            Command::Flush => {
                if let Some(bar) = aggregator.flush() {
                    delivery.deliver(&mut sink, &bar);
                }
            }
        }
    }

    if trailing == TrailingBar::Flush
        && let Some(bar) = aggregator.flush()
    {
        delivery.deliver(&mut sink, &bar);
    }

    if delivery.error.is_none()
        && let Err(e) = sink.finish()
    {
        tracing::error!(sink = sink.name(), "failed to finish output: {e}");
        delivery.error = Some(e);
    }

    tracing::debug!(
        sink = sink.name(),
        timeframe = %aggregator.timeframe(),
        ticks,
        bars = delivery.bars,
        "aggregation finished"
    );

    AggregationSummary {
        timeframe: aggregator.timeframe(),
        ticks,
        bars: delivery.bars,
        sink_error: delivery.error,
    }
}

struct Delivery {
    bars: u64,
    error: Option<ChronobarError>,
}

impl Delivery {
    fn deliver_tick<S: BarSink>(&mut self, sink: &mut S, tick: &Tick) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = sink.accept_tick(tick) {
            self.abandon(sink, e);
        }
    }

    fn deliver<S: BarSink>(&mut self, sink: &mut S, bar: &Bar) {
        if self.error.is_some() {
            return;
        }
        match sink.accept_bar(bar) {
            Ok(()) => self.bars += 1,
            Err(e) => self.abandon(sink, e),
        }
    }

    fn abandon<S: BarSink>(&mut self, sink: &S, error: ChronobarError) {
        tracing::error!(sink = sink.name(), "abandoning output: {error}");
        self.error = Some(error);
    }
}
