//! Aggregation errors.

use thiserror::Error;

/// Errors raised by the aggregation worker itself.
///
/// Encoder failures are not worker errors; they are reported through
/// [`AggregationSummary::sink_error`](crate::AggregationSummary::sink_error).
#[derive(Error, Debug)]
pub enum AggregateError {
    /// The consumer stopped before the producer finished.
    #[error("Aggregation queue closed")]
    Closed,

    /// The consumer task panicked or was cancelled.
    #[error("Aggregation worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}
