//! Error types for chronobar.

use chrono::NaiveDate;
use thiserror::Error;

use crate::SymbolError;

/// Result type alias for chronobar operations.
pub type Result<T> = std::result::Result<T, ChronobarError>;

/// Errors that can occur while fetching, decoding, aggregating and encoding.
#[derive(Error, Debug)]
pub enum ChronobarError {
    /// Invalid run configuration (bad date range, empty symbol, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Fetching an hour from the archive failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Decompressing or decoding tick data failed.
    #[error("Decode error: {0}")]
    Decode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output encoder error.
    #[error("Format error: {0}")]
    Format(String),

    /// Rewriting the aggregate fields of an already written header failed.
    ///
    /// The affected file is structurally valid but its bar count and bar
    /// times are still zero.
    #[error("Header back-patch failed: {0}")]
    BackPatch(String),

    /// Invalid date range.
    #[error(transparent)]
    DateRange(#[from] DateRangeError),

    /// Invalid symbol.
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

impl ChronobarError {
    /// Returns true if this error left an output file with an unpatched header.
    #[must_use]
    pub const fn is_back_patch(&self) -> bool {
        matches!(self, Self::BackPatch(_))
    }
}

/// Error for invalid date ranges.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    /// Start date is after end date.
    #[error("Invalid date range: {start} > {end}")]
    InvalidRange {
        /// The start date.
        start: NaiveDate,
        /// The end date.
        end: NaiveDate,
    },
}
