//! Encoder errors.

use chronobar_types::ChronobarError;
use thiserror::Error;

/// Errors that can occur while encoding bars.
#[derive(Error, Debug)]
pub enum FormatError {
    /// Unknown output format.
    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// I/O error while writing records.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Rewriting the FXT header after the last bar failed.
    #[error("Back-patch at offset {offset} failed: {source}")]
    BackPatch {
        /// Header offset being rewritten.
        offset: u64,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl From<FormatError> for ChronobarError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::Io(e) => Self::Io(e),
            e @ FormatError::BackPatch { .. } => Self::BackPatch(e.to_string()),
            e @ FormatError::UnknownFormat(_) => Self::InvalidInput(e.to_string()),
        }
    }
}
