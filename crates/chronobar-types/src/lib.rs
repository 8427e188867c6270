//! Core types for the chronobar tick converter.
//!
//! This crate provides the fundamental data structures used throughout chronobar:
//!
//! - [`Tick`] - A decoded quote with absolute timestamp, prices and volumes
//! - [`RawTick`] - The 20-byte bi5 tick record before price normalization
//! - [`Symbol`] - Instrument code with its point divisor
//! - [`Timeframe`] - Bar window specification (`M1`, `H4`, `MN1`, ...)
//! - [`DateRange`] - Inclusive range of UTC calendar days

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod date_range;
mod error;
mod symbol;
mod tick;
mod timeframe;

pub use date_range::{DateRange, DayIterator, HourIterator, day_start, is_saturday};
pub use error::{ChronobarError, DateRangeError, Result};
pub use symbol::{Symbol, SymbolError};
pub use tick::{RawTick, Tick};
pub use timeframe::{PeriodUnit, Timeframe, TimeframeParseError};
