//! Output encoders for chronobar.
//!
//! Every encoder implements [`BarSink`](chronobar_aggregate::BarSink):
//!
//! - [`CsvEncoder`] - Tick rows, one file for all timeframes
//! - [`HstEncoder`] - MetaTrader 4 history bars (v401)
//! - [`FxtEncoder`] - MetaTrader 4 tester data (v405) with a back-patched header

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod csv;
mod error;
mod format;
pub mod fxt;
mod hst;
mod layout;

pub use crate::csv::{CSV_HEADER, CsvEncoder, CsvOptions, csv_file_name};
pub use error::FormatError;
pub use format::OutputFormat;
pub use fxt::{
    FXT_HEADER_SIZE, FXT_TICK_SIZE, FXT_VERSION, FxtEncoder, FxtModel, FxtOptions, fxt_file_name,
    fxt_header,
};
pub use hst::{
    HST_BAR_SIZE, HST_HEADER_SIZE, HST_VERSION, HstBar, HstEncoder, HstHeader, HstOptions,
    hst_file_name, read_hst,
};
