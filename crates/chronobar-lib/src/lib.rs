//! Download Dukascopy ticks and convert them to CSV, HST and FXT bar files.
//!
//! This is a facade crate that re-exports the chronobar workspace crates.
//!
//! # Quick Start
//!
//! ```ignore
//! use chronobar_lib::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let symbol = Symbol::new("EURUSD")?;
//!     let config = PipelineConfig::new("data", symbol)
//!         .with_format(OutputFormat::Hst)
//!         .with_timeframes(Timeframe::parse_list("M1,H1"));
//!     let pipeline = Pipeline::new(config, Arc::new(DownloadClient::with_defaults()?))?;
//!
//!     let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
//!     let report = pipeline.run(DateRange::single_day(day)).await;
//!     println!("{} ticks", report.ticks());
//!     Ok(())
//! }
//! ```

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use chronobar_types::*;

#[cfg(feature = "fetch")]
pub use chronobar_fetch::{
    ArchiveSource, ClientConfig, DecodeError, DecodeOutcome, DecompressError, DownloadClient,
    DownloadError, HourBatch, HourSource, HourlyDecoder, decode_hour, decode_tick,
};

#[cfg(feature = "aggregate")]
pub use chronobar_aggregate::{
    AggregateError, AggregationSummary, AggregatorConfig, Bar, BarAggregator, BarLabel, BarSink,
    CollectSink, Ohlcv, TickAggregator, TrailingBar,
};

#[cfg(feature = "format")]
pub use chronobar_format::{
    CsvEncoder, CsvOptions, FormatError, FxtEncoder, FxtModel, FxtOptions, HstEncoder, HstOptions,
    OutputFormat, read_hst,
};

#[cfg(feature = "pipeline")]
pub use chronobar_pipeline::{
    DayReport, HourOrdering, HourReport, HourStatus, OutputReport, OutputScope, Pipeline,
    PipelineConfig, RunReport,
};

/// Prelude module for convenient imports.
///
/// ```
/// use chronobar_lib::prelude::*;
/// ```
pub mod prelude {
    pub use chronobar_types::{
        ChronobarError, DateRange, DateRangeError, Result, Symbol, Tick, Timeframe,
    };

    #[cfg(feature = "fetch")]
    pub use chronobar_fetch::{ArchiveSource, ClientConfig, DownloadClient, HourSource};

    #[cfg(feature = "aggregate")]
    pub use chronobar_aggregate::{Bar, BarLabel, BarSink, TickAggregator, TrailingBar};

    #[cfg(feature = "format")]
    pub use chronobar_format::{CsvOptions, FxtModel, FxtOptions, HstOptions, OutputFormat};

    #[cfg(feature = "pipeline")]
    pub use chronobar_pipeline::{
        DayReport, HourOrdering, OutputScope, Pipeline, PipelineConfig, RunReport,
    };
}
