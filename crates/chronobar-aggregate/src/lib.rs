//! Tick-to-bar aggregation for chronobar.
//!
//! This crate turns an ordered tick stream into closed OHLCV bars:
//!
//! - [`Ohlcv`] - Bid-side OHLCV bar data
//! - [`TickAggregator`] - Synchronous aggregation state machine
//! - [`BarSink`] - The capability shared by every output encoder
//! - [`BarAggregator`] - Background worker with a bounded tick queue

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod aggregator;
mod bar;
mod error;
mod ohlcv;
mod sink;
mod worker;

pub use aggregator::TickAggregator;
pub use bar::{Bar, BarLabel, TrailingBar};
pub use error::AggregateError;
pub use ohlcv::Ohlcv;
pub use sink::{BarSink, CollectSink};
pub use worker::{AggregationSummary, AggregatorConfig, BarAggregator, DEFAULT_QUEUE_CAPACITY};
