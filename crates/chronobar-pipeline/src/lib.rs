//! Day orchestration for chronobar.
//!
//! A [`Pipeline`] walks a date range one day at a time. For every day it
//! fetches the 24 hours concurrently from an
//! [`HourSource`](chronobar_fetch::HourSource), decodes and archives them,
//! and feeds the ticks to one bar aggregator per output file.

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod outputs;
mod pipeline;
mod report;

pub use config::{HOURS_PER_DAY, HourOrdering, OutputScope, PipelineConfig};
pub use pipeline::Pipeline;
pub use report::{DayReport, HourReport, HourStatus, OutputReport, RunReport};
