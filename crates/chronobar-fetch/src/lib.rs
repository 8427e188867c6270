//! Fetching and decoding of hourly bi5 tick payloads.
//!
//! This crate turns one hour of archive data into ticks:
//!
//! - [`HourSource`] - Anything that supplies an hour's compressed payload
//! - [`DownloadClient`] - HTTP source with connection pooling
//! - [`ArchiveSource`] - Replays a previously archived directory tree
//! - [`decompress_frames`] - LZMA decompression into 20-byte frames
//! - [`decode_tick`] - The tick codec
//! - [`HourlyDecoder`] - Decode plus raw pass-through archival of one hour

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod archive;
mod client;
mod decompress;
mod hourly;
mod parse;
mod source;
pub mod url;

pub use archive::{
    ARCHIVE_EXTENSION, ArchiveOutcome, ArchiveSource, day_dir, hour_file_name, hour_path,
    save_raw,
};
pub use client::{ClientConfig, DownloadClient, DownloadError};
pub use decompress::{DecompressError, StreamStatus, TickFrames, decompress_frames};
pub use hourly::{DecodeOutcome, HourBatch, HourlyDecoder, decode_hour};
pub use parse::{DecodeError, decode_tick, parse_raw_tick};
pub use source::HourSource;
