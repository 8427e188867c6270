//! Tick codec for the 20-byte bi5 record.

use byteorder::{BigEndian, ByteOrder};
use chrono::{DateTime, Utc};
use chronobar_types::{RawTick, Symbol, Tick};
use thiserror::Error;

/// Errors that can occur while decoding a single tick record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The record is not exactly [`RawTick::SIZE`] bytes long.
    #[error("Invalid tick record length: {0} bytes (expected {size})", size = RawTick::SIZE)]
    InvalidLength(usize),

    /// The record has the right size but its fields are unusable.
    #[error("Malformed tick record: {0}")]
    MalformedRecord(String),
}

/// Parses the fixed big-endian fields of a tick record.
///
/// The bi5 format stores ticks as 20 bytes in big-endian order:
/// - `i32`: milliseconds offset from hour start (bytes 0-3)
/// - `i32`: ask price raw (bytes 4-7)
/// - `i32`: bid price raw (bytes 8-11)
/// - `f32`: ask volume (bytes 12-15)
/// - `f32`: bid volume (bytes 16-19)
///
/// # Errors
///
/// Returns [`DecodeError::InvalidLength`] if `data` is not 20 bytes, and
/// [`DecodeError::MalformedRecord`] for negative or non-finite volumes.
pub fn parse_raw_tick(data: &[u8]) -> Result<RawTick, DecodeError> {
    if data.len() != RawTick::SIZE {
        return Err(DecodeError::InvalidLength(data.len()));
    }

    let raw = RawTick::new(
        BigEndian::read_i32(&data[0..4]),
        BigEndian::read_i32(&data[4..8]),
        BigEndian::read_i32(&data[8..12]),
        BigEndian::read_f32(&data[12..16]),
        BigEndian::read_f32(&data[16..20]),
    );

    check_volume("ask", raw.ask_volume)?;
    check_volume("bid", raw.bid_volume)?;
    Ok(raw)
}

/// Decodes one record into an absolute-time [`Tick`].
///
/// Pure: the same bytes, symbol and hour always produce the same tick.
///
/// # Errors
///
/// See [`parse_raw_tick`].
pub fn decode_tick(
    data: &[u8],
    symbol: &Symbol,
    hour_start: DateTime<Utc>,
) -> Result<Tick, DecodeError> {
    parse_raw_tick(data).map(|raw| raw.normalize(hour_start, symbol))
}

fn check_volume(side: &str, volume: f32) -> Result<(), DecodeError> {
    if !volume.is_finite() {
        return Err(DecodeError::MalformedRecord(format!(
            "{side} volume is not finite"
        )));
    }
    if volume < 0.0 {
        return Err(DecodeError::MalformedRecord(format!(
            "{side} volume is negative ({volume})"
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn encode_raw_tick(ms: i32, ask: i32, bid: i32, ask_vol: f32, bid_vol: f32) -> Vec<u8> {
    let mut bytes = vec![0u8; RawTick::SIZE];
    BigEndian::write_i32(&mut bytes[0..4], ms);
    BigEndian::write_i32(&mut bytes[4..8], ask);
    BigEndian::write_i32(&mut bytes[8..12], bid);
    BigEndian::write_f32(&mut bytes[12..16], ask_vol);
    BigEndian::write_f32(&mut bytes[16..20], bid_vol);
    bytes
}
