//! Field helpers shared by the fixed-layout binary formats.

use chrono::{DateTime, Utc};
use std::io::{self, Write};

/// Writes `value` as a NUL-terminated string in a field of `width` bytes.
///
/// Longer values are truncated so the field always ends with a NUL.
pub(crate) fn write_szchar<W: Write>(writer: &mut W, value: &str, width: usize) -> io::Result<()> {
    let bytes = value.as_bytes();
    let len = bytes.len().min(width.saturating_sub(1));
    writer.write_all(&bytes[..len])?;
    write_zeros(writer, width - len)
}

/// Reads a NUL-terminated string from a fixed-width field.
pub(crate) fn read_szchar(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Writes `count` zero bytes.
pub(crate) fn write_zeros<W: Write>(writer: &mut W, count: usize) -> io::Result<()> {
    const ZEROS: [u8; 64] = [0; 64];
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(ZEROS.len());
        writer.write_all(&ZEROS[..n])?;
        remaining -= n;
    }
    Ok(())
}

/// Converts a time to the unsigned 32-bit epoch seconds the MT4 formats use.
pub(crate) fn epoch_u32(time: DateTime<Utc>) -> u32 {
    u32::try_from(time.timestamp().max(0)).unwrap_or(u32::MAX)
}
