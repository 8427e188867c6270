//! LZMA decompression of bi5 payloads into tick-sized frames.

use chronobar_types::RawTick;
use lzma_rs::lzma_decompress;
use std::io::BufReader;
use std::slice::ChunksExact;
use thiserror::Error;

/// Errors that can occur during decompression.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecompressError {
    /// LZMA decompression failed.
    #[error("LZMA decompression failed: {0}")]
    Lzma(String),
}

/// How decompression of a payload ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// The stream ended exactly on a frame boundary.
    Complete,
    /// The stream ended cleanly with a partial frame, which was dropped.
    TrailingBytes(usize),
    /// The decompressor failed; only frames produced before the failure are kept.
    Interrupted(DecompressError),
}

/// Decompressed tick frames of one payload.
///
/// Holds only whole [`RawTick::SIZE`]-byte frames.
#[derive(Debug, Clone)]
pub struct TickFrames {
    data: Vec<u8>,
    status: StreamStatus,
}

impl TickFrames {
    /// Returns the frames in stream order.
    pub fn frames(&self) -> ChunksExact<'_, u8> {
        self.data.chunks_exact(RawTick::SIZE)
    }

    /// Returns the number of whole frames.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.data.len() / RawTick::SIZE
    }

    /// Returns true if no whole frame was decompressed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns how the stream ended.
    #[must_use]
    pub const fn status(&self) -> &StreamStatus {
        &self.status
    }
}

/// Decompresses an LZMA-alone bi5 payload into tick frames.
///
/// Dukascopy bi5 files are `.lzma` streams (5-byte properties header plus
/// 8-byte unpacked size) whose output is a sequence of 20-byte tick records.
/// Never fails outright: an empty payload yields no frames, and a decoder
/// error is reported through [`StreamStatus::Interrupted`] alongside whatever
/// output the decoder had flushed.
#[must_use]
pub fn decompress_frames(compressed: &[u8]) -> TickFrames {
    if compressed.is_empty() {
        return TickFrames {
            data: Vec::new(),
            status: StreamStatus::Complete,
        };
    }

    let mut data = Vec::with_capacity(compressed.len() * 4);
    let mut reader = BufReader::new(compressed);

    let result = lzma_decompress(&mut reader, &mut data);
    let trailing = data.len() % RawTick::SIZE;
    data.truncate(data.len() - trailing);

    let status = match result {
        Ok(()) if trailing == 0 => StreamStatus::Complete,
        Ok(()) => StreamStatus::TrailingBytes(trailing),
        Err(e) => StreamStatus::Interrupted(DecompressError::Lzma(e.to_string())),
    };

    TickFrames { data, status }
}

#[cfg(test)]
pub(crate) fn compress(data: &[u8]) -> Vec<u8> {
    let mut compressed = Vec::new();
    lzma_rs::lzma_compress(&mut BufReader::new(data), &mut compressed).unwrap();
    compressed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::encode_raw_tick;

    #[test]
    fn test_empty_input() {
        let frames = decompress_frames(&[]);
        assert!(frames.is_empty());
        assert_eq!(frames.status(), &StreamStatus::Complete);
    }

    #[test]
    fn test_invalid_lzma() {
        let frames = decompress_frames(&[0x00, 0x01, 0x02, 0x03]);
        assert!(frames.is_empty());
        assert!(matches!(frames.status(), StreamStatus::Interrupted(_)));
    }

    #[test]
    fn test_whole_frames() {
        let mut raw = encode_raw_tick(0, 100, 99, 1.0, 1.0);
        raw.extend(encode_raw_tick(10, 101, 100, 1.0, 1.0));
        raw.extend(encode_raw_tick(20, 102, 101, 1.0, 1.0));

        let frames = decompress_frames(&compress(&raw));
        assert_eq!(frames.len(), 3);
        assert_eq!(frames.status(), &StreamStatus::Complete);

        let collected: Vec<u8> = frames.frames().flatten().copied().collect();
        assert_eq!(collected, raw);
    }

    #[test]
    fn test_trailing_partial_frame_dropped() {
        let mut raw = encode_raw_tick(0, 100, 99, 1.0, 1.0);
        raw.extend(encode_raw_tick(10, 101, 100, 1.0, 1.0));
        raw.extend([0xAB; 7]);

        let frames = decompress_frames(&compress(&raw));
        assert_eq!(frames.len(), 2);
        assert_eq!(frames.status(), &StreamStatus::TrailingBytes(7));
    }

    #[test]
    fn test_truncated_payload_is_interrupted() {
        let raw: Vec<u8> = (0..200)
            .flat_map(|i| encode_raw_tick(i * 10, 100 + i, 99 + i, 1.0, 1.0))
            .collect();
        let compressed = compress(&raw);

        let frames = decompress_frames(&compressed[..compressed.len() / 2]);
        assert!(matches!(frames.status(), StreamStatus::Interrupted(_)));
        assert!(frames.len() < 200);
    }
}
