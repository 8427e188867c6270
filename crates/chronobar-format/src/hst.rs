//! MetaTrader 4 history (`.hst`, version 401) output.
//!
//! Layout, little-endian:
//!
//! | field | offset | width |
//! |---|---|---|
//! | version | 0 | 4 |
//! | copyright | 4 | 64 |
//! | symbol | 68 | 12 |
//! | period (minutes) | 80 | 4 |
//! | digits | 84 | 4 |
//! | time sign | 88 | 4 |
//! | last sync | 92 | 4 |
//! | unused | 96 | 52 |
//!
//! followed by 60-byte bars: `time u32, pad u32, open, low, high, close f64,
//! volume u64, spread u32, real_volume u64`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, Utc};
use chronobar_aggregate::{Bar, BarSink};
use chronobar_types::{Symbol, Timeframe};
use std::io::{self, Read, Write};

use crate::FormatError;
use crate::layout::{epoch_u32, read_szchar, write_szchar, write_zeros};

/// HST format version.
pub const HST_VERSION: u32 = 401;

/// Size of the HST header in bytes.
pub const HST_HEADER_SIZE: usize = 148;

/// Size of one HST bar record in bytes.
pub const HST_BAR_SIZE: usize = 60;

const COPYRIGHT: &str = "(C)opyright 2017, MetaQuotes Software Corp.";
const COPYRIGHT_WIDTH: usize = 64;
const SYMBOL_WIDTH: usize = 12;
const UNUSED_WIDTH: usize = 52;

/// Returns the HST file name, e.g. `EURUSD60.hst`.
#[must_use]
pub fn hst_file_name(symbol: &Symbol, timeframe: Timeframe) -> String {
    format!("{symbol}{}.hst", timeframe.minutes())
}

/// Options for [`HstEncoder`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HstOptions {
    /// Spread written into every bar record.
    pub spread: u32,
    /// Header creation time; the current time when unset.
    pub created: Option<DateTime<Utc>>,
}

impl HstOptions {
    /// Sets the spread written into every bar.
    #[must_use]
    pub const fn with_spread(mut self, spread: u32) -> Self {
        self.spread = spread;
        self
    }

    /// Fixes the header creation time.
    #[must_use]
    pub const fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }
}

/// The 148-byte HST header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HstHeader {
    /// Format version (401).
    pub version: u32,
    /// Copyright string.
    pub copyright: String,
    /// Symbol name.
    pub symbol: String,
    /// Bar period in minutes.
    pub period: u32,
    /// Price decimals.
    pub digits: u32,
    /// Creation time.
    pub time_sign: u32,
    /// Last synchronization time.
    pub last_sync: u32,
}

impl HstHeader {
    /// Builds the header for a symbol and timeframe.
    #[must_use]
    pub fn new(symbol: &Symbol, timeframe: Timeframe, created: DateTime<Utc>) -> Self {
        let created = epoch_u32(created);
        Self {
            version: HST_VERSION,
            copyright: COPYRIGHT.to_string(),
            symbol: symbol.to_string(),
            period: timeframe.minutes(),
            digits: symbol.digits(),
            time_sign: created,
            last_sync: created,
        }
    }

    /// Serializes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.version)?;
        write_szchar(writer, &self.copyright, COPYRIGHT_WIDTH)?;
        write_szchar(writer, &self.symbol, SYMBOL_WIDTH)?;
        writer.write_u32::<LittleEndian>(self.period)?;
        writer.write_u32::<LittleEndian>(self.digits)?;
        writer.write_u32::<LittleEndian>(self.time_sign)?;
        writer.write_u32::<LittleEndian>(self.last_sync)?;
        write_zeros(writer, UNUSED_WIDTH)
    }

    /// Parses a header.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is shorter than a header.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let version = reader.read_u32::<LittleEndian>()?;
        let mut copyright = [0u8; COPYRIGHT_WIDTH];
        reader.read_exact(&mut copyright)?;
        let mut symbol = [0u8; SYMBOL_WIDTH];
        reader.read_exact(&mut symbol)?;
        let period = reader.read_u32::<LittleEndian>()?;
        let digits = reader.read_u32::<LittleEndian>()?;
        let time_sign = reader.read_u32::<LittleEndian>()?;
        let last_sync = reader.read_u32::<LittleEndian>()?;
        let mut unused = [0u8; UNUSED_WIDTH];
        reader.read_exact(&mut unused)?;

        Ok(Self {
            version,
            copyright: read_szchar(&copyright),
            symbol: read_szchar(&symbol),
            period,
            digits,
            time_sign,
            last_sync,
        })
    }
}

/// One 60-byte HST bar record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HstBar {
    /// Bar time in epoch seconds.
    pub time: u32,
    /// Open price.
    pub open: f64,
    /// Low price.
    pub low: f64,
    /// High price.
    pub high: f64,
    /// Close price.
    pub close: f64,
    /// Tick volume, at least one.
    pub volume: u64,
    /// Spread.
    pub spread: u32,
    /// Summed volume.
    pub real_volume: u64,
}

impl HstBar {
    /// Builds the record for a sealed bar.
    #[must_use]
    pub fn from_bar(bar: &Bar, spread: u32) -> Self {
        Self {
            time: epoch_u32(bar.time),
            open: bar.ohlcv.open,
            low: bar.ohlcv.low,
            high: bar.ohlcv.high,
            close: bar.ohlcv.close,
            volume: bar.ohlcv.volume_or_one(),
            spread,
            real_volume: bar.ohlcv.volume,
        }
    }

    /// Serializes the record.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.time)?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_f64::<LittleEndian>(self.open)?;
        writer.write_f64::<LittleEndian>(self.low)?;
        writer.write_f64::<LittleEndian>(self.high)?;
        writer.write_f64::<LittleEndian>(self.close)?;
        writer.write_u64::<LittleEndian>(self.volume)?;
        writer.write_u32::<LittleEndian>(self.spread)?;
        writer.write_u64::<LittleEndian>(self.real_volume)
    }

    /// Parses a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is shorter than a record.
    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let time = reader.read_u32::<LittleEndian>()?;
        let _pad = reader.read_u32::<LittleEndian>()?;
        Ok(Self {
            time,
            open: reader.read_f64::<LittleEndian>()?,
            low: reader.read_f64::<LittleEndian>()?,
            high: reader.read_f64::<LittleEndian>()?,
            close: reader.read_f64::<LittleEndian>()?,
            volume: reader.read_u64::<LittleEndian>()?,
            spread: reader.read_u32::<LittleEndian>()?,
            real_volume: reader.read_u64::<LittleEndian>()?,
        })
    }
}

/// Parses a complete HST stream into its header and bars.
///
/// A trailing partial record is ignored.
///
/// # Errors
///
/// Returns an error if the header cannot be read.
pub fn read_hst<R: Read>(mut reader: R) -> io::Result<(HstHeader, Vec<HstBar>)> {
    let header = HstHeader::read_from(&mut reader)?;
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;

    let bars = rest
        .chunks_exact(HST_BAR_SIZE)
        .map(|mut record| HstBar::read_from(&mut record))
        .collect::<io::Result<Vec<_>>>()?;
    Ok((header, bars))
}

/// Writes sealed bars as an HST history file.
///
/// The header is written on construction, so a run without bars leaves a
/// header-only file.
#[derive(Debug)]
pub struct HstEncoder<W: Write> {
    writer: W,
    spread: u32,
    bars: u64,
}

impl<W: Write> HstEncoder<W> {
    /// Creates an encoder and writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(
        mut writer: W,
        symbol: &Symbol,
        timeframe: Timeframe,
        options: HstOptions,
    ) -> Result<Self, FormatError> {
        let created = options.created.unwrap_or_else(Utc::now);
        HstHeader::new(symbol, timeframe, created).write_to(&mut writer)?;
        Ok(Self {
            writer,
            spread: options.spread,
            bars: 0,
        })
    }

    /// Returns the number of bars written.
    #[must_use]
    pub const fn bars(&self) -> u64 {
        self.bars
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> BarSink for HstEncoder<W> {
    fn accept_bar(&mut self, bar: &Bar) -> chronobar_types::Result<()> {
        HstBar::from_bar(bar, self.spread).write_to(&mut self.writer)?;
        self.bars += 1;
        Ok(())
    }

    fn finish(&mut self) -> chronobar_types::Result<()> {
        self.writer.flush()?;
        tracing::info!(bars = self.bars, "hst output complete");
        Ok(())
    }

    fn needs_ticks(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "hst"
    }
}
