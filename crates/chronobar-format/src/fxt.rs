//! MetaTrader 4 strategy tester data (`.fxt`, version 405) output.
//!
//! The 728-byte header is written up front with zeroed aggregates. Once the
//! last bar is known, [`BarSink::finish`] seeks back and patches the bar
//! count and bar times in place.

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use chronobar_aggregate::{Bar, BarSink};
use chronobar_types::{Symbol, Tick, Timeframe};
use std::io::{self, Seek, SeekFrom, Write};

use crate::FormatError;
use crate::layout::{epoch_u32, write_szchar};

/// FXT format version.
pub const FXT_VERSION: u32 = 405;

/// Size of the FXT header in bytes.
pub const FXT_HEADER_SIZE: usize = 728;

/// Size of one FXT tick record in bytes.
pub const FXT_TICK_SIZE: usize = 56;

/// Byte offsets of the FXT header fields.
pub mod offsets {
    #![allow(missing_docs)]

    pub const VERSION: usize = 0;
    pub const DESCRIPTION: usize = 4;
    pub const SERVER_NAME: usize = 68;
    pub const SYMBOL: usize = 196;
    pub const PERIOD: usize = 208;
    pub const MODEL_TYPE: usize = 212;
    pub const MODELED_BARS: usize = 216;
    pub const FIRST_BAR_TIME: usize = 220;
    pub const LAST_BAR_TIME: usize = 224;
    pub const MODEL_QUALITY: usize = 232;
    pub const BASE_CURRENCY: usize = 240;
    pub const SPREAD: usize = 252;
    pub const DIGITS: usize = 256;
    pub const POINT_SIZE: usize = 264;
    pub const MIN_LOT: usize = 272;
    pub const MAX_LOT: usize = 276;
    pub const LOT_STEP: usize = 280;
    pub const STOPS_LEVEL: usize = 284;
    pub const PENDINGS_GTC: usize = 288;
    pub const CONTRACT_SIZE: usize = 296;
    pub const TICK_VALUE: usize = 304;
    pub const TICK_SIZE: usize = 312;
    pub const PROFIT_MODE: usize = 320;
    pub const SWAP_ENABLED: usize = 324;
    pub const SWAP_MODE: usize = 328;
    pub const SWAP_LONG: usize = 336;
    pub const SWAP_SHORT: usize = 344;
    pub const TRIPLE_ROLLOVER_DAY: usize = 352;
    pub const LEVERAGE: usize = 356;
    pub const FREE_MARGIN_MODE: usize = 360;
    pub const MARGIN_MODE: usize = 364;
    pub const STOPOUT_LEVEL: usize = 368;
    pub const STOPOUT_TYPE: usize = 372;
    pub const MARGIN_INIT: usize = 376;
    pub const MARGIN_MAINTENANCE: usize = 384;
    pub const MARGIN_HEDGED: usize = 392;
    pub const MARGIN_DIVIDER: usize = 400;
    pub const MARGIN_CURRENCY: usize = 408;
    pub const COMMISSION_VALUE: usize = 424;
    pub const COMMISSION_MODE: usize = 432;
    pub const COMMISSION_TYPE: usize = 436;
    pub const FIRST_BAR: usize = 440;
    pub const LAST_BAR: usize = 444;
    pub const START_PERIOD_M1: usize = 448;
    pub const TESTER_FROM: usize = 472;
    pub const TESTER_TO: usize = 476;
    pub const FREEZE_DISTANCE: usize = 480;
    pub const MODEL_ERRORS: usize = 484;
    pub const RESERVED: usize = 488;
}

const DESCRIPTION_WIDTH: usize = 64;
const SERVER_NAME_WIDTH: usize = 128;
const SYMBOL_WIDTH: usize = 12;

/// Tester modelling mode, encoded in the header and the file name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FxtModel {
    /// One record per tick, carrying the bar built so far.
    EveryTick,
    /// One record per bar.
    ControlPoints,
    /// One record per bar.
    #[default]
    OpenPrices,
}

impl FxtModel {
    /// Returns the model number (0, 1 or 2).
    #[must_use]
    pub const fn number(&self) -> u32 {
        match self {
            Self::EveryTick => 0,
            Self::ControlPoints => 1,
            Self::OpenPrices => 2,
        }
    }
}

/// Returns the FXT file name, e.g. `EURUSD1_2.fxt`.
#[must_use]
pub fn fxt_file_name(symbol: &Symbol, timeframe: Timeframe, model: FxtModel) -> String {
    format!("{symbol}{}_{}.fxt", timeframe.minutes(), model.number())
}

/// Options for [`FxtEncoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FxtOptions {
    /// Spread in points.
    pub spread: u32,
    /// Modelling mode.
    pub model: FxtModel,
    /// Account leverage.
    pub leverage: u32,
    /// Account server name.
    pub server: String,
    /// Copyright/description string.
    pub description: String,
}

impl Default for FxtOptions {
    fn default() -> Self {
        Self {
            spread: 0,
            model: FxtModel::default(),
            leverage: 100,
            server: "Dukascopy".to_string(),
            description: "Copyright 2001-2017, MetaQuotes Software Corp.".to_string(),
        }
    }
}

impl FxtOptions {
    /// Sets the spread in points.
    #[must_use]
    pub const fn with_spread(mut self, spread: u32) -> Self {
        self.spread = spread;
        self
    }

    /// Sets the modelling mode.
    #[must_use]
    pub const fn with_model(mut self, model: FxtModel) -> Self {
        self.model = model;
        self
    }

    /// Sets the account leverage.
    #[must_use]
    pub const fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = leverage;
        self
    }

    /// Sets the account server name.
    #[must_use]
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }
}

/// Builds the header with zeroed aggregates.
///
/// # Errors
///
/// Returns an error only if a string field cannot be written into the buffer.
pub fn fxt_header(
    symbol: &Symbol,
    timeframe: Timeframe,
    options: &FxtOptions,
) -> io::Result<[u8; FXT_HEADER_SIZE]> {
    use offsets::*;

    let mut h = [0u8; FXT_HEADER_SIZE];
    let put_u32 = |h: &mut [u8; FXT_HEADER_SIZE], at: usize, v: u32| {
        LittleEndian::write_u32(&mut h[at..at + 4], v);
    };
    let put_f64 = |h: &mut [u8; FXT_HEADER_SIZE], at: usize, v: f64| {
        LittleEndian::write_f64(&mut h[at..at + 8], v);
    };

    put_u32(&mut h, VERSION, FXT_VERSION);
    write_szchar(&mut &mut h[DESCRIPTION..], &options.description, DESCRIPTION_WIDTH)?;
    write_szchar(&mut &mut h[SERVER_NAME..], &options.server, SERVER_NAME_WIDTH)?;
    write_szchar(&mut &mut h[SYMBOL..], symbol.as_str(), SYMBOL_WIDTH)?;
    put_u32(&mut h, PERIOD, timeframe.minutes());
    put_u32(&mut h, MODEL_TYPE, options.model.number());
    put_f64(&mut h, MODEL_QUALITY, 99.9);

    write_szchar(&mut &mut h[BASE_CURRENCY..], symbol.base_currency(), SYMBOL_WIDTH)?;
    put_u32(&mut h, SPREAD, options.spread);
    put_u32(&mut h, DIGITS, symbol.digits());
    put_f64(&mut h, POINT_SIZE, symbol.point());
    put_u32(&mut h, MIN_LOT, 1);
    put_u32(&mut h, MAX_LOT, 50_000);
    put_u32(&mut h, LOT_STEP, 1);
    put_u32(&mut h, STOPS_LEVEL, 10);
    put_u32(&mut h, PENDINGS_GTC, 1);

    put_f64(&mut h, CONTRACT_SIZE, 100_000.0);
    put_u32(&mut h, TRIPLE_ROLLOVER_DAY, 3);

    put_u32(&mut h, LEVERAGE, options.leverage);
    put_u32(&mut h, FREE_MARGIN_MODE, 1);
    put_u32(&mut h, STOPOUT_LEVEL, 30);
    put_f64(&mut h, MARGIN_HEDGED, 50_000.0);
    put_f64(&mut h, MARGIN_DIVIDER, 1.25);
    write_szchar(&mut &mut h[MARGIN_CURRENCY..], symbol.quote_currency(), SYMBOL_WIDTH)?;

    put_u32(&mut h, COMMISSION_MODE, 1);
    put_u32(&mut h, FIRST_BAR, 1);

    Ok(h)
}

/// One 56-byte FXT tick record.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FxtRecord {
    bar_time: u32,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    tick_time: u32,
}

impl FxtRecord {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.bar_time)?;
        writer.write_u32::<LittleEndian>(0)?;
        writer.write_f64::<LittleEndian>(self.open)?;
        writer.write_f64::<LittleEndian>(self.high)?;
        writer.write_f64::<LittleEndian>(self.low)?;
        writer.write_f64::<LittleEndian>(self.close)?;
        writer.write_u64::<LittleEndian>(self.volume)?;
        writer.write_u32::<LittleEndian>(self.tick_time)?;
        // launch expert
        writer.write_u32::<LittleEndian>(1)
    }
}

/// Writes sealed bars as an FXT tester file.
#[derive(Debug)]
pub struct FxtEncoder<W: Write + Seek> {
    writer: W,
    model: FxtModel,
    bars: u32,
    records: u64,
    first_bar_time: u32,
    last_bar_time: u32,
}

impl<W: Write + Seek> FxtEncoder<W> {
    /// Creates an encoder and writes the placeholder header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(
        mut writer: W,
        symbol: &Symbol,
        timeframe: Timeframe,
        options: &FxtOptions,
    ) -> Result<Self, FormatError> {
        writer.write_all(&fxt_header(symbol, timeframe, options)?)?;
        Ok(Self {
            writer,
            model: options.model,
            bars: 0,
            records: 0,
            first_bar_time: 0,
            last_bar_time: 0,
        })
    }

    /// Returns the number of distinct bars written.
    #[must_use]
    pub const fn bars(&self) -> u32 {
        self.bars
    }

    /// Returns the number of tick records written.
    #[must_use]
    pub const fn records(&self) -> u64 {
        self.records
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_record(&mut self, record: &FxtRecord) -> io::Result<()> {
        record.write_to(&mut self.writer)?;
        self.records += 1;
        Ok(())
    }

    fn write_every_tick(&mut self, bar_time: u32, ticks: &[Tick]) -> io::Result<()> {
        let Some(first) = ticks.first() else {
            return Ok(());
        };
        let mut record = FxtRecord {
            bar_time,
            open: first.bid,
            high: first.bid,
            low: first.bid,
            close: first.bid,
            volume: 0,
            tick_time: 0,
        };
        let mut volume = 0u64;

        for tick in ticks {
            volume = volume.saturating_add(tick.bid_volume);
            record.high = record.high.max(tick.bid);
            record.low = record.low.min(tick.bid);
            record.close = tick.bid;
            record.volume = volume.max(1);
            record.tick_time = epoch_u32(tick.timestamp);
            self.write_record(&record)?;
        }
        Ok(())
    }

    fn patch(&mut self, offset: usize, values: &[u32]) -> Result<(), FormatError> {
        let mut bytes = Vec::with_capacity(values.len() * 4);
        for &value in values {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        let offset = offset as u64;
        self.writer
            .seek(SeekFrom::Start(offset))
            .and_then(|_| self.writer.write_all(&bytes))
            .map_err(|source| FormatError::BackPatch { offset, source })
    }

    /// Rewrites the bar count, bar times and tester dates in the header.
    fn back_patch(&mut self) -> Result<(), FormatError> {
        self.patch(
            offsets::MODELED_BARS,
            &[self.bars, self.first_bar_time, self.last_bar_time],
        )?;
        self.patch(
            offsets::TESTER_FROM,
            &[self.first_bar_time, self.last_bar_time],
        )?;
        self.writer
            .seek(SeekFrom::End(0))
            .and_then(|_| self.writer.flush())
            .map_err(|source| FormatError::BackPatch {
                offset: offsets::TESTER_TO as u64,
                source,
            })
    }
}

impl<W: Write + Seek + Send> BarSink for FxtEncoder<W> {
    fn accept_bar(&mut self, bar: &Bar) -> chronobar_types::Result<()> {
        let bar_time = epoch_u32(bar.time);
        match self.model {
            FxtModel::EveryTick if !bar.ticks.is_empty() => {
                self.write_every_tick(bar_time, &bar.ticks)?;
            }
            _ => self.write_record(&FxtRecord {
                bar_time,
                open: bar.ohlcv.open,
                high: bar.ohlcv.high,
                low: bar.ohlcv.low,
                close: bar.ohlcv.close,
                volume: bar.ohlcv.volume_or_one(),
                tick_time: bar_time,
            })?,
        }

        if self.bars == 0 {
            self.first_bar_time = bar_time;
        }
        self.last_bar_time = bar_time;
        self.bars += 1;
        Ok(())
    }

    fn finish(&mut self) -> chronobar_types::Result<()> {
        self.writer.flush()?;
        if self.bars == 0 {
            tracing::info!("fxt output has no bars, header left unpatched");
            return Ok(());
        }
        self.back_patch()?;
        tracing::info!(bars = self.bars, records = self.records, "fxt output complete");
        Ok(())
    }

    fn needs_ticks(&self) -> bool {
        self.model == FxtModel::EveryTick
    }

    fn name(&self) -> &str {
        "fxt"
    }
}
