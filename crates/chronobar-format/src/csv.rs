//! CSV tick output.

use chrono::NaiveDate;
use chronobar_aggregate::{Bar, BarSink};
use chronobar_types::{Symbol, Tick};
use std::io::Write;

use crate::FormatError;

/// Column names written by the optional header row.
pub const CSV_HEADER: &str = "time,ask,bid,ask_volume,bid_volume";

/// Timestamp layout of the `time` column.
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Options for [`CsvEncoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Whether to write a header row.
    pub header: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { header: true }
    }
}

impl CsvOptions {
    /// Sets whether to write a header row.
    #[must_use]
    pub const fn with_header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }
}

/// Returns the CSV file name for a symbol and date range,
/// e.g. `EURUSD-2024-01-05-2024-01-05.csv`.
#[must_use]
pub fn csv_file_name(symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "{symbol}-{}-{}.csv",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    )
}

/// Writes one CSV row per tick as ticks reach the sink.
///
/// Rows follow the order ticks were received in. Prices use six decimals and
/// volumes are the integer units of the decoded tick. Sealed bars carry
/// nothing the encoder needs, so the aggregator keeps no window of ticks.
#[derive(Debug)]
pub struct CsvEncoder<W: Write> {
    writer: W,
    rows: u64,
}

impl<W: Write> CsvEncoder<W> {
    /// Creates an encoder, writing the header row if enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written.
    pub fn new(mut writer: W, options: CsvOptions) -> Result<Self, FormatError> {
        if options.header {
            writeln!(writer, "{CSV_HEADER}")?;
        }
        Ok(Self { writer, rows: 0 })
    }

    /// Writes one tick row.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_tick(&mut self, tick: &Tick) -> Result<(), FormatError> {
        writeln!(
            self.writer,
            "{},{:.6},{:.6},{},{}",
            tick.timestamp.format(TIME_FORMAT),
            tick.ask,
            tick.bid,
            tick.ask_volume,
            tick.bid_volume
        )?;
        self.rows += 1;
        Ok(())
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> BarSink for CsvEncoder<W> {
    fn accept_tick(&mut self, tick: &Tick) -> chronobar_types::Result<()> {
        Ok(self.write_tick(tick)?)
    }

    fn accept_bar(&mut self, _bar: &Bar) -> chronobar_types::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> chronobar_types::Result<()> {
        self.writer.flush()?;
        tracing::info!(rows = self.rows, "csv output complete");
        Ok(())
    }

    fn needs_ticks(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use chronobar_aggregate::{AggregatorConfig, BarAggregator, TrailingBar};
    use chronobar_types::Timeframe;
    use std::sync::{Arc, Mutex};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap()
    }

    fn tick(offset_ms: i64, bid: f64) -> Tick {
        Tick::new(
            Symbol::new("EURUSD").unwrap(),
            start() + TimeDelta::milliseconds(offset_ms),
            bid + 0.00002,
            bid,
            1_500_000,
            2,
        )
    }

    fn encode(options: CsvOptions, ticks: &[Tick]) -> String {
        let mut encoder = CsvEncoder::new(Vec::new(), options).unwrap();
        for tick in ticks {
            encoder.accept_tick(tick).unwrap();
        }
        encoder.finish().unwrap();
        String::from_utf8(encoder.into_inner()).unwrap()
    }

    #[derive(Debug, Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_csv_rows() {
        let ticks = [tick(45_123, 1.1), tick(59_999, 1.10001), tick(60_000, 1.2)];
        let output = encode(CsvOptions::default(), &ticks);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "2024-01-15 12:30:45.123,1.100020,1.100000,1500000,2"
        );
        assert!(lines[2].starts_with("2024-01-15 12:30:59.999,"));
        assert!(lines[3].starts_with("2024-01-15 12:31:00.000,"));
    }

    #[test]
    fn test_csv_no_header() {
        let output = encode(CsvOptions::default().with_header(false), &[tick(0, 1.1)]);

        assert_eq!(output.lines().count(), 1);
        assert!(!output.contains("time,ask"));
    }

    #[tokio::test]
    async fn test_csv_streams_ticks_of_dropped_trailing_bar() {
        let buffer = SharedBuffer::default();
        let encoder = CsvEncoder::new(buffer.clone(), CsvOptions::default()).unwrap();
        let config = AggregatorConfig::default().with_trailing(TrailingBar::Drop);
        let worker = BarAggregator::spawn(Timeframe::M1, encoder, config);

        worker
            .push_batch([tick(1_000, 1.1), tick(61_000, 1.2), tick(62_500, 1.3)])
            .await
            .unwrap();
        let summary = worker.finish().await.unwrap();
        assert!(summary.is_ok());
        assert_eq!(summary.bars, 1);

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2024-01-15 12:31:01.000,"));
        assert!(lines[3].starts_with("2024-01-15 12:31:02.500,"));
    }

    #[test]
    fn test_csv_zero_ticks() {
        assert_eq!(encode(CsvOptions::default(), &[]), format!("{CSV_HEADER}\n"));
        assert!(encode(CsvOptions::default().with_header(false), &[]).is_empty());
    }

    #[test]
    fn test_csv_file_name() {
        let symbol = Symbol::new("EURUSD").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(csv_file_name(&symbol, day, end), "EURUSD-2024-01-05-2024-01-07.csv");
    }
}
