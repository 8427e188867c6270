//! Day-by-day orchestration: fetch, decode, archive, aggregate, encode.

use chrono::{DateTime, NaiveDate, Utc};
use chronobar_fetch::{DecodeOutcome, HourBatch, HourSource, HourlyDecoder, day_dir};
use chronobar_types::{DateRange, HourIterator, Result, is_saturday};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::outputs::Outputs;
use crate::{DayReport, HourOrdering, HourReport, HourStatus, OutputScope, PipelineConfig, RunReport};

/// One hour as it comes back from a worker.
#[derive(Debug)]
struct FetchedHour {
    batch: HourBatch,
    fetch_error: Option<String>,
}

impl FetchedHour {
    fn report(&self) -> HourReport {
        let status = self.fetch_error.as_ref().map_or_else(
            || HourStatus::from_outcome(&self.batch.outcome),
            |e| HourStatus::FetchFailed(e.clone()),
        );
        HourReport {
            hour: self.batch.hour,
            status,
            ticks: self.batch.len(),
            archive_error: self.batch.archive_error.clone(),
        }
    }
}

/// Drives the fetch, decode and encode stages one day at a time.
///
/// Within a day up to [`PipelineConfig::hour_concurrency`] hours are fetched
/// and decoded concurrently; days run strictly one after another. Per-hour
/// failures degrade the day instead of aborting it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Arc<PipelineConfig>,
    source: Arc<dyn HourSource>,
    decoder: Arc<HourlyDecoder>,
}

impl Pipeline {
    /// Creates a pipeline reading hours from `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: PipelineConfig, source: Arc<dyn HourSource>) -> Result<Self> {
        let config = config.validate()?;
        let mut decoder = HourlyDecoder::new(config.symbol.clone());
        if config.archive_raw {
            decoder = decoder.with_archive_root(&config.dest);
        }

        Ok(Self {
            config: Arc::new(config),
            source,
            decoder: Arc::new(decoder),
        })
    }

    /// Returns the validated configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processes every day of `range`.
    pub async fn run(&self, range: DateRange) -> RunReport {
        self.run_with(range, |_| {}).await
    }

    /// Processes every day of `range`, calling `on_day` as each day ends.
    pub async fn run_with<F>(&self, range: DateRange, mut on_day: F) -> RunReport
    where
        F: FnMut(&DayReport),
    {
        let started = Instant::now();
        let mut report = RunReport::default();

        let mut range_outputs = match self.config.scope {
            OutputScope::Range => Some(Outputs::open(
                &self.config,
                &self.symbol_dir(),
                range.start,
                range.end,
            )),
            OutputScope::PerDay => None,
        };

        tracing::info!(
            symbol = %self.config.symbol,
            %range,
            format = %self.config.format,
            "starting run"
        );

        for day in range.days() {
            let day_report = match range_outputs.as_mut() {
                Some(outputs) => self.process_day(day, outputs).await,
                None => self.run_day(day).await,
            };
            on_day(&day_report);
            report.days.push(day_report);
        }

        if let Some(outputs) = range_outputs {
            report.outputs = outputs.finish().await;
        }
        report.elapsed = started.elapsed();

        tracing::info!(
            symbol = %self.config.symbol,
            days = report.days.len(),
            ticks = report.ticks(),
            elapsed = ?report.elapsed,
            "run finished"
        );
        report
    }

    /// Processes one day into its own set of output files.
    pub async fn run_day(&self, day: NaiveDate) -> DayReport {
        if self.skips(day) {
            return self.skip(day);
        }

        let started = Instant::now();
        let mut outputs = Outputs::open(
            &self.config,
            &day_dir(&self.config.dest, &self.config.symbol, day),
            day,
            day,
        );
        let mut report = self.feed_day(day, &mut outputs).await;
        report.outputs = outputs.finish().await;
        report.elapsed = started.elapsed();
        self.log_day(&report);
        report
    }

    async fn process_day(&self, day: NaiveDate, outputs: &mut Outputs) -> DayReport {
        if self.skips(day) {
            return self.skip(day);
        }

        let started = Instant::now();
        let mut report = self.feed_day(day, outputs).await;
        report.elapsed = started.elapsed();
        self.log_day(&report);
        report
    }

    fn skips(&self, day: NaiveDate) -> bool {
        self.config.skip_saturdays && is_saturday(day)
    }

    fn skip(&self, day: NaiveDate) -> DayReport {
        tracing::info!(symbol = %self.config.symbol, %day, "skipping Saturday");
        DayReport::skipped(day)
    }

    /// Fetches the day's hours and feeds their ticks to `outputs`.
    async fn feed_day(&self, day: NaiveDate, outputs: &mut Outputs) -> DayReport {
        let mut hours = stream::iter(HourIterator::for_day(day))
            .map(|hour| self.fetch_hour(hour))
            .buffer_unordered(self.config.hour_concurrency);

        let mut fetched = Vec::new();
        match self.config.ordering {
            HourOrdering::Arrival => {
                while let Some(hour) = hours.next().await {
                    outputs.push_all(&hour.batch.ticks).await;
                    fetched.push(hour);
                }
                fetched.sort_by_key(|hour| hour.batch.hour);
            }
            HourOrdering::Chronological => {
                while let Some(hour) = hours.next().await {
                    fetched.push(hour);
                }
                fetched.sort_by_key(|hour| hour.batch.hour);

                let mut ticks: Vec<_> = fetched
                    .iter()
                    .flat_map(|hour| hour.batch.ticks.iter().cloned())
                    .collect();
                ticks.sort_by_key(|tick| tick.timestamp);
                outputs.push_all(&ticks).await;
            }
        }

        DayReport {
            day,
            skipped: false,
            hours: fetched.iter().map(FetchedHour::report).collect(),
            outputs: Vec::new(),
            elapsed: std::time::Duration::ZERO,
        }
    }

    async fn fetch_hour(&self, hour: DateTime<Utc>) -> FetchedHour {
        let raw = match self.source.fetch(&self.config.symbol, hour).await {
            Ok(raw) => raw.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(symbol = %self.config.symbol, %hour, "fetch failed: {e}");
                return FetchedHour {
                    batch: HourBatch::empty(hour),
                    fetch_error: Some(e.to_string()),
                };
            }
        };

        // LZMA decoding and archival are blocking work.
        let decoder = Arc::clone(&self.decoder);
        let batch = tokio::task::spawn_blocking(move || decoder.process(hour, &raw))
            .await
            .unwrap_or_else(|e| HourBatch {
                outcome: DecodeOutcome::Interrupted(format!("decode task failed: {e}")),
                ..HourBatch::empty(hour)
            });

        FetchedHour {
            batch,
            fetch_error: None,
        }
    }

    fn symbol_dir(&self) -> PathBuf {
        self.config.dest.join(self.config.symbol.as_str())
    }

    fn log_day(&self, report: &DayReport) {
        if report.is_complete() {
            tracing::info!(
                symbol = %self.config.symbol,
                day = %report.day,
                ticks = report.ticks(),
                trailing_bytes = report.trailing_bytes(),
                elapsed = ?report.elapsed,
                "day complete"
            );
        } else {
            tracing::warn!(
                symbol = %self.config.symbol,
                day = %report.day,
                ticks = report.ticks(),
                failed_hours = report.failed_hours(),
                trailing_bytes = report.trailing_bytes(),
                elapsed = ?report.elapsed,
                "day partial"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use byteorder::{BigEndian, ByteOrder, LittleEndian};
    use bytes::Bytes;
    use chrono::TimeZone;
    use chronobar_aggregate::TrailingBar;
    use chronobar_fetch::{ArchiveSource, DownloadError};
    use chronobar_format::{
        CsvOptions, FXT_HEADER_SIZE, FXT_TICK_SIZE, FxtModel, FxtOptions, HST_BAR_SIZE,
        HST_HEADER_SIZE, OutputFormat, csv_file_name, fxt_file_name, hst_file_name, read_hst,
    };
    use chronobar_types::{Symbol, Timeframe};
    use std::collections::HashMap;
    use std::io::BufReader;
    use std::path::Path;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct MemorySource {
        payloads: HashMap<DateTime<Utc>, Bytes>,
        failing: Vec<DateTime<Utc>>,
        delays: HashMap<DateTime<Utc>, Duration>,
    }

    #[async_trait]
    impl HourSource for MemorySource {
        async fn fetch(
            &self,
            _symbol: &Symbol,
            hour: DateTime<Utc>,
        ) -> std::result::Result<Option<Bytes>, DownloadError> {
            if let Some(delay) = self.delays.get(&hour) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.contains(&hour) {
                return Err(DownloadError::ServerError { status: 503 });
            }
            Ok(self.payloads.get(&hour).cloned())
        }
    }

    fn eurusd() -> Symbol {
        Symbol::new("EURUSD").unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, 0, 0).unwrap()
    }

    fn record(ms: i32, bid: i32) -> Vec<u8> {
        let mut bytes = vec![0u8; 20];
        BigEndian::write_i32(&mut bytes[0..4], ms);
        BigEndian::write_i32(&mut bytes[4..8], bid + 5);
        BigEndian::write_i32(&mut bytes[8..12], bid);
        BigEndian::write_f32(&mut bytes[12..16], 1.0);
        BigEndian::write_f32(&mut bytes[16..20], 2.5);
        bytes
    }

    fn compress(raw: &[u8]) -> Bytes {
        let mut compressed = Vec::new();
        lzma_rs::lzma_compress(&mut BufReader::new(raw), &mut compressed).unwrap();
        Bytes::from(compressed)
    }

    fn payload(records: &[(i32, i32)]) -> Bytes {
        let raw: Vec<u8> = records.iter().flat_map(|&(ms, bid)| record(ms, bid)).collect();
        compress(&raw)
    }

    /// Three records: two in the first minute of the hour, one in the second.
    fn three_records() -> Bytes {
        payload(&[(1_000, 112_345), (30_000, 112_350), (61_000, 112_340)])
    }

    fn pipeline(config: PipelineConfig, source: MemorySource) -> Pipeline {
        Pipeline::new(config, Arc::new(source)).unwrap()
    }

    fn csv_rows(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .skip(1)
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());

        let pipeline = pipeline(PipelineConfig::new(dir.path(), eurusd()), source);
        let report = pipeline.run(DateRange::single_day(date(5))).await;

        let day = &report.days[0];
        assert!(day.is_complete());
        assert_eq!(day.ticks(), 3);
        assert_eq!(day.hours.len(), 24);
        assert_eq!(day.hours[7].status, HourStatus::Complete);
        assert_eq!(day.hours[8].status, HourStatus::Missing);

        let day_dir = dir.path().join("EURUSD/2024/01/05");
        let csv = day_dir.join(csv_file_name(&eurusd(), date(5), date(5)));
        let rows = csv_rows(&csv);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].starts_with("2024-01-05 07:00:01.000,1.123500,1.123450,"));
        assert!(rows[2].starts_with("2024-01-05 07:01:01.000,"));

        // Raw payload archived next to the output.
        assert_eq!(
            std::fs::read(day_dir.join("07h.bi5")).unwrap(),
            three_records().to_vec()
        );
        assert!(!day_dir.join("08h.bi5").exists());
    }

    #[tokio::test]
    async fn test_trailing_bytes_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut raw: Vec<u8> = [(1_000, 112_345), (30_000, 112_350), (61_000, 112_340)]
            .iter()
            .flat_map(|&(ms, bid)| record(ms, bid))
            .collect();
        raw.extend_from_slice(&[0xAB; 7]);
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), compress(&raw));

        let report = pipeline(PipelineConfig::new(dir.path(), eurusd()), source)
            .run(DateRange::single_day(date(5)))
            .await;

        let day = &report.days[0];
        assert!(day.is_complete());
        assert_eq!(day.hours[7].status, HourStatus::TrailingBytes(7));
        assert_eq!(day.hours[7].ticks, 3);
        assert_eq!(day.trailing_bytes(), 7);
        assert_eq!(csv_rows(&day_csv(dir.path())).len(), 3);
    }

    #[tokio::test]
    async fn test_end_to_end_hst() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());

        let config = PipelineConfig::new(dir.path(), eurusd()).with_format(OutputFormat::Hst);
        let report = pipeline(config, source).run(DateRange::single_day(date(5))).await;
        assert_eq!(report.days[0].outputs[0].bars, 2);

        let path = dir
            .path()
            .join("EURUSD/2024/01/05")
            .join(hst_file_name(&eurusd(), Timeframe::M1));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HST_HEADER_SIZE + 2 * HST_BAR_SIZE);

        let (_, bars) = read_hst(bytes.as_slice()).unwrap();
        let hour = at(5, 7).timestamp();
        assert_eq!(i64::from(bars[0].time), hour);
        assert_eq!(i64::from(bars[1].time), hour + 60);
    }

    #[tokio::test]
    async fn test_end_to_end_fxt() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());

        let config = PipelineConfig::new(dir.path(), eurusd())
            .with_format(OutputFormat::Fxt)
            .with_fxt(FxtOptions::default().with_model(FxtModel::OpenPrices));
        let report = pipeline(config, source).run(DateRange::single_day(date(5))).await;
        assert_eq!(report.back_patch_failures(), 0);

        let path = dir.path().join("EURUSD/2024/01/05").join(fxt_file_name(
            &eurusd(),
            Timeframe::M1,
            FxtModel::OpenPrices,
        ));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), FXT_HEADER_SIZE + 2 * FXT_TICK_SIZE);
        assert_eq!(LittleEndian::read_u32(&bytes[216..220]), 2);
        assert_eq!(
            i64::from(LittleEndian::read_u32(&bytes[220..224])),
            at(5, 7).timestamp()
        );
    }

    #[tokio::test]
    async fn test_one_file_per_timeframe() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());

        let m5: Timeframe = "M5".parse().unwrap();
        let config = PipelineConfig::new(dir.path(), eurusd())
            .with_format(OutputFormat::Hst)
            .with_timeframes(vec![Timeframe::M1, m5]);
        let report = pipeline(config, source).run(DateRange::single_day(date(5))).await;

        let bars: Vec<u64> = report.all_outputs().map(|o| o.bars).collect();
        assert_eq!(bars, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());
        source.failing.push(at(5, 9));

        let report = pipeline(PipelineConfig::new(dir.path(), eurusd()), source)
            .run(DateRange::single_day(date(5)))
            .await;

        let day = &report.days[0];
        assert_eq!(day.ticks(), 3);
        assert_eq!(day.failed_hours(), 1);
        assert!(matches!(day.hours[9].status, HourStatus::FetchFailed(_)));
        assert!(!day.is_complete());
        assert_eq!(report.partial_days(), 1);
    }

    #[tokio::test]
    async fn test_zero_tick_hour_removes_archive_file() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("EURUSD/2024/01/05/03h.bi5");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"stale").unwrap();

        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 3), Bytes::new());

        let report = pipeline(PipelineConfig::new(dir.path(), eurusd()), source)
            .run(DateRange::single_day(date(5)))
            .await;

        assert!(!stale.exists());
        assert_eq!(report.days[0].hours[3].status, HourStatus::Missing);
        assert!(report.days[0].is_complete());
    }

    #[tokio::test]
    async fn test_empty_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path(), eurusd())
            .with_csv(CsvOptions::default().with_header(false));

        let report = pipeline(config, MemorySource::default())
            .run(DateRange::single_day(date(5)))
            .await;

        let output = &report.days[0].outputs[0];
        assert!(output.removed_empty);
        assert!(!output.path.exists());
    }

    #[tokio::test]
    async fn test_saturday_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(6, 7), three_records());

        let range = DateRange::new(date(5), date(7)).unwrap();
        let report = pipeline(PipelineConfig::new(dir.path(), eurusd()), source)
            .run(range)
            .await;

        assert_eq!(report.days.len(), 3);
        assert!(report.days[1].skipped);
        assert_eq!(report.ticks(), 0);
        assert!(!dir.path().join("EURUSD/2024/01/06").exists());
    }

    #[tokio::test]
    async fn test_saturday_included_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(6, 7), three_records());

        let config = PipelineConfig::new(dir.path(), eurusd()).with_skip_saturdays(false);
        let report = pipeline(config, source).run(DateRange::single_day(date(6))).await;
        assert!(!report.days[0].skipped);
        assert_eq!(report.ticks(), 3);
    }

    /// Hour 07 completes well after hour 08.
    fn slow_morning_source() -> MemorySource {
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());
        source.payloads.insert(at(5, 8), payload(&[(500, 112_400)]));
        source.delays.insert(at(5, 7), Duration::from_millis(200));
        source
    }

    fn day_csv(dir: &Path) -> PathBuf {
        dir.join("EURUSD/2024/01/05")
            .join(csv_file_name(&eurusd(), date(5), date(5)))
    }

    #[tokio::test]
    async fn test_chronological_ordering_with_late_hour() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path(), eurusd())
            .with_ordering(HourOrdering::Chronological);
        pipeline(config, slow_morning_source())
            .run(DateRange::single_day(date(5)))
            .await;

        let rows = csv_rows(&day_csv(dir.path()));
        assert_eq!(rows.len(), 4);
        let times: Vec<&str> = rows.iter().map(|r| &r[..23]).collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
        assert!(rows[0].starts_with("2024-01-05 07:00:01.000"));
        assert!(rows[3].starts_with("2024-01-05 08:00:00.500"));
    }

    #[tokio::test]
    async fn test_arrival_ordering_feeds_completed_hours_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(dir.path(), eurusd())
            .with_ordering(HourOrdering::Arrival)
            .with_trailing(TrailingBar::Drop);
        let report = pipeline(config, slow_morning_source())
            .run(DateRange::single_day(date(5)))
            .await;

        let rows = csv_rows(&day_csv(dir.path()));
        assert_eq!(rows.len(), 4);
        assert!(rows[0].starts_with("2024-01-05 08:00:00.500"));
        assert!(rows[1].starts_with("2024-01-05 07:00:01.000"));
        assert!(rows[3].starts_with("2024-01-05 07:01:01.000"));

        // Hour reports are listed by hour whatever the feed order.
        let hours: Vec<_> = report.days[0].hours.iter().map(|h| h.hour).collect();
        assert!(hours.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_range_scope_writes_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());
        source.payloads.insert(at(8, 7), three_records());

        let config = PipelineConfig::new(dir.path(), eurusd()).with_scope(OutputScope::Range);
        let range = DateRange::new(date(5), date(8)).unwrap();
        let report = pipeline(config, source).run(range).await;

        assert!(report.days.iter().all(|d| d.outputs.is_empty()));
        assert_eq!(report.outputs.len(), 1);

        let csv = dir
            .path()
            .join("EURUSD")
            .join(csv_file_name(&eurusd(), date(5), date(8)));
        assert_eq!(csv_rows(&csv).len(), 6);
    }

    #[tokio::test]
    async fn test_convert_from_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = MemorySource::default();
        source.payloads.insert(at(5, 7), three_records());
        pipeline(PipelineConfig::new(dir.path(), eurusd()), source)
            .run(DateRange::single_day(date(5)))
            .await;

        let out = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new(out.path(), eurusd())
            .with_format(OutputFormat::Hst)
            .with_archive_raw(false);
        let pipeline =
            Pipeline::new(config, Arc::new(ArchiveSource::new(dir.path()))).unwrap();
        let report = pipeline.run(DateRange::single_day(date(5))).await;

        assert_eq!(report.ticks(), 3);
        assert_eq!(report.days[0].outputs[0].bars, 2);
        assert!(!out.path().join("EURUSD/2024/01/05/07h.bi5").exists());
    }
}
