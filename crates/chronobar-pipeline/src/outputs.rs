//! The set of output files fed by one unit of work.

use chrono::NaiveDate;
use chronobar_aggregate::{AggregatorConfig, BarAggregator, BarSink};
use chronobar_format::{
    CsvEncoder, FxtEncoder, HstEncoder, OutputFormat, csv_file_name, fxt_file_name, hst_file_name,
};
use chronobar_types::{Tick, Timeframe};
use futures::future::join_all;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::{OutputReport, PipelineConfig};

#[derive(Debug)]
struct Output {
    path: PathBuf,
    format: OutputFormat,
    timeframe: Timeframe,
    aggregator: Option<BarAggregator>,
    error: Option<String>,
}

impl Output {
    fn abandon(&mut self, reason: String) {
        tracing::error!(path = %self.path.display(), "output abandoned: {reason}");
        self.error.get_or_insert(reason);
    }
}

/// Encoders and their aggregators for one day, or for a whole range.
#[derive(Debug)]
pub(crate) struct Outputs {
    outputs: Vec<Output>,
}

impl Outputs {
    /// Opens every output file in `dir`.
    ///
    /// CSV writes a single file driven by the first timeframe; HST and FXT
    /// write one file per timeframe. An output that cannot be opened is
    /// reported at finish instead of failing the others.
    pub(crate) fn open(config: &PipelineConfig, dir: &Path, start: NaiveDate, end: NaiveDate) -> Self {
        let timeframes: &[Timeframe] = if config.format.is_per_timeframe() {
            &config.timeframes
        } else {
            &config.timeframes[..config.timeframes.len().min(1)]
        };

        let dir_error = fs::create_dir_all(dir).err().map(|e| {
            tracing::error!(dir = %dir.display(), "failed to create output directory: {e}");
            format!("{}: {e}", dir.display())
        });

        let outputs = timeframes
            .iter()
            .map(|&timeframe| {
                let path = dir.join(file_name(config, timeframe, start, end));
                let mut output = Output {
                    path,
                    format: config.format,
                    timeframe,
                    aggregator: None,
                    error: None,
                };
                if let Some(e) = &dir_error {
                    output.abandon(e.clone());
                    return output;
                }
                match open_sink(config, &output.path, timeframe) {
                    Ok(sink) => {
                        output.aggregator =
                            Some(BarAggregator::spawn(timeframe, sink, aggregator_config(config)));
                    }
                    Err(e) => output.abandon(format!("failed to open: {e}")),
                }
                output
            })
            .collect();

        Self { outputs }
    }

    /// Feeds one tick to every live output.
    pub(crate) async fn push(&mut self, tick: &Tick) {
        for output in &mut self.outputs {
            let Some(aggregator) = &output.aggregator else {
                continue;
            };
            if let Err(e) = aggregator.push(tick.clone()).await {
                output.abandon(e.to_string());
                output.aggregator = None;
            }
        }
    }

    /// Feeds a batch of ticks in order.
    pub(crate) async fn push_all(&mut self, ticks: &[Tick]) {
        for tick in ticks {
            self.push(tick).await;
        }
    }

    /// Drains every aggregator, finishes the encoders and removes files that
    /// ended up empty.
    pub(crate) async fn finish(self) -> Vec<OutputReport> {
        let finishing = self.outputs.into_iter().map(|mut output| async move {
            let mut report = OutputReport {
                path: output.path.clone(),
                format: output.format,
                timeframe: output.timeframe,
                bars: 0,
                error: None,
                back_patch_failed: false,
                removed_empty: false,
            };

            if let Some(aggregator) = output.aggregator.take() {
                match aggregator.finish().await {
                    Ok(summary) => {
                        report.bars = summary.bars;
                        if let Some(e) = summary.sink_error {
                            if e.is_back_patch() {
                                report.back_patch_failed = true;
                                tracing::error!(
                                    path = %output.path.display(),
                                    "header back-patch failed, bar count and times are zero: {e}"
                                );
                                output.error.get_or_insert(e.to_string());
                            } else {
                                output.abandon(e.to_string());
                            }
                        } else {
                            tracing::info!(
                                path = %output.path.display(),
                                bars = summary.bars,
                                ticks = summary.ticks,
                                "output finished"
                            );
                        }
                    }
                    Err(e) => output.abandon(e.to_string()),
                }
            }

            report.error = output.error;
            report.removed_empty = remove_if_empty(&output.path);
            report
        });

        join_all(finishing).await
    }
}

const fn aggregator_config(config: &PipelineConfig) -> AggregatorConfig {
    AggregatorConfig {
        queue_capacity: config.queue_capacity,
        trailing: config.trailing,
        label: config.label,
    }
}

fn file_name(config: &PipelineConfig, timeframe: Timeframe, start: NaiveDate, end: NaiveDate) -> String {
    match config.format {
        OutputFormat::Csv => csv_file_name(&config.symbol, start, end),
        OutputFormat::Hst => hst_file_name(&config.symbol, timeframe),
        OutputFormat::Fxt => fxt_file_name(&config.symbol, timeframe, config.fxt.model),
    }
}

fn open_sink(
    config: &PipelineConfig,
    path: &Path,
    timeframe: Timeframe,
) -> chronobar_types::Result<Box<dyn BarSink>> {
    let writer = BufWriter::new(File::create(path)?);
    let sink: Box<dyn BarSink> = match config.format {
        OutputFormat::Csv => Box::new(CsvEncoder::new(writer, config.csv)?),
        OutputFormat::Hst => Box::new(HstEncoder::new(
            writer,
            &config.symbol,
            timeframe,
            config.hst.clone(),
        )?),
        OutputFormat::Fxt => Box::new(FxtEncoder::new(
            writer,
            &config.symbol,
            timeframe,
            &config.fxt,
        )?),
    };
    tracing::debug!(path = %path.display(), %timeframe, "opened output");
    Ok(sink)
}

fn remove_if_empty(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.len() == 0 => match fs::remove_file(path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "removed empty output");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to remove empty output: {e}");
                false
            }
        },
        _ => false,
    }
}
