//! CLI command implementations.

pub(crate) mod convert;
pub(crate) mod download;

use crate::display::{Format, Label, Model, Ordering, Scope, day_message, day_progress, print_summary};
use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use chronobar_lib::prelude::*;
use clap::Args;
use std::path::PathBuf;

/// Inputs shared by every command that runs the pipeline.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Symbol (e.g., EURUSD, XAUUSD)
    symbol: String,

    /// Start date (YYYY-MM-DD)
    #[arg(short, long)]
    start: String,

    /// End date (YYYY-MM-DD, inclusive). Defaults to the start date.
    #[arg(short, long)]
    end: Option<String>,

    /// Output folder
    #[arg(short, long, default_value = "download")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: Format,

    /// Comma-separated bar timeframes (e.g., M1,M5,H1)
    #[arg(short, long, default_value = "M1")]
    timeframes: String,

    /// Omit the CSV header row
    #[arg(long)]
    no_header: bool,

    /// Spread in points written to HST and FXT files
    #[arg(long, default_value = "0")]
    spread: u32,

    /// FXT modelling mode
    #[arg(long, value_enum, default_value = "open-prices")]
    model: Model,

    /// FXT account leverage
    #[arg(long, default_value = "100")]
    leverage: u32,

    /// Order in which hours are fed to the aggregators
    #[arg(long, value_enum, default_value = "chronological")]
    ordering: Ordering,

    /// Which time sealed bars are labelled with
    #[arg(long, value_enum, default_value = "window-start")]
    label: Label,

    /// Drop the incomplete last bar instead of writing it (HST and FXT)
    #[arg(long)]
    drop_trailing: bool,

    /// Write one set of files per day or one for the whole range
    #[arg(long, value_enum, default_value = "day")]
    scope: Scope,

    /// Process Saturdays too
    #[arg(long)]
    include_saturdays: bool,

    /// Maximum concurrent hour fetches
    #[arg(long, default_value = "24")]
    concurrency: usize,
}

impl RunArgs {
    /// Returns the date range to process.
    pub(crate) fn range(&self) -> Result<DateRange> {
        let start = parse_date(&self.start).context("Invalid start date")?;
        let end = match &self.end {
            Some(end) => parse_date(end).context("Invalid end date")?,
            None => start,
        };
        Ok(DateRange::new(start, end)?)
    }

    /// Returns the output folder.
    pub(crate) const fn output(&self) -> &PathBuf {
        &self.output
    }

    /// Returns the hour concurrency.
    pub(crate) const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Builds the pipeline configuration.
    pub(crate) fn config(&self) -> Result<PipelineConfig> {
        let symbol = Symbol::new(&self.symbol)
            .with_context(|| format!("Invalid symbol: {}", self.symbol))?;
        let trailing = if self.drop_trailing {
            TrailingBar::Drop
        } else {
            TrailingBar::Flush
        };

        Ok(PipelineConfig::new(&self.output, symbol)
            .with_format(self.format.into())
            .with_timeframes(parse_timeframes(&self.timeframes))
            .with_ordering(self.ordering.into())
            .with_label(self.label.into())
            .with_trailing(trailing)
            .with_scope(self.scope.into())
            .with_skip_saturdays(!self.include_saturdays)
            .with_hour_concurrency(self.concurrency)
            .with_csv(CsvOptions::default().with_header(!self.no_header))
            .with_hst(HstOptions::default().with_spread(self.spread))
            .with_fxt(
                FxtOptions::default()
                    .with_spread(self.spread)
                    .with_model(self.model.into())
                    .with_leverage(self.leverage),
            ))
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("expected YYYY-MM-DD, got {s}"))
}

/// Parses a timeframe list, warning about entries that fall back to M1.
fn parse_timeframes(spec: &str) -> Vec<Timeframe> {
    for entry in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if let Err(e) = entry.parse::<Timeframe>() {
            tracing::warn!("{e}, using M1");
        }
    }
    Timeframe::parse_list(spec)
}

/// Runs the pipeline over `range` with a progress bar and prints a summary.
pub(crate) async fn run(pipeline: &Pipeline, range: DateRange, quiet: bool) -> Result<()> {
    let config = pipeline.config();
    let progress = day_progress(
        range.total_days() as u64,
        format!("{} {} -> {}", config.symbol, range.start, range.end),
        quiet,
    );

    let report = pipeline
        .run_with(range, |day| {
            progress.set_message(day_message(day));
            progress.inc(1);
        })
        .await;
    progress.finish_with_message(format!("{} ticks", report.ticks()));

    if !quiet {
        print_summary(&report);
    }

    let failures = report.back_patch_failures();
    if failures > 0 {
        bail!("{failures} FXT header back-patch(es) failed; those files have zeroed bar counts");
    }
    Ok(())
}
