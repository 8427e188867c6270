//! Argument enums, progress display and run summary for the chronobar CLI.

use chronobar_lib::prelude::*;
use chronobar_lib::HourStatus;
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};

/// Output format.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Format {
    Csv,
    Hst,
    Fxt,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => Self::Csv,
            Format::Hst => Self::Hst,
            Format::Fxt => Self::Fxt,
        }
    }
}

/// FXT modelling mode.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Model {
    EveryTick,
    ControlPoints,
    OpenPrices,
}

impl From<Model> for FxtModel {
    fn from(model: Model) -> Self {
        match model {
            Model::EveryTick => Self::EveryTick,
            Model::ControlPoints => Self::ControlPoints,
            Model::OpenPrices => Self::OpenPrices,
        }
    }
}

/// Order in which hours reach the aggregators.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Ordering {
    Chronological,
    Arrival,
}

impl From<Ordering> for HourOrdering {
    fn from(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Chronological => Self::Chronological,
            Ordering::Arrival => Self::Arrival,
        }
    }
}

/// Which time sealed bars are labelled with.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Label {
    WindowStart,
    NextWindow,
}

impl From<Label> for BarLabel {
    fn from(label: Label) -> Self {
        match label {
            Label::WindowStart => Self::WindowStart,
            Label::NextWindow => Self::NextWindow,
        }
    }
}

/// Lifetime of the output files.
#[derive(Clone, Copy, ValueEnum)]
pub(crate) enum Scope {
    Day,
    Range,
}

impl From<Scope> for OutputScope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Day => Self::PerDay,
            Scope::Range => Self::Range,
        }
    }
}

/// Creates the progress bar over the days of a run.
pub(crate) fn day_progress(days: u64, message: String, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(days);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days ({percent}%) {msg}",
        )
        .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=>-"));
    pb.set_style(style);
    pb.set_message(message);
    pb
}

/// Short per-day status shown next to the progress bar.
pub(crate) fn day_message(day: &DayReport) -> String {
    if day.skipped {
        return format!("{} skipped", day.day);
    }
    let fetch_failures = day
        .hours
        .iter()
        .filter(|h| matches!(h.status, HourStatus::FetchFailed(_)))
        .count();
    match (day.failed_hours(), fetch_failures) {
        (0, _) => format!("{} {} ticks", day.day, day.ticks()),
        (failed, 0) => format!("{} {} ticks, {failed} hours partial", day.day, day.ticks()),
        (failed, fetch) => format!(
            "{} {} ticks, {failed} hours partial ({fetch} fetch failures)",
            day.day,
            day.ticks()
        ),
    }
}

/// Prints the run summary to stdout.
pub(crate) fn print_summary(report: &RunReport) {
    let processed = report.days.iter().filter(|d| !d.skipped).count();
    println!(
        "Processed {processed} days ({} skipped), {} ticks in {:.1}s",
        report.days.len() - processed,
        report.ticks(),
        report.elapsed.as_secs_f64()
    );
    if report.partial_days() > 0 {
        println!("{} days were incomplete", report.partial_days());
    }

    for output in report.all_outputs() {
        if output.removed_empty {
            continue;
        }
        match &output.error {
            None => println!("  {} ({} bars)", output.path.display(), output.bars),
            Some(e) => println!("  {} FAILED: {e}", output.path.display()),
        }
    }
}
