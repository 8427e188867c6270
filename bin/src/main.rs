//! chronobar CLI - Dukascopy tick data to CSV, HST and FXT converter.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::RunArgs;

#[derive(Parser)]
#[command(name = "chronobar")]
#[command(about = "Dukascopy tick data to CSV, HST and FXT converter", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output and most logging)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download ticks, archive them and write bar files
    Download {
        #[command(flatten)]
        args: RunArgs,

        /// Base URL of the data feed
        #[arg(long)]
        base_url: Option<String>,

        /// Request timeout in seconds
        #[arg(long, default_value = "60")]
        timeout: u64,

        /// Do not keep the raw .bi5 files
        #[arg(long)]
        no_archive: bool,
    },

    /// Write bar files from previously archived ticks
    Convert {
        #[command(flatten)]
        args: RunArgs,

        /// Archive root. Defaults to the output folder.
        #[arg(short, long)]
        archive: Option<PathBuf>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    init_tracing(cli.verbose, cli.quiet);

    match command {
        Commands::Download {
            args,
            base_url,
            timeout,
            no_archive,
        } => commands::download::download(&args, base_url, timeout, no_archive, cli.quiet).await,
        Commands::Convert { args, archive } => {
            commands::convert::convert(&args, archive, cli.quiet).await
        }
    }
}
