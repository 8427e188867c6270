//! Download command implementation.

use super::{RunArgs, run};
use anyhow::{Context, Result};
use chronobar_lib::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Downloads the range, archives the raw hours and writes bar files.
pub(crate) async fn download(
    args: &RunArgs,
    base_url: Option<String>,
    timeout: u64,
    no_archive: bool,
    quiet: bool,
) -> Result<()> {
    let range = args.range()?;
    let config = args.config()?.with_archive_raw(!no_archive);

    let mut client_config = ClientConfig {
        pool_size: args.concurrency(),
        ..Default::default()
    }
    .with_timeout(Duration::from_secs(timeout));
    if let Some(base_url) = base_url {
        client_config = client_config.with_base_url(base_url);
    }
    let client = DownloadClient::new(client_config).context("Failed to create HTTP client")?;

    let pipeline = Pipeline::new(config, Arc::new(client))?;
    run(&pipeline, range, quiet).await
}
