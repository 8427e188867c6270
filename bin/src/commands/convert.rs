//! Convert command implementation.

use super::{RunArgs, run};
use anyhow::{Result, bail};
use chronobar_lib::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Writes bar files from an existing raw archive.
pub(crate) async fn convert(args: &RunArgs, archive: Option<PathBuf>, quiet: bool) -> Result<()> {
    let range = args.range()?;
    let root = archive.unwrap_or_else(|| args.output().clone());
    if !root.is_dir() {
        bail!("Archive folder not found: {}", root.display());
    }

    let config = args.config()?.with_archive_raw(false);
    let pipeline = Pipeline::new(config, Arc::new(ArchiveSource::new(root)))?;
    run(&pipeline, range, quiet).await
}
