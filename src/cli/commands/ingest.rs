//! Ingest command implementation

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use flyer_ingest::ingest::{DirectoryItemSource, IngestConfig, ManifestAnalyzer, run_ingest};
use tracing::info;

use super::open_store;
use crate::output::format_ingest_stats;

pub struct IngestArgs {
    pub database: PathBuf,
    pub images: PathBuf,
    pub manifest: PathBuf,
    pub pattern: String,
    pub extension: String,
    pub workers: usize,
    pub drop_existing: bool,
}

/// Handle the ingest command
pub fn handle_ingest(args: &IngestArgs) -> anyhow::Result<()> {
    let config = IngestConfig::builder()
        .images_dir(&args.images)
        .pattern(&args.pattern)
        .extension(&args.extension)
        .workers(args.workers)
        .drop_existing(args.drop_existing)
        .build()
        .map_err(|e| anyhow!("Invalid ingest configuration: {}", e))?;

    if !config.images_dir.is_dir() {
        bail!("Images directory not found: {}", config.images_dir.display());
    }

    let analyzer =
        ManifestAnalyzer::load(&args.manifest).map_err(|e| anyhow!(e.user_message()))?;
    info!(entries = analyzer.len(), "Loaded analysis manifest");

    let source = DirectoryItemSource::discover(&config.images_dir, &config.pattern)
        .map_err(|e| anyhow!(e.user_message()))?;
    info!(files = source.remaining(), "Discovered frames");

    let store = open_store(&args.database)?;
    let result = run_ingest(store.clone(), Arc::new(analyzer), &source, config);
    store.dispose().map_err(|e| anyhow!(e.user_message()))?;

    let stats = result.map_err(|e| anyhow!(e.user_message()))?;
    println!("{}", format_ingest_stats(&stats, store.target()));
    Ok(())
}
