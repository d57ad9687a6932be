//! Convert command implementation

use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use flyer_ingest::bulk::{BulkConverter, ConvertConfig, JsonlRecordSource};
use flyer_ingest::layout::LayoutConfig;
use tracing::info;

use super::open_store;
use crate::output::format_convert_report;

pub struct ConvertArgs {
    pub database: PathBuf,
    pub layouts: PathBuf,
    pub source: PathBuf,
    pub drop_existing: bool,
    pub strict: bool,
}

/// Handle the convert command
pub fn handle_convert(args: &ConvertArgs) -> anyhow::Result<()> {
    let layouts = LayoutConfig::load(&args.layouts)
        .map_err(|e| anyhow!(e.user_message()))
        .with_context(|| format!("Loading layouts from {}", args.layouts.display()))?;
    info!(layouts = layouts.len(), "Loaded layout configuration");

    if !args.source.is_dir() {
        bail!("Record source directory not found: {}", args.source.display());
    }

    let store = open_store(&args.database)?;
    let config = ConvertConfig::builder()
        .drop_existing(args.drop_existing)
        .strict(args.strict)
        .build();
    let source = JsonlRecordSource::new(&args.source);

    let converter = BulkConverter::new(store.clone(), layouts, config);
    let result = converter.run(&source);
    store.dispose().map_err(|e| anyhow!(e.user_message()))?;

    let report = result.map_err(|e| anyhow!(e.user_message()))?;
    println!("{}", format_convert_report(&report));
    Ok(())
}
