//! Subcommand implementations

pub mod convert;
pub mod ingest;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, anyhow};
use flyer_ingest::store::StoreHandle;

/// Open the DuckDB file named on the command line
pub(crate) fn open_store(database: &Path) -> anyhow::Result<Arc<StoreHandle>> {
    let target = database
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", database.display()))?;
    let store = StoreHandle::open(target)
        .map_err(|e| anyhow!(e.user_message()))
        .with_context(|| format!("Opening {}", database.display()))?;
    Ok(Arc::new(store))
}
