//! Streaming ingestion of analysed image frames
//!
//! Each delivered frame is checked against existing results by relative
//! filepath, analysed, linked to a metadata anchor derived from its path
//! and persisted as a result row followed by an artifact row.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use flyer_ingest::ingest::{DirectoryItemSource, IngestConfig, ManifestAnalyzer, run_ingest};
//! use flyer_ingest::store::StoreHandle;
//!
//! let store = Arc::new(StoreHandle::open("flyers.duckdb")?);
//! let config = IngestConfig::builder().images_dir("frames").workers(4).build()?;
//! let source = DirectoryItemSource::discover(&config.images_dir, &config.pattern)?;
//! let analyzer = Arc::new(ManifestAnalyzer::load("frames/manifest.jsonl".as_ref())?);
//!
//! let stats = run_ingest(Arc::clone(&store), analyzer, &source, config)?;
//! println!("{}", stats.summary(store.target()));
//! store.dispose()?;
//! ```

mod analysis;
mod config;
mod coordinator;
mod error;
mod source;
mod stats;
mod worker;

use std::sync::Arc;

use tracing::{info, info_span};
use uuid::Uuid;

pub use analysis::{
    AnalysisFailure, AnalysisReport, ImageAnalyzer, ManifestAnalyzer, ManifestEntry,
    SENTINEL_EXIT_CODE,
};
pub use config::{IngestConfig, IngestConfigBuilder};
pub use coordinator::{IngestionCoordinator, ItemOutcome, result_exists};
pub use error::IngestError;
pub use source::{
    AckToken, Delivery, DirectoryItemSource, ItemSource, MemoryItemSource, discover_local_files,
};
pub use stats::IngestStats;
pub use worker::run_workers;

use crate::store::{SessionPool, StoreHandle};

/// Run a full ingestion: ensure tables, drain the source with the configured
/// number of workers and shut the session pool down
///
/// The caller disposes the store afterwards.
pub fn run_ingest(
    store: Arc<StoreHandle>,
    analyzer: Arc<dyn ImageAnalyzer>,
    source: &dyn ItemSource,
    config: IngestConfig,
) -> Result<IngestStats, IngestError> {
    let run_id = Uuid::new_v4();
    let _span = info_span!("ingest_run", %run_id, target = %store.target()).entered();

    store.ensure_tables(config.drop_existing)?;

    let workers = config.workers;
    info!(workers, "Starting ingestion");
    let pool = SessionPool::new(Arc::clone(&store));
    let coordinator = IngestionCoordinator::new(store, analyzer, config);
    run_workers(&pool, &coordinator, source, workers)
}
