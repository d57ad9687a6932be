//! Flyer ingest - loading lab records and analysed flyer frames into DuckDB
//!
//! Provides:
//! - Column type inference and table synthesis from declarative layouts
//! - Record normalization and batched bulk conversion
//! - Metadata anchor resolution from filepaths and record fields
//! - Concurrent, deduplicated ingestion of image analysis results
//! - Per-worker DuckDB sessions over a shared store

pub mod bulk;
pub mod identity;
pub mod inference;
pub mod ingest;
pub mod layout;
pub mod normalize;
pub mod store;
pub mod synthesis;

pub use bulk::{BulkConverter, ConvertConfig, ConvertError, ConvertReport, RecordSource};
pub use identity::{AnchorResolution, AnchorResolver, LinkFields};
pub use inference::{CanonicalType, ScalarValue, infer_column_type};
pub use ingest::{
    ImageAnalyzer, IngestConfig, IngestError, IngestStats, IngestionCoordinator, ItemOutcome,
    ItemSource, run_ingest,
};
pub use layout::{Layout, LayoutConfig, SchemaError};
pub use normalize::{CanonicalRow, ExternalRecord, NormalizationError, RecordNormalizer};
pub use store::{SessionPool, StoreError, StoreHandle, WorkerContext, WorkerId};
pub use synthesis::{SchemaSynthesizer, TableSpec};
