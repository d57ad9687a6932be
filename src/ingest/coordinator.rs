//! Per-item ingestion: dedup, analyse, link, persist

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{AnalysisReport, ImageAnalyzer, IngestConfig, IngestError};
use crate::identity::{AnchorResolution, AnchorResolver, LinkFields};
use crate::store::{StoreError, StoreHandle, WorkerContext};

/// What happened to one item
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ItemOutcome {
    /// The item does not carry the configured extension
    Ignored,
    /// A result for the same filepath already exists
    Duplicate,
    /// A result row and its artifact row were written
    Persisted {
        result_id: i64,
        degraded: bool,
        link: AnchorResolution,
    },
}

/// Drives one item at a time through the ingestion steps
pub struct IngestionCoordinator {
    store: Arc<StoreHandle>,
    analyzer: Arc<dyn ImageAnalyzer>,
    config: IngestConfig,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<StoreHandle>,
        analyzer: Arc<dyn ImageAnalyzer>,
        config: IngestConfig,
    ) -> Self {
        Self {
            store,
            analyzer,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Process one delivered item using the worker's session
    ///
    /// Duplicates are checked once before analysis and again under the
    /// write lock, so concurrent deliveries of the same filepath produce a
    /// single result row.
    pub fn process(
        &self,
        ctx: &mut WorkerContext,
        rel_filepath: &str,
        image: &[u8],
    ) -> Result<ItemOutcome, IngestError> {
        if !self.config.accepts(rel_filepath) {
            debug!(rel_filepath, "Ignoring item");
            return Ok(ItemOutcome::Ignored);
        }

        let session = ctx.session()?;
        let conn = session.connection();

        if result_exists(conn, rel_filepath)? {
            debug!(rel_filepath, "Skipping duplicate");
            return Ok(ItemOutcome::Duplicate);
        }

        let report = match self.analyzer.analyze(rel_filepath, image) {
            Ok(report) => report,
            Err(failure) => {
                warn!(rel_filepath, error = %failure, "Analysis failed, storing degraded result");
                AnalysisReport::degraded()
            }
        };
        let fields = LinkFields::from_path(rel_filepath);

        let guard = self.store.lock()?;
        if result_exists(conn, rel_filepath)? {
            debug!(rel_filepath, "Skipping duplicate");
            return Ok(ItemOutcome::Duplicate);
        }
        let link = AnchorResolver::resolve(conn, &guard, &fields)?;
        let result_id = insert_result(conn, rel_filepath, &report, link.anchor_id())?;
        insert_artifact(conn, result_id, image, report.analysis_image.as_deref())?;
        drop(guard);

        debug!(
            rel_filepath,
            result_id,
            worker = %session.worker(),
            anchor_id = ?link.anchor_id(),
            "Persisted analysis result"
        );
        Ok(ItemOutcome::Persisted {
            result_id,
            degraded: report.is_degraded(),
            link,
        })
    }
}

/// Check whether a result exists for a filepath
pub fn result_exists(conn: &duckdb::Connection, rel_filepath: &str) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM analysis_results WHERE rel_filepath = ?",
        [rel_filepath],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn insert_result(
    conn: &duckdb::Connection,
    rel_filepath: &str,
    report: &AnalysisReport,
    anchor_id: Option<i64>,
) -> Result<i64, StoreError> {
    let id: i64 = conn.query_row("SELECT nextval('analysis_results_id_seq')", [], |row| {
        row.get(0)
    })?;
    conn.execute(
        "INSERT INTO analysis_results \
         (id, anchor_id, rel_filepath, exit_code, radius, tilt, leading_row, center_row, center_column) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        duckdb::params![
            id,
            anchor_id,
            rel_filepath,
            report.exit_code,
            report.radius,
            report.tilt,
            report.leading_row,
            report.center_row,
            report.center_column,
        ],
    )?;
    Ok(id)
}

fn insert_artifact(
    conn: &duckdb::Connection,
    result_id: i64,
    camera_image: &[u8],
    analysis_image: Option<&[u8]>,
) -> Result<i64, StoreError> {
    let id: i64 = conn.query_row("SELECT nextval('image_artifacts_id_seq')", [], |row| {
        row.get(0)
    })?;
    conn.execute(
        "INSERT INTO image_artifacts (id, result_id, camera_image, analysis_image) \
         VALUES (?, ?, ?, ?)",
        duckdb::params![id, result_id, camera_image, analysis_image],
    )?;
    Ok(id)
}
